//! Eligibility resolution for Clean Cars 4 All: turns a vehicle photo or
//! image URL into a qualification verdict, falling back to offline matching
//! when the classification service cannot be reached.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod matcher;
pub mod pipeline;
pub mod routes;

pub use classifier::{Backend, Classifier, RemoteError};
pub use config::{Mode, PipelineConfig};
pub use pipeline::{ClassificationRequest, Orchestrator, ValidationError};
