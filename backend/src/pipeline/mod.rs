pub mod orchestrator;
pub mod request;
pub mod tracker;
pub mod validator;

pub use orchestrator::Orchestrator;
pub use request::{ClassificationRequest, ImageUpload};
pub use tracker::RequestToken;
pub use validator::ValidationError;
