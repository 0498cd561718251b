pub mod client;
pub mod simulated;

use shared::{RemoteVerdict, ServiceInfo};

use crate::config::{ConfigError, Mode, PipelineConfig};
use crate::pipeline::request::ImageUpload;
pub use client::HttpClassifier;
pub use simulated::SimulatedClassifier;

/// Any failure talking to the classification service. Always recoverable
/// through the offline fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Classifier unreachable: {0}")]
    Unreachable(String),
    #[error("Backend error {status}: {detail}")]
    HttpStatus { status: u16, detail: String },
    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::MalformedResponse(err.to_string())
        } else if err.is_timeout() {
            RemoteError::Unreachable(format!("request timed out: {err}"))
        } else {
            RemoteError::Unreachable(err.to_string())
        }
    }
}

/// The remote classification collaborator. Implementations make exactly one
/// attempt per call; retry and fallback belong to the orchestrator.
#[allow(async_fn_in_trait)]
pub trait Classifier {
    async fn health(&self) -> Result<ServiceInfo, RemoteError>;

    async fn classify_file(&self, upload: &ImageUpload) -> Result<RemoteVerdict, RemoteError>;

    async fn classify_url(&self, url: &str) -> Result<RemoteVerdict, RemoteError>;
}

/// Classifier selected by [`Mode`].
#[derive(Clone)]
pub enum Backend {
    Live(HttpClassifier),
    Simulated(SimulatedClassifier),
}

impl Backend {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(match config.mode {
            Mode::Live => Backend::Live(HttpClassifier::new(
                &config.backend_url,
                config.request_timeout(),
            )?),
            Mode::Simulated => Backend::Simulated(SimulatedClassifier),
        })
    }

    pub fn mode(&self) -> Mode {
        match self {
            Backend::Live(_) => Mode::Live,
            Backend::Simulated(_) => Mode::Simulated,
        }
    }
}

impl Classifier for Backend {
    async fn health(&self) -> Result<ServiceInfo, RemoteError> {
        match self {
            Backend::Live(client) => client.health().await,
            Backend::Simulated(sim) => sim.health().await,
        }
    }

    async fn classify_file(&self, upload: &ImageUpload) -> Result<RemoteVerdict, RemoteError> {
        match self {
            Backend::Live(client) => client.classify_file(upload).await,
            Backend::Simulated(sim) => sim.classify_file(upload).await,
        }
    }

    async fn classify_url(&self, url: &str) -> Result<RemoteVerdict, RemoteError> {
        match self {
            Backend::Live(client) => client.classify_url(url).await,
            Backend::Simulated(sim) => sim.classify_url(url).await,
        }
    }
}
