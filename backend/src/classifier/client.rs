use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{ModelInfo, RemoteVerdict, ServiceInfo, UrlRequest};
use std::time::Duration;

use super::{Classifier, RemoteError};
use crate::pipeline::request::ImageUpload;

/// HTTP client for the classification service (`/`, `/model-info`,
/// `/predict`, `/predict-url`).
#[derive(Clone)]
pub struct HttpClassifier {
    client: Client,
    base_url: String,
}

impl HttpClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn model_info(&self) -> Result<ModelInfo, RemoteError> {
        let response = self
            .client
            .get(self.endpoint("model-info"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        read_json(response).await
    }
}

impl Classifier for HttpClassifier {
    async fn health(&self) -> Result<ServiceInfo, RemoteError> {
        debug!("Checking classifier at {}", self.base_url);
        let response = self
            .client
            .get(self.endpoint("/"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let mut info: ServiceInfo = read_json(response).await?;

        match self.model_info().await {
            Ok(model) => {
                if !model.has_class_names {
                    info.warnings
                        .push("Class-name table missing; predictions use placeholder names".into());
                }
                if !model.has_eligibility_table() {
                    info.warnings
                        .push("Eligibility map missing; every class reports not eligible".into());
                }
                info.model = Some(model);
            }
            Err(err) => info
                .warnings
                .push(format!("Model metadata unavailable: {err}")),
        }

        for warning in &info.warnings {
            warn!("{}", warning);
        }
        info!(
            "Classifier connected: {} ({} classes, {} eligible)",
            info.service, info.num_classes, info.eligible_count
        );
        Ok(info)
    }

    async fn classify_file(&self, upload: &ImageUpload) -> Result<RemoteVerdict, RemoteError> {
        let part = || Part::bytes(upload.bytes.clone()).file_name(upload.filename.clone());
        let part = part().mime_str(&upload.media_type).unwrap_or_else(|_| part());
        let form = Form::new().part("file", part);

        debug!(
            "Sending {} ({} bytes) for classification",
            upload.filename,
            upload.size()
        );
        let response = self
            .client
            .post(self.endpoint("predict"))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await.map(from_percent)
    }

    async fn classify_url(&self, url: &str) -> Result<RemoteVerdict, RemoteError> {
        debug!("Sending URL for classification: {}", url);
        let response = self
            .client
            .post(self.endpoint("predict-url"))
            .json(&UrlRequest {
                url: url.to_string(),
            })
            .send()
            .await?;
        read_json(response).await.map(from_percent)
    }
}

/// The service reports confidence as a percentage (`96.5`), whatever its
/// magnitude.
fn from_percent(mut verdict: RemoteVerdict) -> RemoteVerdict {
    verdict.confidence /= 100.0;
    verdict
}

/// Maps non-2xx to `HttpStatus` (carrying the service's `detail` verbatim)
/// and undecodable bodies to `MalformedResponse`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let detail = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| match value.get("detail") {
                Some(serde_json::Value::String(detail)) => Some(detail.clone()),
                Some(other) => Some(other.to_string()),
                None => None,
            })
            .unwrap_or_else(|| format!("Backend error: {}", status.as_u16()));
        return Err(RemoteError::HttpStatus {
            status: status.as_u16(),
            detail,
        });
    }

    serde_json::from_slice(&body).map_err(|err| RemoteError::MalformedResponse(err.to_string()))
}
