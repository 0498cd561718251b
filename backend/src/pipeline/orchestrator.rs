use log::{debug, info, warn};
use shared::{
    BackendStatus, ClassificationResult, EligibleVehicle, RemoteVerdict, ResultSource, ServiceInfo,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

use super::request::ClassificationRequest;
use super::tracker::{RequestToken, RequestTracker};
use super::validator::{self, ValidationError};
use crate::classifier::{Backend, Classifier, RemoteError};
use crate::config::{ConfigError, Mode, PipelineConfig};
use crate::matcher::{EligibilityVerdict, ExtractedVehicle, LocalMatcher};

pub const OFFLINE_NOTICE: &str = "Using offline mode - backend unavailable";
pub const MANUAL_INPUT_NOTICE: &str =
    "Backend unavailable. Please manually enter the car make and model to check eligibility.";

#[derive(Debug, Clone)]
struct HealthSnapshot {
    status: BackendStatus,
    info: Option<ServiceInfo>,
}

/// Sequences validation, the remote classifier and the offline fallback into
/// a single [`ClassificationResult`].
///
/// Validation failures are returned as errors. Everything else, including an
/// unreachable classifier, resolves to a result.
pub struct Orchestrator<C = Backend> {
    classifier: C,
    mode: Mode,
    matcher: LocalMatcher,
    short_circuit_after_failure: bool,
    health: OnceCell<HealthSnapshot>,
    remote_failed: AtomicBool,
    tracker: RequestTracker,
}

impl Orchestrator<Backend> {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let backend = Backend::from_config(config)?;
        Ok(Self::new(backend, config))
    }
}

impl<C: Classifier> Orchestrator<C> {
    pub fn new(classifier: C, config: &PipelineConfig) -> Self {
        Self {
            classifier,
            mode: config.mode,
            matcher: LocalMatcher::new(
                crate::catalog::Catalog::global(),
                config.fallback_confidence,
            ),
            short_circuit_after_failure: config.short_circuit_after_failure,
            health: OnceCell::new(),
            remote_failed: AtomicBool::new(false),
            tracker: RequestTracker::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn validate(&self, request: &ClassificationRequest) -> Result<(), ValidationError> {
        validator::validate(request)
    }

    /// Probes the classifier on first call; later calls return the recorded
    /// status without touching the network.
    pub async fn health(&self) -> BackendStatus {
        self.health
            .get_or_init(|| async {
                match self.classifier.health().await {
                    Ok(info) => HealthSnapshot {
                        status: BackendStatus::Connected,
                        info: Some(info),
                    },
                    Err(err) => {
                        warn!("Classifier health check failed: {}", err);
                        HealthSnapshot {
                            status: BackendStatus::Unreachable,
                            info: None,
                        }
                    }
                }
            })
            .await
            .status
    }

    /// Status recorded by [`health`](Self::health), `Unknown` before the probe.
    pub fn status(&self) -> BackendStatus {
        self.health
            .get()
            .map(|snapshot| snapshot.status)
            .unwrap_or_default()
    }

    pub fn service_info(&self) -> Option<&ServiceInfo> {
        self.health.get().and_then(|snapshot| snapshot.info.as_ref())
    }

    pub fn begin(&self) -> RequestToken {
        self.tracker.begin()
    }

    pub fn cancel(&self) {
        self.tracker.cancel()
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.tracker.is_current(token)
    }

    pub async fn resolve(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ValidationError> {
        if let Err(err) = validator::validate(request) {
            info!("Rejected {} request: {}", request.kind(), err);
            return Err(err);
        }

        let outcome = if self.short_circuit_after_failure && self.remote_failed.load(Ordering::SeqCst) {
            debug!("Skipping classifier after earlier failure in this session");
            Err(RemoteError::Unreachable(
                "skipped after an earlier failure in this session".to_string(),
            ))
        } else {
            match request {
                ClassificationRequest::File(upload) => self.classifier.classify_file(upload).await,
                ClassificationRequest::Url(url) => self.classifier.classify_url(url.trim()).await,
            }
        };

        match outcome {
            Ok(verdict) => {
                info!(
                    "Classifier verdict: {} (qualified: {}, confidence: {})",
                    verdict.name, verdict.qualified, verdict.confidence
                );
                Ok(self.remote_result(verdict))
            }
            Err(err) => {
                warn!("Classifier failed, using offline fallback: {}", err);
                self.remote_failed.store(true, Ordering::SeqCst);
                Ok(self.fallback(request, &err))
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but yields `None` when `token` was
    /// superseded while the request was in flight.
    pub async fn resolve_tracked(
        &self,
        token: RequestToken,
        request: &ClassificationRequest,
    ) -> Result<Option<ClassificationResult>, ValidationError> {
        let result = self.resolve(request).await?;
        if !self.tracker.is_current(token) {
            debug!("Discarding result for superseded request {}", token.id());
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// Terminal step after a `requires_manual_input` result.
    pub fn resolve_manual(&self, make: &str, model: &str) -> ClassificationResult {
        local_result(
            self.matcher.check_eligibility(make, model),
            ResultSource::ManualEntry,
        )
    }

    /// Manual entry with a caller-supplied confidence, clamped to `[0, 1]`.
    pub fn resolve_manual_with_confidence(
        &self,
        make: &str,
        model: &str,
        confidence: Option<f32>,
    ) -> ClassificationResult {
        let mut result = self.resolve_manual(make, model);
        if let Some(confidence) = confidence {
            result.confidence = clamp_unit(confidence);
        }
        result
    }

    pub fn list_eligible_vehicles(&self) -> &'static [EligibleVehicle] {
        self.matcher.catalog().vehicles()
    }

    pub fn search(&self, query: &str) -> Vec<EligibleVehicle> {
        self.matcher.catalog().search(query)
    }

    fn remote_result(&self, verdict: RemoteVerdict) -> ClassificationResult {
        let name = verdict.name.trim();
        let known = !name.is_empty();
        let qualified = verdict.qualified && known;
        let vehicle = if known {
            self.matcher.vehicle_for_label(name)
        } else {
            None
        };

        let reason = if !verdict.reason.trim().is_empty() {
            verdict.reason.clone()
        } else if qualified {
            format!("{name} is eligible for Clean Cars 4 All")
        } else {
            "Vehicle does not meet Clean Cars 4 All eligibility requirements".to_string()
        };

        ClassificationResult {
            name: if known {
                name.to_string()
            } else {
                "Unknown vehicle".to_string()
            },
            qualified,
            confidence: clamp_unit(verdict.confidence),
            reason,
            source: ResultSource::Remote,
            requires_manual_input: false,
            vehicle_type: vehicle.map(|v| v.vehicle_type),
            eligible_years: vehicle.map(|v| v.years),
            class_index: Some(verdict.class_index),
            notice: None,
            backend_error: None,
        }
    }

    fn fallback(&self, request: &ClassificationRequest, err: &RemoteError) -> ClassificationResult {
        let text = request.fallback_text();
        match self.matcher.match_from_text(&text) {
            Some(ExtractedVehicle::Identified(vehicle)) => {
                let verdict = self.matcher.check_eligibility(&vehicle.make, &vehicle.model);
                info!(
                    "Offline match for {:?}: {} (qualified: {})",
                    text, verdict.name, verdict.qualified
                );
                let mut result = local_result(verdict, ResultSource::LocalMatch);
                result.notice = Some(OFFLINE_NOTICE.to_string());
                result.backend_error = Some(err.to_string());
                result
            }
            partial => {
                info!("No offline match for {:?}; awaiting manual input", text);
                let reason = match partial {
                    Some(found) => format!(
                        "Detected {} but could not identify the model. Manual input required in offline mode",
                        found.make()
                    ),
                    None => "Manual input required in offline mode".to_string(),
                };
                ClassificationResult {
                    name: "Unidentified vehicle".to_string(),
                    qualified: false,
                    confidence: 0.0,
                    reason,
                    source: ResultSource::ManualPending,
                    requires_manual_input: true,
                    vehicle_type: None,
                    eligible_years: None,
                    class_index: None,
                    notice: Some(MANUAL_INPUT_NOTICE.to_string()),
                    backend_error: Some(err.to_string()),
                }
            }
        }
    }
}

fn local_result(verdict: EligibilityVerdict, source: ResultSource) -> ClassificationResult {
    ClassificationResult {
        name: verdict.name,
        qualified: verdict.qualified,
        confidence: verdict.confidence,
        reason: verdict.reason,
        source,
        requires_manual_input: false,
        vehicle_type: verdict.vehicle.as_ref().map(|v| v.vehicle_type),
        eligible_years: verdict.vehicle.as_ref().map(|v| v.years),
        class_index: None,
        notice: None,
        backend_error: None,
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
