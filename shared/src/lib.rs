use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display, EnumString,
)]
pub enum VehicleType {
    #[serde(rename = "BEV")]
    #[strum(serialize = "BEV", ascii_case_insensitive)]
    Bev,
    #[serde(rename = "PHEV")]
    #[strum(serialize = "PHEV", ascii_case_insensitive)]
    Phev,
}

/// Inclusive span of model years, rendered as `2017-2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display(fmt = "{}-{}", start, end)]
pub struct YearRange {
    pub start: u16,
    pub end: u16,
}

impl YearRange {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: u16) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleVehicle {
    pub make: String,
    pub model: String,
    pub years: YearRange,
    pub vehicle_type: VehicleType,
}

impl EligibleVehicle {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.make, self.model)
    }
}

/// Which stage of the pipeline produced a result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResultSource {
    Remote,
    LocalMatch,
    ManualEntry,
    ManualPending,
}

/// Normalized verdict handed to the presentation layer.
///
/// `confidence` is always in `[0, 1]`. `qualified` is never true for a
/// `ManualPending` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub name: String,
    pub qualified: bool,
    pub confidence: f32,
    pub reason: String,
    pub source: ResultSource,
    pub requires_manual_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligible_years: Option<YearRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_index: Option<u32>,
    /// Informational banner text, e.g. the offline-mode annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_error: Option<String>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendStatus {
    #[default]
    Unknown,
    Connected,
    Unreachable,
}

/// Body of a successful `/predict` or `/predict-url` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVerdict {
    pub name: String,
    pub qualified: bool,
    pub confidence: f32,
    #[serde(default)]
    pub class_index: u32,
    #[serde(default, rename = "eligibility_reason", alias = "reason")]
    pub reason: String,
}

/// Body of the classifier's `GET /` response, plus whatever `/model-info`
/// reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub num_classes: u32,
    #[serde(default)]
    pub eligible_count: u32,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub model: Option<ModelInfo>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub num_classes: u32,
    #[serde(default)]
    pub eligible_count: u32,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub has_class_names: bool,
    #[serde(default)]
    pub has_eligibility_map: Option<bool>,
    #[serde(default)]
    pub has_csv_data: Option<bool>,
}

impl ModelInfo {
    /// Older deployments report the eligibility table as `has_csv_data`.
    pub fn has_eligibility_table(&self) -> bool {
        self.has_eligibility_map
            .or(self.has_csv_data)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualEntryRequest {
    pub make: String,
    pub model: String,
    /// Overrides the catalog-derived confidence when the caller has its own.
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: BackendStatus,
    pub info: Option<ServiceInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
