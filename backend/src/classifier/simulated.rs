use log::debug;
use sha2::{Digest, Sha256};
use shared::{ModelInfo, RemoteVerdict, ServiceInfo};

use super::{Classifier, RemoteError};
use crate::pipeline::request::ImageUpload;

const SAMPLES: &[(&str, bool, f32)] = &[
    ("Toyota Prius Prime (PHEV)", true, 0.982),
    ("Tesla Model 3 (BEV)", true, 0.965),
    ("Nissan Leaf (BEV)", true, 0.953),
    ("Chevrolet Bolt EV (BEV)", true, 0.941),
    ("Honda Accord (ICE, older model)", false, 0.878),
    ("Ford F-150 (ICE, V8)", false, 0.892),
    ("Toyota Camry 2015 (ICE)", false, 0.865),
    ("Honda Civic 2014 (ICE)", false, 0.901),
];

/// In-process stand-in for the classification service. The sample is chosen
/// from the SHA-256 of the payload, so the same input always gets the same
/// verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedClassifier;

impl SimulatedClassifier {
    fn verdict_for(payload: &[u8]) -> RemoteVerdict {
        let digest = Sha256::digest(payload);
        let index = digest[0] as usize % SAMPLES.len();
        let (name, qualified, confidence) = SAMPLES[index];
        debug!(
            "Simulated prediction for {}: {}",
            &hex::encode(digest)[..12],
            name
        );

        let reason = if qualified {
            format!("{name} is eligible for Clean Cars 4 All (simulated)")
        } else {
            format!("{name} does not meet Clean Cars 4 All eligibility requirements (simulated)")
        };
        RemoteVerdict {
            name: name.to_string(),
            qualified,
            confidence,
            class_index: index as u32,
            reason,
        }
    }
}

impl Classifier for SimulatedClassifier {
    async fn health(&self) -> Result<ServiceInfo, RemoteError> {
        let eligible = SAMPLES.iter().filter(|(_, qualified, _)| *qualified).count() as u32;
        Ok(ServiceInfo {
            service: "CleanCar Classifier (simulated)".to_string(),
            status: "running".to_string(),
            model_loaded: true,
            num_classes: SAMPLES.len() as u32,
            eligible_count: eligible,
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            model: Some(ModelInfo {
                num_classes: SAMPLES.len() as u32,
                eligible_count: eligible,
                model_type: "Simulated".to_string(),
                has_class_names: true,
                has_eligibility_map: Some(true),
                has_csv_data: None,
            }),
            warnings: Vec::new(),
        })
    }

    async fn classify_file(&self, upload: &ImageUpload) -> Result<RemoteVerdict, RemoteError> {
        Ok(Self::verdict_for(&upload.bytes))
    }

    async fn classify_url(&self, url: &str) -> Result<RemoteVerdict, RemoteError> {
        Ok(Self::verdict_for(url.trim().as_bytes()))
    }
}
