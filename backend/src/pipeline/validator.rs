use super::request::{ClassificationRequest, ImageUpload};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/heic",
    "image/webp",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No file or image URL provided")]
    EmptyInput,
    #[error("File size exceeds 5MB limit ({size} bytes, max {limit})")]
    OversizedInput { size: usize, limit: usize },
    #[error("Invalid file type {0:?}. Please upload JPG, PNG, HEIC or WEBP")]
    UnsupportedType(String),
    #[error("Invalid image URL {0:?}")]
    InvalidUrl(String),
}

/// Checks declared metadata only. Never touches the network or the pixels.
pub fn validate(request: &ClassificationRequest) -> Result<(), ValidationError> {
    match request {
        ClassificationRequest::File(upload) => validate_upload(upload),
        ClassificationRequest::Url(url) => validate_url(url),
    }
}

fn validate_upload(upload: &ImageUpload) -> Result<(), ValidationError> {
    if upload.bytes.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if upload.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::OversizedInput {
            size: upload.size(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    // Parameters such as `; charset=` are not part of the type.
    let essence = upload
        .media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_MEDIA_TYPES.contains(&essence.as_str()) {
        return Err(ValidationError::UnsupportedType(upload.media_type.clone()));
    }

    Ok(())
}

fn validate_url(raw: &str) -> Result<(), ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let parsed = url::Url::parse(raw).map_err(|_| ValidationError::InvalidUrl(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        _ => Err(ValidationError::InvalidUrl(raw.to_string())),
    }
}
