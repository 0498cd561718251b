use std::path::Path;

/// Image payload supplied by the caller together with its declared metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// One user action: either an uploaded file or an image URL, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationRequest {
    File(ImageUpload),
    Url(String),
}

impl ClassificationRequest {
    pub fn file(filename: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ClassificationRequest::File(ImageUpload::new(filename, media_type, bytes))
    }

    pub fn url(url: impl Into<String>) -> Self {
        ClassificationRequest::Url(url.into())
    }

    /// Text the offline matcher inspects: the file name or the URL itself.
    pub fn fallback_text(&self) -> String {
        match self {
            ClassificationRequest::File(upload) => upload.filename.to_lowercase(),
            ClassificationRequest::Url(url) => url.to_lowercase(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationRequest::File(_) => "file",
            ClassificationRequest::Url(_) => "url",
        }
    }
}

/// Media type implied by a file name, for uploads that arrive without one.
pub fn media_type_for_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" => Some("image/heic"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
