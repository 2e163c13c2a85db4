use super::types::{Classification, ExtractionKind};
use crate::storage::ObjectRef;

/// Map a file extension to the extraction it needs.
///
/// Unknown or absent extensions are `Unsupported`, which is a normal outcome rather than an error.
pub fn classify(extension: Option<&str>) -> Classification {
    let Some(extension) = extension else {
        return Classification::Unsupported;
    };
    match extension.to_ascii_lowercase().as_str() {
        "mp3" | "mp4" | "wav" => Classification::Extract(ExtractionKind::Transcription),
        "pdf" => Classification::Extract(ExtractionKind::Ocr),
        _ => Classification::Unsupported,
    }
}

/// Classify a listed object by its extension.
pub fn classify_object(object: &ObjectRef) -> Classification {
    classify(object.extension.as_deref())
}
