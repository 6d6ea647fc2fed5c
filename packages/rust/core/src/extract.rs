//! Text extraction: raw payload bytes in, UTF-8 text out.
//!
//! Extractors for PDFs or word-processor files run out of process and plug
//! in behind [`TextExtractor`]; the built-in [`Utf8Extractor`] covers plain
//! text and JSON payloads.

/// Payload handed to an extractor.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub identifier: String,
    /// MIME type, e.g. `text/plain` or `application/json`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    /// Non-fatal problems, e.g. replaced invalid bytes.
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported media type '{media_type}'")]
    UnsupportedMediaType { media_type: String },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError>;
}

/// Extractor for `text/*` and `application/json` payloads.
///
/// JSON payloads must be an object with a string `text` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Extractor;

impl TextExtractor for Utf8Extractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        let media_type = request
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "text/plain" | "text/markdown" => Ok(decode_utf8(&request.bytes)),
            "application/json" => {
                let value: serde_json::Value = serde_json::from_slice(&request.bytes)
                    .map_err(|e| ExtractionError::Malformed(format!("invalid JSON: {e}")))?;
                let text = value
                    .get("text")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| ExtractionError::Malformed("missing string field 'text'".into()))?;
                Ok(ExtractionResult {
                    text: text.to_string(),
                    warnings: Vec::new(),
                })
            }
            _ => Err(ExtractionError::UnsupportedMediaType {
                media_type: request.media_type.clone(),
            }),
        }
    }
}

fn decode_utf8(bytes: &[u8]) -> ExtractionResult {
    match std::str::from_utf8(bytes) {
        Ok(text) => ExtractionResult {
            text: text.to_string(),
            warnings: Vec::new(),
        },
        Err(e) => ExtractionResult {
            text: String::from_utf8_lossy(bytes).into_owned(),
            warnings: vec![format!("invalid UTF-8 at byte {}, replaced", e.valid_up_to())],
        },
    }
}

/// MIME type for a file extension, if the built-in sources know it.
pub fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some("text/plain"),
        "md" => Some("text/markdown"),
        "json" => Some("application/json"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(media_type: &str, bytes: &[u8]) -> ExtractionRequest {
        ExtractionRequest {
            identifier: "1013".into(),
            media_type: media_type.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn plain_text() {
        let result = Utf8Extractor
            .extract(&request("text/plain; charset=utf-8", "Section 1013 §".as_bytes()))
            .unwrap();
        assert_eq!(result.text, "Section 1013 §");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced_with_warning() {
        let result = Utf8Extractor
            .extract(&request("text/plain", b"abc\xffdef"))
            .unwrap();
        assert_eq!(result.text, "abc\u{fffd}def");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn json_text_field() {
        let result = Utf8Extractor
            .extract(&request("application/json", br#"{"identifier":"x","text":"Rule 3.1350"}"#))
            .unwrap();
        assert_eq!(result.text, "Rule 3.1350");

        let err = Utf8Extractor
            .extract(&request("application/json", br#"{"title":"x"}"#))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(_)));
    }

    #[test]
    fn unsupported_media_type() {
        let err = Utf8Extractor
            .extract(&request("application/pdf", b"%PDF-1.7"))
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::UnsupportedMediaType { ref media_type } if media_type == "application/pdf"
        ));
    }

    #[test]
    fn extensions() {
        assert_eq!(media_type_for_extension("JSON"), Some("application/json"));
        assert_eq!(media_type_for_extension("pdf"), None);
    }
}
