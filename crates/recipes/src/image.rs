//! Encoded recipe images.
//!
//! Images arrive as `data:image/<type>;base64,<payload>` URIs and are kept in
//! that form. Only the envelope and the base64 payload are checked; pixels are
//! never decoded.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use larder_core::{DomainError, DomainResult, ValueObject};

const FIELD: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecipeImage(String);

impl ValueObject for RecipeImage {}

impl RecipeImage {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| DomainError::invalid_field(FIELD, "expected a data URI"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| DomainError::invalid_field(FIELD, "data URI has no payload"))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| DomainError::invalid_field(FIELD, "payload must be base64 encoded"))?;
        if !media_type.starts_with("image/") || media_type.len() == "image/".len() {
            return Err(DomainError::invalid_field(FIELD, "media type must be image/*"));
        }
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| DomainError::invalid_field(FIELD, format!("invalid base64 payload: {e}")))?;
        if bytes.is_empty() {
            return Err(DomainError::invalid_field(FIELD, "image is empty"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `image/png`, `image/jpeg`, ...
    pub fn media_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(media_type, _)| media_type)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

    #[test]
    fn accepts_base64_png_data_uri() {
        let image = RecipeImage::parse(PIXEL).unwrap();
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.as_str(), PIXEL);
    }

    #[test]
    fn rejects_malformed_envelopes() {
        for raw in [
            "https://example.com/cake.png",
            "data:image/png;base64",
            "data:image/png,abc",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png;base64,!!!",
            "data:image/png;base64,",
        ] {
            let err = RecipeImage::parse(raw).unwrap_err();
            assert_eq!(err.field(), Some("image"), "{raw}");
        }
    }
}
