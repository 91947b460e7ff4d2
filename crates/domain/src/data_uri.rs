//! Decoding of base64 `data:` URIs submitted as file uploads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("Unknown file uploaded")]
    UnknownFile,

    #[error("Unknown mime type detected")]
    UnknownMimeType,

    #[error("Extension for the mime type not found")]
    ExtensionNotFound,

    #[error("{0}")]
    Payload(#[from] base64::DecodeError),
}

/// A decoded upload and the extension its MIME type maps to (with leading dot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Decodes `data:<type>/<subtype>[;params],<base64>`.
pub fn decode(input: &str) -> Result<DecodedFile, DataUriError> {
    let rest = input.strip_prefix("data:").ok_or(DataUriError::UnknownFile)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::UnknownFile)?;
    let mime_type = header.split(';').next().unwrap_or_default();

    if !is_mime_type(mime_type) {
        return Err(DataUriError::UnknownMimeType);
    }

    let extension = mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|extensions| extensions.first())
        .ok_or(DataUriError::ExtensionNotFound)?;

    let bytes = STANDARD.decode(payload)?;

    Ok(DecodedFile {
        bytes,
        extension: format!(".{extension}"),
    })
}

fn is_mime_type(value: &str) -> bool {
    let Some((kind, subtype)) = value.split_once('/') else {
        return false;
    };

    !kind.is_empty()
        && kind.chars().all(|c| c.is_ascii_alphanumeric())
        && !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+'))
}
