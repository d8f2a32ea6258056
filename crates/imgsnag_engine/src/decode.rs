use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// Accepts missing padding and stray trailing bits, as browsers do.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmbeddedDecodeError {
    #[error("not a base64 data URI")]
    NotDataUri,
    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// Decode `data:<media-type>;base64,<payload>`.
///
/// The media type may only contain ASCII letters, `-`, `+` and `/`; the
/// payload must be non-empty. ASCII whitespace inside the payload is ignored.
pub fn decode_data_uri(uri: &str) -> Result<EmbeddedImage, EmbeddedDecodeError> {
    let rest = uri.strip_prefix("data:").ok_or(EmbeddedDecodeError::NotDataUri)?;
    let (media_type, payload) = rest
        .split_once(";base64,")
        .ok_or(EmbeddedDecodeError::NotDataUri)?;

    let media_type_ok = !media_type.is_empty()
        && media_type
            .chars()
            .all(|c| c.is_ascii_alphabetic() || matches!(c, '-' | '+' | '/'));
    if !media_type_ok || payload.is_empty() {
        return Err(EmbeddedDecodeError::NotDataUri);
    }

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|err| EmbeddedDecodeError::Payload(err.to_string()))?;

    Ok(EmbeddedImage {
        media_type: media_type.to_string(),
        bytes,
    })
}
