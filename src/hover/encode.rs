//! Image encoding: styled markup to a self-contained `data:` reference.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

/// Editor webviews silently drop grotesquely large inline images; failing
/// loudly here turns that into visible error content instead.
const MAX_MARKUP_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("rendered image is {size} bytes, over the {limit}-byte inline limit")]
    Oversize { size: usize, limit: usize },
}

/// Encodes markup as an inline SVG image reference. The markup's UTF-8 bytes
/// go through standard base64, so non-ASCII content round-trips exactly.
pub fn svg_to_data_url(markup: &str) -> Result<String, EncodeError> {
    if markup.len() > MAX_MARKUP_BYTES {
        return Err(EncodeError::Oversize {
            size: markup.len(),
            limit: MAX_MARKUP_BYTES,
        });
    }
    let mut out = String::with_capacity(DATA_URL_PREFIX.len() + markup.len() / 3 * 4 + 4);
    out.push_str(DATA_URL_PREFIX);
    STANDARD.encode_string(markup.as_bytes(), &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_carries_the_svg_media_type_prefix() {
        let url = svg_to_data_url("<svg/>").unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn non_ascii_markup_round_trips_exactly() {
        let markup = "<svg><text>∀x∈ℝ</text></svg>";
        let url = svg_to_data_url(markup).unwrap();
        let payload = url.strip_prefix(DATA_URL_PREFIX).unwrap();
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, markup.as_bytes());
        assert_eq!(String::from_utf8(decoded).unwrap(), markup);
    }

    #[test]
    fn oversize_markup_is_rejected() {
        let markup = "x".repeat(MAX_MARKUP_BYTES + 1);
        let err = svg_to_data_url(&markup).unwrap_err();
        assert!(matches!(err, EncodeError::Oversize { .. }));
        assert!(err.to_string().contains("inline limit"));
    }
}
