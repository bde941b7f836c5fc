use crate::{Result, ScraperError};
use encoding_rs::{Encoding, UTF_8};
use lazy_regex::regex_captures;
use std::borrow::Cow;
use tracing::debug;

// Same window a browser scans for an in-document charset declaration.
const PRESCAN_LEN: usize = 1024;

/// Decodes raw page bytes to text.
///
/// The encoding comes from a byte order mark, then `declared` (a label given
/// outside the document, such as the Content-Type charset), then the
/// document's `<meta charset>`, and defaults to UTF-8. Undecodable bytes are
/// replaced. Empty and binary input cannot be parsed.
pub fn decode_document<'a>(bytes: &'a [u8], declared: Option<&str>) -> Result<Cow<'a, str>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ScraperError::Parse("document is empty".to_string()));
    }

    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| declared.and_then(|label| Encoding::for_label(label.trim().as_bytes())))
        .or_else(|| meta_charset(bytes))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("Replaced malformed {} sequences in document", used.name());
    }
    if text.contains('\0') {
        return Err(ScraperError::Parse("document holds binary data".to_string()));
    }
    Ok(text)
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(PRESCAN_LEN)]);
    let (_, label) = regex_captures!(
        r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#,
        head.as_ref()
    )?;
    Encoding::for_label(label.as_bytes())
}
