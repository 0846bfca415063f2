//! Fence stripping for model output.
//!
//! Models regularly wrap code in Markdown fences despite being told not to,
//! and some emit two closing fences in a row. Only the recognised marker
//! forms are removed; everything else passes through untouched.

const FENCE: &str = "```";

/// Strip opening and closing fences and surrounding whitespace.
///
/// Iterates until neither rule applies, so the result is a fixpoint:
/// `normalize(&normalize(t)) == normalize(t)`.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim();

    loop {
        let before = text.len();

        if let Some(body) = strip_opening_fence(text) {
            text = body.trim();
        }
        while let Some(rest) = text.strip_suffix(FENCE) {
            text = rest.trim();
        }

        if text.len() == before {
            break;
        }
    }

    text.to_string()
}

/// Remove "```" followed by an optional language tag and a newline.
fn strip_opening_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FENCE)?;
    let (tag, body) = rest.split_once('\n')?;
    let tag = tag.trim_end_matches('\r');

    let is_tag = tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.'));

    is_tag.then_some(body)
}
