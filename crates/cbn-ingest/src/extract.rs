//! Locating a reply object inside free-form agent text
//!
//! Two stages, tried in order:
//! 1. The fence-stripped text parses directly as a JSON object.
//! 2. Best-effort scan: each `{` starts a candidate, the matching `}` is
//!    found by depth counting (string and escape aware), and the first
//!    candidate that parses as an object wins. Text before it is the
//!    preamble.
//!
//! Stage 2 can still be fooled by braces inside narrative prose. That is
//! accepted; the schema check downstream rejects whatever it mis-locates.

use serde_json::{Map, Value};

const FENCE: &str = "```";

/// How the reply object was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Whole (fence-stripped) text was the object
    Direct,
    /// Found by brace scanning
    Scanned,
}

/// A recovered reply object
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    /// The JSON object
    pub object: Map<String, Value>,
    /// Prose preceding the object, trimmed, if any
    pub preamble: Option<String>,
    /// Stage that found it
    pub stage: Stage,
}

/// Remove code-fence markers and their language labels
///
/// Handles labeled (```` ```json ````) and unlabeled fences anywhere in the
/// text except inside a JSON string, so backticks quoted in a description
/// survive. Strings are only tracked within brackets; quotes in prose are
/// ignored. A label is only consumed when followed by whitespace, a bracket
/// or the end of the text, so prose glued to a closing fence survives.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        if in_string {
            match bytes[i] {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        if bytes[i..].starts_with(FENCE.as_bytes()) {
            out.push_str(&text[copied..i]);
            i += FENCE.len();

            let rest = &text[i..];
            let label_len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
                .unwrap_or(rest.len());
            let after = rest[label_len..].chars().next();
            if after.map_or(true, |c| c.is_whitespace() || c == '{' || c == '[') {
                i += label_len;
            }
            copied = i;
            continue;
        }

        match bytes[i] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            b'"' if depth > 0 => in_string = true,
            _ => {}
        }
        i += 1;
    }
    out.push_str(&text[copied..]);

    out.trim().to_string()
}

/// Find the reply object in fence-stripped text
///
/// At most `max_candidates` opening braces are tried in the scanning stage.
#[must_use]
pub fn locate_object(text: &str, max_candidates: usize) -> Option<Located> {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) {
        return Some(Located {
            object,
            preamble: None,
            stage: Stage::Direct,
        });
    }

    for (start, _) in text.match_indices('{').take(max_candidates) {
        let Some(end) = balanced_end(text, start) else {
            continue;
        };
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&text[start..=end]) {
            let preamble = text[..start].trim();
            return Some(Located {
                object,
                preamble: (!preamble.is_empty()).then(|| preamble.to_string()),
                stage: Stage::Scanned,
            });
        }
    }

    None
}

/// Byte index of the `}` closing the `{` at `start`
///
/// Works on bytes: every delimiter is ASCII and never occurs inside a
/// multi-byte UTF-8 sequence, so returned indices are char boundaries.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}
