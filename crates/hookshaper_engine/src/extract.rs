//! Locating handler source inside a free-form model response.
//!
//! Two recognizers run in priority order: a fenced code block scan, then a
//! column-0 function scan with brace balancing. Each is usable on its own.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const FENCE: &str = "```";

/// Fence tags accepted as JavaScript
const JS_TAGS: &[&str] = &["", "javascript", "js"];

static TOP_LEVEL_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^function\s+[A-Za-z_$][\w$]*\s*\([^)]*\)\s*\{").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    FencedBlock,
    PatternMatch,
    /// Handed over as-is, no response to search
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSource {
    code: String,
    provenance: Provenance,
}

impl ExtractedSource {
    /// Returns `None` for blank code, an extraction never carries empty text
    pub fn new(code: impl Into<String>, provenance: Provenance) -> Option<Self> {
        let code = code.into();
        (!code.trim().is_empty()).then_some(Self { code, provenance })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn into_code(self) -> String {
        self.code
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No handler function found in response")]
    NotFound,
}

/// Extract handler source from a model response
///
/// # Errors
/// Returns `ExtractError::NotFound` when neither a JavaScript code block nor
/// a top-level function definition is present.
pub fn extract(response: &str) -> Result<ExtractedSource, ExtractError> {
    if let Some(code) = fenced_block(response) {
        debug!(code_length = code.len(), "Extracted code from fenced block");
        return ExtractedSource::new(code, Provenance::FencedBlock).ok_or(ExtractError::NotFound);
    }

    let functions = top_level_functions(response);
    if functions.is_empty() {
        debug!(response_length = response.len(), "No code found in response");
        return Err(ExtractError::NotFound);
    }

    debug!(function_count = functions.len(), "Extracted code by pattern");
    ExtractedSource::new(functions.join("\n\n"), Provenance::PatternMatch)
        .ok_or(ExtractError::NotFound)
}

/// Inner text of the first closed JavaScript (or untagged) fenced block,
/// trimmed. Blocks tagged with another language and empty blocks are skipped.
pub fn fenced_block(text: &str) -> Option<&str> {
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let (tag, body) = match after_open.find('\n') {
            Some(nl) => (after_open[..nl].trim(), &after_open[nl + 1..]),
            None => return None,
        };

        let close = body.find(FENCE)?;
        let inner = body[..close].trim();
        rest = &body[close + FENCE.len()..];

        if JS_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t)) && !inner.is_empty() {
            return Some(inner);
        }
    }

    None
}

/// Every `function name(..) {..}` starting at column 0, in order of appearance.
/// Definitions whose braces never balance are ignored.
pub fn top_level_functions(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(m) = TOP_LEVEL_FUNCTION.find_at(text, pos) {
        let open_brace = m.end() - 1;
        match matching_brace(text, open_brace) {
            Some(close) => {
                found.push(&text[m.start()..=close]);
                pos = close + 1;
            }
            None => pos = m.end(),
        }
    }

    found
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    SingleQuote,
    DoubleQuote,
    Template,
    LineComment,
    BlockComment,
}

/// Byte index of the `}` closing the `{` at `open`. String, template and
/// comment contents are not counted.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut mode = Mode::Code;
    let mut depth = 0usize;
    // brace depth at which each open `${` interpolation started
    let mut interpolations: Vec<usize> = Vec::new();
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match mode {
            Mode::Code => match b {
                b'/' if next == Some(b'/') => {
                    mode = Mode::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    mode = Mode::BlockComment;
                    i += 1;
                }
                b'\'' => mode = Mode::SingleQuote,
                b'"' => mode = Mode::DoubleQuote,
                b'`' => mode = Mode::Template,
                b'{' => depth += 1,
                b'}' => {
                    if interpolations.last() == Some(&depth) {
                        interpolations.pop();
                        mode = Mode::Template;
                    } else {
                        depth = depth.checked_sub(1)?;
                        if depth == 0 {
                            return Some(i);
                        }
                    }
                }
                _ => {}
            },
            Mode::SingleQuote | Mode::DoubleQuote => {
                let quote = if mode == Mode::SingleQuote { b'\'' } else { b'"' };
                if b == b'\\' {
                    i += 1;
                } else if b == quote || b == b'\n' {
                    mode = Mode::Code;
                }
            }
            Mode::Template => {
                if b == b'\\' {
                    i += 1;
                } else if b == b'`' {
                    mode = Mode::Code;
                } else if b == b'$' && next == Some(b'{') {
                    interpolations.push(depth);
                    mode = Mode::Code;
                    i += 1;
                }
            }
            Mode::LineComment => {
                if b == b'\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    mode = Mode::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_javascript_block() {
        let response = "Here you go:\n```javascript\nfunction handler(payload){return [];}\n```\nEnjoy.";
        let source = extract(response).unwrap();
        assert_eq!(source.code(), "function handler(payload){return [];}");
        assert_eq!(source.provenance(), Provenance::FencedBlock);
    }

    #[test]
    fn test_untagged_and_js_fences() {
        assert_eq!(fenced_block("```\nlet a = 1;\n```"), Some("let a = 1;"));
        assert_eq!(fenced_block("```js\nlet b = 2;\n```"), Some("let b = 2;"));
        assert_eq!(fenced_block("```JavaScript\nlet c = 3;\n```"), Some("let c = 3;"));
    }

    #[test]
    fn test_other_language_fence_skipped() {
        let response = "Output:\n```json\n[{\"name\": \"customers\"}]\n```\nCode:\n```javascript\nfunction handler(p) { return []; }\n```";
        assert_eq!(fenced_block(response), Some("function handler(p) { return []; }"));
    }

    #[test]
    fn test_unclosed_fence_is_not_a_block() {
        assert_eq!(fenced_block("```javascript\nfunction handler(p) {"), None);
    }

    #[test]
    fn test_fallback_pattern_match() {
        let response = "Sure thing.\n\nfunction handler(payload) { return []; }\n\nThat should work.";
        let source = extract(response).unwrap();
        assert_eq!(source.code(), "function handler(payload) { return []; }");
        assert_eq!(source.provenance(), Provenance::PatternMatch);
    }

    #[test]
    fn test_fallback_joins_functions_in_order() {
        let response = "\
Helpers first:
function currentTimestampInSeconds() {
    return Math.round(Date.now() / 1000);
}

And the handler:
function handler(payload) {
    if (payload.email) {
        return [{ name: \"customers\", data: { ts: currentTimestampInSeconds() } }];
    }
    return [];
}
Done.";
        let source = extract(response).unwrap();
        let code = source.code();
        assert!(code.starts_with("function currentTimestampInSeconds()"));
        assert!(code.contains("}\n\nfunction handler(payload)"));
        assert!(code.ends_with("return [];\n}"));
        assert!(!code.contains("Done."));
    }

    #[test]
    fn test_indented_function_not_matched() {
        let response = "You could write   function handler(p) { return []; } inline.";
        assert_eq!(extract(response), Err(ExtractError::NotFound));
    }

    #[test]
    fn test_prose_only() {
        assert_eq!(
            extract("I could not determine a mapping, please clarify the fields."),
            Err(ExtractError::NotFound)
        );
    }

    #[test]
    fn test_braces_in_strings_and_comments() {
        let text = "function handler(p) {\n  const s = \"}\"; // }\n  /* { */\n  const t = `${p.a}}`;\n  return [s, t];\n}\ntrailing";
        let found = top_level_functions(text);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("return [s, t];\n}"));
    }

    #[test]
    fn test_unbalanced_function_ignored() {
        let text = "function handler(p) {\n  if (p) {\n    return [];\n";
        assert!(top_level_functions(text).is_empty());
    }

    #[test]
    fn test_empty_block_falls_back() {
        let response = "```javascript\n\n```\nfunction handler(p) { return []; }";
        let source = extract(response).unwrap();
        assert_eq!(source.provenance(), Provenance::PatternMatch);
    }
}
