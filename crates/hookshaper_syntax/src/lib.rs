use deno_ast::{MediaType, ModuleSpecifier, ParseParams};

/// Specifier reported in parser locations
const SOURCE_SPECIFIER: &str = "file:///handler.js";

#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("{0}")]
    Parse(String),

    #[error("Invalid source specifier: {0}")]
    InvalidSpecifier(String),
}

pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Parse JavaScript source as a classic script without evaluating it
///
/// Both fatal parse errors and errors the parser recovered from are reported;
/// the first one found is returned.
///
/// # Errors
/// * `SyntaxError::Parse` - If the code is not a syntactically valid script. The
///   message carries the parser's line and column.
/// * `SyntaxError::InvalidSpecifier` - Never in practice, the specifier is static.
///
/// # Examples
/// ```
/// use hookshaper_syntax::check_script;
///
/// assert!(check_script("function handler(payload) { return []; }").is_ok());
/// assert!(check_script("function handler(payload) { return [];").is_err());
/// ```
pub fn check_script(code: &str) -> Result<()> {
    let specifier = ModuleSpecifier::parse(SOURCE_SPECIFIER)
        .map_err(|e| SyntaxError::InvalidSpecifier(e.to_string()))?;

    let parsed = deno_ast::parse_script(ParseParams {
        specifier,
        text: code.into(),
        media_type: MediaType::JavaScript,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    })
    .map_err(|e| SyntaxError::Parse(clean_message(&e.to_string())))?;

    if let Some(diagnostic) = parsed.diagnostics().first() {
        return Err(SyntaxError::Parse(clean_message(&diagnostic.to_string())));
    }

    Ok(())
}

// The parser prefixes locations with the internal specifier
fn clean_message(message: &str) -> String {
    message
        .replace(&format!("{SOURCE_SPECIFIER}:"), "line ")
        .trim()
        .to_string()
}
