use std::sync::LazyLock;

use regex::Regex;

/// C0 controls except tab, newline and carriage return, plus DEL.
static CONTROL_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid regex"));

/// Strip control characters from extracted text before passing downstream.
///
/// Newlines and carriage returns survive because every consumer of this text
/// is line-oriented. Everything else (including tabs and non-ASCII) is kept.
pub fn strip_control_chars(raw: &str) -> String {
    CONTROL_CHARS_RE.replace_all(raw, "").into_owned()
}
