//! Parameter extraction from the original request text.
//!
//! A small fixed lookup over recognized phrases. Extraction is total: when no
//! pattern matches, or the matched value is unrecognized, a defined default is
//! returned rather than an error.

use std::sync::LazyLock;

use regex::Regex;

/// Default language code when the request names no (or an unknown) language.
pub const DEFAULT_LANGUAGE: &str = "en";

static TRANSLATE_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)translate (?:\w+ )?to (\w+)").expect("valid regex"));

/// Extracts the target language code from a free-text request.
///
/// Recognizes a "translate to <language>" phrase and maps the language name
/// to a code. Unknown languages and absent phrases fall back to
/// [`DEFAULT_LANGUAGE`].
pub fn target_language(request: &str) -> &'static str {
    let Some(captures) = TRANSLATE_TO.captures(request) else {
        return DEFAULT_LANGUAGE;
    };

    match captures[1].to_lowercase().as_str() {
        "german" => "de",
        "french" => "fr",
        "spanish" => "es",
        "japanese" => "ja",
        "english" => "en",
        _ => DEFAULT_LANGUAGE,
    }
}
