//! Language code tables shared by the providers.

use regex::Regex;
use std::sync::OnceLock;

/// Languages the chat-completion engine is prompted for.
pub const CHAT_LANGUAGES: [&str; 12] = [
    "en", "es", "fr", "de", "zh", "ja", "ko", "ru", "pt", "hi", "ar", "it",
];

/// Convert a language code to a human-readable name for prompting and catalogs.
pub fn display_name(code: &str) -> Option<&'static str> {
    let lowercase = code.to_lowercase();
    let name = match lowercase.as_str() {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "cs" => "Czech",
        "sv" => "Swedish",
        "el" => "Greek",
        "he" => "Hebrew",
        "ro" => "Romanian",
        _ => return None,
    };
    Some(name)
}

/// Display name, falling back to the code itself.
pub fn name_or_code(code: &str) -> String {
    display_name(code)
        .map(str::to_string)
        .unwrap_or_else(|| code.to_string())
}

/// True for a bare two-letter ISO 639-1 style code.
pub fn is_two_letter_code(code: &str) -> bool {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid regex"))
        .is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("en"), Some("English"));
        assert_eq!(display_name("JA"), Some("Japanese"));
        assert_eq!(display_name("xx"), None);
        assert_eq!(name_or_code("xx"), "xx");
    }

    #[test]
    fn test_chat_languages_have_names() {
        for code in CHAT_LANGUAGES {
            assert!(display_name(code).is_some(), "missing name for {}", code);
        }
    }

    #[test]
    fn test_two_letter_code() {
        assert!(is_two_letter_code("en"));
        assert!(is_two_letter_code("ES"));
        assert!(!is_two_letter_code(""));
        assert!(!is_two_letter_code("eng"));
        assert!(!is_two_letter_code("e1"));
        assert!(!is_two_letter_code("zh-CN"));
    }
}
