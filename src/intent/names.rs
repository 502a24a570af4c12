//! Table-name extraction from free text.

use lazy_static::lazy_static;
use regex::Regex;

/// Words that the patterns below can capture but are never table names
const STOP_WORDS: &[&str] = &["table", "from", "in", "for", "of", "the", "a", "an"];

lazy_static! {
    /// Ordered (pattern, capture group) pairs; earlier patterns win
    static ref TABLE_PATTERNS: Vec<(Regex, usize)> = vec![
        (Regex::new(r#"(?:table|from|in|for|of)\s+["'`]?(\w+)["'`]?"#).unwrap(), 1),
        (Regex::new(r#"["'`](\w+)["'`]\s+table"#).unwrap(), 1),
        (Regex::new(r"describe\s+(\w+)").unwrap(), 1),
        (Regex::new(r"columns?\s+(?:in|of|for)\s+(\w+)").unwrap(), 1),
    ];

    static ref PLAIN_IDENTIFIER: Regex = Regex::new(r"^\w+$").unwrap();
}

/// Extract a table name from lower-cased request text.
///
/// Each pattern is tried once, on its leftmost match. A capture that is a
/// stop-word moves on to the next pattern.
pub fn extract_table_name(text: &str) -> Option<String> {
    for (pattern, group) in TABLE_PATTERNS.iter() {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        if let Some(name) = captures.get(*group) {
            let name = name.as_str();
            if !is_stop_word(name) {
                return Some(name.to_string());
            }
        }
    }
    None
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// True for names made only of word characters, as the patterns capture them
pub fn is_plain_identifier(name: &str) -> bool {
    PLAIN_IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_stop_word_capture() {
        assert_eq!(
            extract_table_name("show columns in customer_orders"),
            Some("customer_orders".to_string())
        );
    }

    #[test]
    fn test_quoted_table_name() {
        assert_eq!(
            extract_table_name("describe the \"payment\" table"),
            Some("payment".to_string())
        );
    }

    #[test]
    fn test_describe_pattern() {
        assert_eq!(extract_table_name("describe actor"), Some("actor".to_string()));
    }

    #[test]
    fn test_of_pattern() {
        assert_eq!(extract_table_name("schema of film"), Some("film".to_string()));
    }

    #[test]
    fn test_only_stop_words_yields_none() {
        assert_eq!(extract_table_name("describe the table"), None);
    }

    #[test]
    fn test_word_after_table_is_taken_literally() {
        assert_eq!(
            extract_table_name("show table structure"),
            Some("structure".to_string())
        );
    }

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("customer_orders"));
        assert!(!is_plain_identifier("x'; drop table y; --"));
        assert!(!is_plain_identifier(""));
    }
}
