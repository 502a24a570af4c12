//! Safety Classifier
//!
//! Inspects rendered SQL text and assigns a risk tier that gates execution.
//! Containment of destructive keywords is checked before the read-only
//! prefix test, so a SELECT mentioning `DROP` anywhere is still dangerous.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref DANGEROUS_KEYWORDS: Regex = Regex::new(r"(?i)\b(?:DROP|TRUNCATE)\b").unwrap();
    /// Plain containment: `last_update` or `'Deleted Scenes'` count as modify
    static ref MODIFY_KEYWORDS: Regex =
        Regex::new(r"(?i)(?:DELETE|UPDATE|INSERT|ALTER|CREATE)").unwrap();
}

const READ_ONLY_PREFIXES: &[&str] = &["SELECT", "SHOW", "WITH"];

/// Risk of executing a statement, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyTier {
    Safe,
    Unknown,
    Modify,
    Dangerous,
}

impl SafetyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyTier::Safe => "safe",
            SafetyTier::Modify => "modify",
            SafetyTier::Dangerous => "dangerous",
            SafetyTier::Unknown => "unknown",
        }
    }

    /// Rank used to detect escalation: safe < unknown < modify < dangerous
    pub fn severity(&self) -> u8 {
        match self {
            SafetyTier::Safe => 0,
            SafetyTier::Unknown => 1,
            SafetyTier::Modify => 2,
            SafetyTier::Dangerous => 3,
        }
    }
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub tier: SafetyTier,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
}

impl SafetyVerdict {
    fn new(tier: SafetyTier, recommendation: &str, warnings: Option<&str>) -> Self {
        Self {
            tier,
            recommendation: recommendation.to_string(),
            warnings: warnings.map(str::to_string),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.tier == SafetyTier::Safe
    }
}

/// Classify SQL text. Pure and case-insensitive.
pub fn classify_safety(sql: &str) -> SafetyVerdict {
    if DANGEROUS_KEYWORDS.is_match(sql) {
        return SafetyVerdict::new(
            SafetyTier::Dangerous,
            "🛑 DANGEROUS: This will permanently delete data or structure. Triple-check before executing!",
            Some("This operation cannot be undone. Make sure you have a backup."),
        );
    }

    if MODIFY_KEYWORDS.is_match(sql) {
        return SafetyVerdict::new(
            SafetyTier::Modify,
            "⚠️ CAUTION: This will modify data or structure. Review carefully before executing.",
            Some("Ensure you have reviewed the impact of this change."),
        );
    }

    let upper = sql.trim().to_uppercase();
    if READ_ONLY_PREFIXES.iter().any(|prefix| upper.starts_with(prefix)) {
        return SafetyVerdict::new(
            SafetyTier::Safe,
            "✅ SAFE: Read-only query. Safe to execute.",
            None,
        );
    }

    SafetyVerdict::new(
        SafetyTier::Unknown,
        "❓ UNKNOWN: Unable to determine query type. Proceed with caution.",
        Some("Review the query carefully before executing."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(classify_safety("DROP TABLE x;").tier, SafetyTier::Dangerous);
        assert_eq!(classify_safety("truncate x").tier, SafetyTier::Dangerous);
        assert_eq!(classify_safety("UPDATE x SET y=1;").tier, SafetyTier::Modify);
        assert_eq!(classify_safety("SELECT * FROM x;").tier, SafetyTier::Safe);
        assert_eq!(classify_safety("  show search_path").tier, SafetyTier::Safe);
        assert_eq!(classify_safety("VACUUM x;").tier, SafetyTier::Unknown);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            classify_safety("select * from x"),
            classify_safety("SELECT * FROM X")
        );
    }

    #[test]
    fn test_dangerous_keyword_inside_select() {
        let verdict = classify_safety("SELECT * FROM logs WHERE msg = 'DROP';");
        assert_eq!(verdict.tier, SafetyTier::Dangerous);
        assert!(verdict.warnings.is_some());
    }

    #[test]
    fn test_dangerous_outranks_modify() {
        assert_eq!(
            classify_safety("ALTER TABLE x DROP COLUMN y;").tier,
            SafetyTier::Dangerous
        );
    }

    #[test]
    fn test_modify_keywords_match_inside_words() {
        assert_eq!(
            classify_safety("SELECT last_update FROM film;").tier,
            SafetyTier::Modify
        );
        assert_eq!(
            classify_safety("SELECT * FROM film WHERE title = 'Deleted Scenes';").tier,
            SafetyTier::Modify
        );
        assert_eq!(
            classify_safety("select created_at from rental").tier,
            SafetyTier::Modify
        );
    }

    #[test]
    fn test_dangerous_keywords_match_whole_words_only() {
        assert_eq!(classify_safety("SELECT dropped_at FROM t;").tier, SafetyTier::Safe);
        assert_eq!(classify_safety("SELECT truncated FROM t;").tier, SafetyTier::Safe);
    }

    #[test]
    fn test_safe_has_no_warnings() {
        assert_eq!(classify_safety("WITH a AS (SELECT 1) SELECT * FROM a").warnings, None);
    }

    #[test]
    fn test_severity_order() {
        assert!(SafetyTier::Dangerous.severity() > SafetyTier::Modify.severity());
        assert!(SafetyTier::Modify.severity() > SafetyTier::Unknown.severity());
        assert!(SafetyTier::Unknown.severity() > SafetyTier::Safe.severity());
    }
}
