//! Generation pipeline
//!
//! classify → synthesize → classify_safety. Pure: the schema summary is
//! supplied by the caller and nothing touches a database.

use crate::api::{GenerateResponse, GENERATION_FAILED};
use crate::intent::{classify, Intent, IntentKind};
use crate::safety::{classify_safety, SafetyVerdict};
use crate::schema::SchemaSummary;
use crate::synthesizer::{resolve_data_table, synthesize, Synthesis};
use tracing::info;

/// Everything the pipeline decided about one request
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub intent: Intent,
    pub synthesis: Synthesis,
    /// Present exactly when `synthesis` carries SQL
    pub verdict: Option<SafetyVerdict>,
}

pub fn plan(query: &str, schema: &SchemaSummary) -> Generation {
    info!("Processing query: {}", query);

    let mut intent = classify(query);
    info!("Detected intent: {}", intent.kind);

    let synthesis = synthesize(query, &intent, schema);

    if intent.kind == IntentKind::DataQuery && synthesis.is_available() {
        if let Some(table) = resolve_data_table(query, schema) {
            intent = intent.with_table(table);
        }
    }

    let verdict = synthesis.sql().map(classify_safety);
    Generation {
        intent,
        synthesis,
        verdict,
    }
}

/// Run the pipeline and shape the result as a generate response
pub fn generate(query: &str, schema: &SchemaSummary) -> GenerateResponse {
    GenerateResponse::from(plan(query, schema))
}

impl From<Generation> for GenerateResponse {
    fn from(generation: Generation) -> Self {
        let Generation {
            intent,
            synthesis,
            verdict,
        } = generation;

        match synthesis {
            Synthesis::Sql(sql) => {
                let verdict = verdict.unwrap_or_else(|| classify_safety(&sql));
                GenerateResponse {
                    success: true,
                    sql: Some(sql),
                    explanation: Some(intent.explanation),
                    safety_level: Some(verdict.tier),
                    recommendation: Some(verdict.recommendation),
                    warnings: verdict.warnings,
                    intent_type: Some(intent.kind),
                    table: intent.table,
                    ..Default::default()
                }
            }
            Synthesis::Unavailable { suggestions } => GenerateResponse {
                success: false,
                error: Some(GENERATION_FAILED.to_string()),
                suggestions: Some(suggestions),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyTier;

    #[test]
    fn test_plan_sets_data_query_table() {
        let schema = SchemaSummary::from_table_names("shop", ["customers", "orders"]);
        let generation = plan("show me ORDERS", &schema);
        assert_eq!(generation.intent.kind, IntentKind::DataQuery);
        assert_eq!(generation.intent.table.as_deref(), Some("orders"));
        assert_eq!(generation.verdict.unwrap().tier, SafetyTier::Safe);
    }

    #[test]
    fn test_generate_failure_shape() {
        let response = generate("drop table orders", &SchemaSummary::default());
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(GENERATION_FAILED));
        assert_eq!(response.suggestions.map(|s| s.len()), Some(8));
        assert!(response.sql.is_none());
        assert!(response.intent_type.is_none());
    }

    #[test]
    fn test_generate_describe() {
        let response = generate("describe table payment", &SchemaSummary::default());
        assert!(response.success);
        assert_eq!(response.intent_type, Some(IntentKind::DescribeTable));
        assert_eq!(response.table.as_deref(), Some("payment"));
        assert_eq!(
            response.explanation.as_deref(),
            Some("Show structure of table: payment")
        );
        assert_eq!(response.safety_level, Some(SafetyTier::Safe));
        assert!(response.warnings.is_none());
    }
}
