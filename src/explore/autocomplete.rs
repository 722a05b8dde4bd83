//! SQL Autocomplete
//!
//! Lexical suggestions for a partially typed statement. There is no parser
//! here: context comes from two substring checks.
//!
//! # Heuristics
//!
//! - token: the run of `[A-Za-z0-9_]` around the cursor (`position` counts
//!   characters, not bytes)
//! - tables are offered once `from` or `join` appears anywhere before the
//!   cursor
//! - columns come from the word following the first `from` in the statement
//!
//! Known blind spots: aliases, multiple tables, joins and subqueries all
//! resolve to whatever follows the first `from`, and `from` inside a longer
//! word also counts.

use serde::{Deserialize, Serialize};

use crate::explore::schema::SchemaIntrospector;

/// Keywords offered on every call
pub const KEYWORDS: [&str; 34] = [
    "SELECT", "FROM", "WHERE", "GROUP BY", "ORDER BY", "HAVING", "LIMIT", "OFFSET",
    "JOIN", "LEFT JOIN", "RIGHT JOIN", "INNER JOIN", "OUTER JOIN", "FULL JOIN",
    "ON", "AND", "OR", "NOT", "IN", "LIKE", "BETWEEN", "IS", "NULL", "TRUE", "FALSE",
    "COUNT", "SUM", "AVG", "MIN", "MAX", "DISTINCT", "AS", "ASC", "DESC",
];

/// Maximum suggestions returned per call
pub const MAX_SUGGESTIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Keyword,
    Table,
    Column,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteSuggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AutocompleteSuggestion {
    fn new(text: impl Into<String>, kind: SuggestionKind, description: String) -> Self {
        Self {
            text: text.into(),
            kind,
            description: Some(description),
        }
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Word under the cursor; empty when `position` is out of range
pub fn token_at(query: &str, position: i64) -> String {
    let chars: Vec<char> = query.chars().collect();
    if position < 0 || position as usize > chars.len() {
        return String::new();
    }
    let position = position as usize;

    let mut start = position;
    while start > 0 && is_token_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = position;
    while end < chars.len() && is_token_char(chars[end]) {
        end += 1;
    }

    chars[start..end].iter().collect()
}

/// Whether table names make sense at the cursor
pub fn expects_table(query: &str, position: i64) -> bool {
    let before: String = if position < 0 {
        String::new()
    } else {
        query.chars().take(position as usize).collect()
    };
    let before = before.to_lowercase();
    before.contains("from") || before.contains("join")
}

/// The word following the first `from`, case preserved
pub fn table_in_query(query: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `query`
    let lowered = query.to_ascii_lowercase();
    let index = lowered.find("from")?;
    query[index + 4..]
        .split_whitespace()
        .next()
        .map(str::to_string)
}

fn matches_prefix(candidate: &str, prefix: &str) -> bool {
    candidate.to_lowercase().starts_with(prefix)
}

/// Suggestion engine backed by the schema introspector
#[derive(Clone)]
pub struct Autocompleter {
    schema: SchemaIntrospector,
}

impl Autocompleter {
    pub fn new(schema: SchemaIntrospector) -> Self {
        Self { schema }
    }

    /// Keyword, then table, then column suggestions, capped at [`MAX_SUGGESTIONS`]
    pub async fn suggest(
        &self,
        database: &str,
        query: &str,
        position: i64,
    ) -> Vec<AutocompleteSuggestion> {
        let token = token_at(query, position).to_lowercase();

        let mut suggestions: Vec<AutocompleteSuggestion> = KEYWORDS
            .iter()
            .filter(|k| matches_prefix(k, &token))
            .map(|k| {
                AutocompleteSuggestion::new(*k, SuggestionKind::Keyword, "SQL keyword".to_string())
            })
            .collect();

        if expects_table(query, position) {
            match self.schema.tables(database).await {
                Ok(tables) => suggestions.extend(
                    tables
                        .into_iter()
                        .filter(|t| matches_prefix(t, &token))
                        .map(|t| {
                            AutocompleteSuggestion::new(
                                t,
                                SuggestionKind::Table,
                                format!("Table in {} database", database),
                            )
                        }),
                ),
                Err(e) => tracing::debug!(database, error = %e, "Skipping table suggestions"),
            }
        }

        if let Some(table) = table_in_query(query) {
            match self.schema.fields(database, &table).await {
                Ok(fields) => suggestions.extend(
                    fields
                        .into_iter()
                        .filter(|f| matches_prefix(&f.name, &token))
                        .map(|f| {
                            let description =
                                format!("Column ({}) in {}.{}", f.type_name, database, table);
                            AutocompleteSuggestion::new(f.name, SuggestionKind::Column, description)
                        }),
                ),
                Err(e) => {
                    tracing::debug!(database, table = %table, error = %e, "Skipping column suggestions")
                }
            }
        }

        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}
