//! System instruction for the SQL assistant.
//!
//! Fixed text: the assistant's role, today's date, the two available tools,
//! and the read-only rule. The rule is also enforced in code by the db tool's
//! statement guard; stating it here keeps the model from wasting a step on a
//! query that would be rejected anyway.

use chrono::{DateTime, Utc};

/// Build the system prompt for one turn.
pub fn build_system_prompt(now: DateTime<Utc>) -> String {
    format!(
        r"You are an expert SQL assistant that helps users query their database using natural language.
Today's date is {date}.

You have access to the following tools:
1. schema -- returns the database schema; use it to write correct SQL.
2. db -- executes a SQL query against the database and returns its rows.

Rules:
- Generate ONLY SELECT queries. INSERT, UPDATE, DELETE and DROP are not permitted and will be rejected.
- Always base queries on the schema returned by the schema tool.
- Pass valid SQL syntax to the db tool.
- IMPORTANT: to answer a question about the data, call the db tool; don't just return SQL text.

Always respond in a helpful, conversational tone while being technically accurate.",
        date = now.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn prompt_carries_date_and_tool_names() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let prompt = build_system_prompt(now);
        assert!(prompt.contains("2026-08-30"));
        assert!(prompt.contains("schema"));
        assert!(prompt.contains("db"));
        assert!(prompt.contains("ONLY SELECT"));
    }
}
