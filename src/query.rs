//! SQL assembly for ranking requests.

use anyhow::{Result, bail};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Parameters of one ranking request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub score_field: String,
    pub group_fields: Vec<String>,
    /// Columns to show from the primary table.
    #[serde(default)]
    pub show_fields_1: Vec<String>,
    /// Columns to show from the score table.
    #[serde(default)]
    pub show_fields_2: Vec<String>,
    pub year: i32,
}

impl ModelRequest {
    /// Rejects requests that cannot produce a ranking before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.score_field.trim().is_empty() {
            bail!("not enough parameters: score field is required");
        }
        if self.group_fields.is_empty() {
            bail!("not enough parameters: at least one group field is required");
        }
        Ok(())
    }
}

/// Where the joined tables live and how they relate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySource {
    pub schema: String,
    /// Descriptive columns and group fields.
    pub primary_table: String,
    /// Score column and per-period facts.
    pub score_table: String,
    pub join_column: String,
    pub period_column: String,
}

impl Default for QuerySource {
    fn default() -> Self {
        Self {
            schema: "company".to_string(),
            primary_table: "companyData".to_string(),
            score_table: "carbon".to_string(),
            join_column: "ticker".to_string(),
            period_column: "year".to_string(),
        }
    }
}

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(table), quote_ident(column))
}

/// Builds the SELECT for `request` against `source`.
///
/// Primary-table columns are the show fields followed by the group fields;
/// score-table columns are the show fields followed by the score field.
/// A column name selected twice keeps only its first occurrence, so the
/// result header stays unique.
pub fn build_sql(request: &ModelRequest, source: &QuerySource) -> String {
    let mut seen: IndexSet<&str> = IndexSet::new();
    let mut columns = Vec::new();

    let primary = request.show_fields_1.iter().chain(&request.group_fields);
    for field in primary {
        if seen.insert(field.as_str()) {
            columns.push(qualified(&source.primary_table, field));
        }
    }

    let scored = request
        .show_fields_2
        .iter()
        .chain(std::iter::once(&request.score_field));
    for field in scored {
        if seen.insert(field.as_str()) {
            columns.push(qualified(&source.score_table, field));
        }
    }

    let schema = quote_ident(&source.schema);
    format!(
        "SELECT {columns} FROM {schema}.{t1}, {schema}.{t2} WHERE {j1} = {j2} AND {period} = {year} ORDER BY {score} DESC;",
        columns = columns.join(", "),
        t1 = quote_ident(&source.primary_table),
        t2 = quote_ident(&source.score_table),
        j1 = qualified(&source.primary_table, &source.join_column),
        j2 = qualified(&source.score_table, &source.join_column),
        period = qualified(&source.score_table, &source.period_column),
        year = request.year,
        score = qualified(&source.score_table, &request.score_field),
    )
}
