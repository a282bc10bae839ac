//! Rendering contexts parsed from artifact content.
//!
//! Each artifact kind has its own parse step that turns raw content into a
//! serializable payload for the matching template:
//! - `*.jslib` → top-level function declarations, for export binding stubs
//! - `*.schema.json` → a table definition, for CREATE TABLE DDL

use serde::{Deserialize, Serialize};

use stencil_core::types::Location;

use crate::error::GenerateError;

// ---------------------------------------------------------------------------
// Script libraries
// ---------------------------------------------------------------------------

/// Rendering payload for a script library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptLibContext {
    /// Library name (file stem without the `.jslib` suffix).
    pub module: String,
    /// Original library source, carried into the output verbatim.
    pub source: String,
    /// Top-level function names, in declaration order.
    pub functions: Vec<String>,
}

impl ScriptLibContext {
    pub fn parse(module: &str, source: &str) -> Self {
        Self {
            module: module.to_string(),
            source: source.to_string(),
            functions: top_level_functions(source),
        }
    }
}

/// Extract the names of functions declared at brace depth zero.
///
/// Line-based: comments after `//` are ignored and `{`/`}` inside them do not
/// count toward nesting depth. Declarations inside other functions are
/// skipped, so only library-level entry points get export bindings.
fn top_level_functions(source: &str) -> Vec<String> {
    let mut functions = Vec::new();
    let mut depth = 0usize;

    for line in source.lines() {
        let code = line.split("//").next().unwrap_or("");
        let trimmed = code.trim_start();

        if depth == 0 {
            if let Some(rest) = trimmed.strip_prefix("function ") {
                if let Some(name) = leading_identifier(rest) {
                    functions.push(name.to_string());
                }
            }
        }

        for ch in code.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    functions
}

fn leading_identifier(input: &str) -> Option<&str> {
    let input = input.trim_start();
    let end = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(input.len());
    let candidate = &input[..end];
    if candidate.is_empty() || candidate.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(candidate)
}

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// A `*.schema.json` table definition as written by artifact authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Optional schema (namespace) the table lives in.
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub length: Option<u32>,
    /// Columns are nullable unless declared otherwise or part of the key.
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, rename = "primaryKey")]
    pub primary_key: bool,
}

fn default_true() -> bool {
    true
}

impl TableDefinition {
    /// Parse and validate a table definition from artifact content.
    pub fn parse(location: &Location, content: &str) -> Result<Self, GenerateError> {
        let definition: TableDefinition =
            serde_json::from_str(content).map_err(|source| GenerateError::Json {
                location: location.clone(),
                source,
            })?;
        definition.validate(location)?;
        Ok(definition)
    }

    fn validate(&self, location: &Location) -> Result<(), GenerateError> {
        let fail = |message: String| GenerateError::Schema {
            location: location.clone(),
            message,
        };
        if self.table.trim().is_empty() {
            return Err(fail("table name is empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(fail(format!("table {} declares no columns", self.table)));
        }
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(fail(format!("table {} has an unnamed column", self.table)));
            }
            if column.column_type.trim().is_empty() {
                return Err(fail(format!("column {} has no type", column.name)));
            }
        }
        Ok(())
    }
}

/// Flattened payload for the DDL template: SQL types are pre-rendered and
/// key columns pre-collected so the template stays declarative.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaContext {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<SchemaColumn>,
    pub primary_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaColumn {
    pub name: String,
    pub sql_type: String,
    pub not_null: bool,
}

impl From<TableDefinition> for SchemaContext {
    fn from(definition: TableDefinition) -> Self {
        let primary_keys: Vec<String> = definition
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        let columns = definition
            .columns
            .into_iter()
            .map(|c| SchemaColumn {
                sql_type: match c.length {
                    Some(length) => format!("{}({length})", c.column_type),
                    None => c.column_type.clone(),
                },
                not_null: !c.nullable || c.primary_key,
                name: c.name,
            })
            .collect();
        Self {
            schema: definition.schema,
            table: definition.table,
            columns,
            primary_keys,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
