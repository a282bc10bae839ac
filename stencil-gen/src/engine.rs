//! Tera generation engine — [`Generator`] and [`GeneratedOutput`].
//!
//! # Output mapping
//!
//! | Kind      | Source          | Output                          |
//! |-----------|-----------------|---------------------------------|
//! | ScriptLib | `*.jslib`       | `*.exports.js` (binding stubs)  |
//! | Schema    | `*.schema.json` | `*.sql` (CREATE TABLE DDL)      |

use std::path::PathBuf;

use tera::Tera;

use stencil_core::types::{Artifact, ArtifactKind, Location};

use crate::context::{ScriptLibContext, SchemaContext, TableDefinition};
use crate::error::GenerateError;

// ---------------------------------------------------------------------------
// Embedded templates — baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("scriptlib/exports.js.tera", include_str!("templates/exports.js.tera")),
    ("schema/table.sql.tera", include_str!("templates/table.sql.tera")),
];

fn template_name(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::ScriptLib => "scriptlib/exports.js.tera",
        ArtifactKind::Schema => "schema/table.sql.tera",
    }
}

// ---------------------------------------------------------------------------
// GeneratedOutput
// ---------------------------------------------------------------------------

/// One rendered output, addressed both as a location and a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub location: Location,
    pub path: PathBuf,
    pub contents: String,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Tera-based generator for all artifact kinds.
///
/// Pure: the output is a function of the artifact's content and the embedded
/// per-kind templates only. Create once with [`Generator::new`] and reuse.
pub struct Generator {
    tera: Tera,
}

impl Generator {
    /// Construct a new [`Generator`] with embedded templates.
    pub fn new() -> Result<Self, GenerateError> {
        let mut tera = Tera::default();
        // Rendered output is code, not markup.
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(TPLS.to_vec())?;
        Ok(Generator { tera })
    }

    /// Derive the output for one artifact.
    pub fn generate(&self, artifact: &Artifact) -> Result<GeneratedOutput, GenerateError> {
        let location =
            artifact
                .kind
                .output_location(&artifact.location)
                .ok_or_else(|| GenerateError::Location {
                    location: artifact.location.clone(),
                    kind: artifact.kind,
                })?;
        let path = artifact
            .kind
            .output_path(&artifact.path)
            .unwrap_or_else(|| location.to_path());

        let source = std::str::from_utf8(&artifact.contents).map_err(|_| GenerateError::Utf8 {
            location: artifact.location.clone(),
        })?;

        let ctx = match artifact.kind {
            ArtifactKind::ScriptLib => {
                let module = module_stem(&artifact.location, artifact.kind);
                tera::Context::from_serialize(ScriptLibContext::parse(&module, source))?
            }
            ArtifactKind::Schema => {
                let definition = TableDefinition::parse(&artifact.location, source)?;
                tera::Context::from_serialize(SchemaContext::from(definition))?
            }
        };

        let contents = self.tera.render(template_name(artifact.kind), &ctx)?;
        Ok(GeneratedOutput {
            location,
            path,
            contents,
        })
    }
}

/// File stem of a location, with the kind's source suffix removed.
fn module_stem(location: &Location, kind: ArtifactKind) -> String {
    let name = location
        .as_str()
        .rsplit('/')
        .next()
        .unwrap_or(location.as_str());
    name.strip_suffix(kind.source_suffix())
        .unwrap_or(name)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(location: &str, kind: ArtifactKind, contents: &str) -> Artifact {
        Artifact {
            location: Location::from(location),
            path: PathBuf::from(location),
            kind,
            contents: contents.as_bytes().to_vec(),
        }
    }

    #[test]
    fn scriptlib_output_appends_export_bindings() {
        let generator = Generator::new().unwrap();
        let source = "function greet(name) {\n  return \"hello \" + name;\n}\n";
        let output = generator
            .generate(&artifact("lib/util.jslib", ArtifactKind::ScriptLib, source))
            .expect("generate");

        assert_eq!(output.location.as_str(), "lib/util.exports.js");
        assert_eq!(output.path, PathBuf::from("lib/util.exports.js"));
        assert!(output.contents.starts_with(source), "source must be carried verbatim");
        assert!(output.contents.contains("exports.greet = greet;"));
    }

    #[test]
    fn scriptlib_without_functions_has_no_bindings() {
        let generator = Generator::new().unwrap();
        let output = generator
            .generate(&artifact(
                "lib/data.jslib",
                ArtifactKind::ScriptLib,
                "var VERSION = 3;\n",
            ))
            .expect("generate");
        assert!(!output.contents.contains("exports."));
    }

    #[test]
    fn schema_output_is_create_table_ddl() {
        let generator = Generator::new().unwrap();
        let definition = r#"{
            "schema": "SHOP",
            "table": "ORDERS",
            "columns": [
                {"name": "ID", "type": "BIGINT", "primaryKey": true},
                {"name": "NOTE", "type": "NVARCHAR", "length": 64}
            ]
        }"#;
        let output = generator
            .generate(&artifact(
                "db/orders.schema.json",
                ArtifactKind::Schema,
                definition,
            ))
            .expect("generate");

        assert_eq!(output.location.as_str(), "db/orders.sql");
        assert!(output.contents.contains("CREATE TABLE \"SHOP\".\"ORDERS\" ("));
        assert!(output.contents.contains("\"ID\" BIGINT NOT NULL,"));
        assert!(output.contents.contains("\"NOTE\" NVARCHAR(64),"));
        assert!(output.contents.contains("PRIMARY KEY (\"ID\")"));
    }

    #[test]
    fn schema_without_namespace_omits_qualifier() {
        let generator = Generator::new().unwrap();
        let definition = r#"{
            "table": "PLAIN",
            "columns": [{"name": "A", "type": "INTEGER"}]
        }"#;
        let output = generator
            .generate(&artifact("db/plain.schema.json", ArtifactKind::Schema, definition))
            .expect("generate");
        assert!(output.contents.contains("CREATE TABLE \"PLAIN\" ("));
        assert!(
            output.contents.contains("\"A\" INTEGER\n"),
            "single nullable column takes no comma and no NOT NULL: {}",
            output.contents
        );
    }

    #[test]
    fn identical_content_renders_identical_output() {
        let generator = Generator::new().unwrap();
        let a = artifact("lib/x.jslib", ArtifactKind::ScriptLib, "function f() {\n}\n");
        let first = generator.generate(&a).unwrap();
        let second = generator.generate(&a).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_utf8_is_reported_against_the_artifact() {
        let generator = Generator::new().unwrap();
        let bad = Artifact {
            location: Location::from("lib/bin.jslib"),
            path: PathBuf::from("lib/bin.jslib"),
            kind: ArtifactKind::ScriptLib,
            contents: vec![0xff, 0xfe, 0x00],
        };
        let err = generator.generate(&bad).expect_err("must fail");
        assert!(matches!(err, GenerateError::Utf8 { .. }));
    }

    #[test]
    fn malformed_schema_json_is_a_generation_error() {
        let generator = Generator::new().unwrap();
        let err = generator
            .generate(&artifact("db/bad.schema.json", ArtifactKind::Schema, "nope"))
            .expect_err("must fail");
        assert!(matches!(err, GenerateError::Json { .. }));
    }
}
