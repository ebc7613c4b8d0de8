//! Refactor command schema and decoding.
//!
//! Commands arrive as JSON documents:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "operation": "move",
//!   "selector": { "type": "identifier", "name": "formatString", "kind": "function", "filePath": "src/a.ts" },
//!   "targetFilePath": "src/b.ts"
//! }
//! ```
//!
//! Decoding goes through a permissive raw form so that a missing field is
//! reported by its wire name instead of as a generic serde error.

use crate::error::{RefactorError, RefactorResult, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Schema version produced by current callers
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A validated refactor command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorCommand {
    pub schema_version: u32,
    pub selector: Selector,
    #[serde(flatten)]
    pub operation: Operation,
}

/// The transformation a command requests, with its operation-specific input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    Move { target_file_path: PathBuf },
    #[serde(rename_all = "camelCase")]
    Rename { new_name: String },
    Remove,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Move { .. } => "move",
            Operation::Rename { .. } => "rename",
            Operation::Remove => "remove",
        }
    }
}

/// Identifies one top-level declaration in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    pub name: String,
    pub declaration_kind: DeclarationKind,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Class,
    Variable,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Function => "function",
            DeclarationKind::Class => "class",
            DeclarationKind::Variable => "variable",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommand {
    schema_version: Option<Value>,
    operation: Option<String>,
    selector: Option<RawSelector>,
    target_file_path: Option<String>,
    new_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSelector {
    #[serde(rename = "type")]
    selector_type: Option<String>,
    name: Option<String>,
    kind: Option<String>,
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBatch {
    schema_version: Option<Value>,
    operations: Option<Vec<Value>>,
}

/// Decode and validate one command
pub fn parse(raw: &[u8], supported_versions: &[u32]) -> RefactorResult<RefactorCommand> {
    let value: Value = serde_json::from_slice(raw)?;
    parse_value(value, supported_versions)
}

/// Decode a batch document: either a JSON array of commands or
/// `{ "schemaVersion": 1, "operations": [...] }`, whose operations inherit
/// the document's version when they carry none.
pub fn parse_batch(raw: &[u8], supported_versions: &[u32]) -> RefactorResult<Vec<RefactorCommand>> {
    let value: Value = serde_json::from_slice(raw)?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| parse_value(item, supported_versions))
            .collect(),
        Value::Object(_) => {
            let batch: RawBatch = serde_json::from_value(value)?;
            let operations = batch
                .operations
                .ok_or_else(|| SchemaError::missing_field("operations"))?;
            operations
                .into_iter()
                .map(|mut item| {
                    if let (Some(version), Value::Object(map)) = (&batch.schema_version, &mut item) {
                        map.entry("schemaVersion").or_insert_with(|| version.clone());
                    }
                    parse_value(item, supported_versions)
                })
                .collect()
        }
        _ => Err(SchemaError::Malformed {
            message: "batch must be an array or an object with 'operations'".to_string(),
        }
        .into()),
    }
}

/// Validate an already-decoded JSON command
pub fn parse_value(value: Value, supported_versions: &[u32]) -> RefactorResult<RefactorCommand> {
    let raw: RawCommand = serde_json::from_value(value)?;

    let version = raw
        .schema_version
        .as_ref()
        .ok_or_else(|| SchemaError::missing_field("schemaVersion"))?;
    let schema_version = parse_version(version)?;
    if !supported_versions.contains(&schema_version) {
        return Err(SchemaError::UnsupportedVersion {
            version: schema_version.to_string(),
        }
        .into());
    }

    let operation = raw
        .operation
        .as_deref()
        .ok_or_else(|| SchemaError::missing_field("operation"))?;

    let selector = parse_selector(raw.selector)?;

    let operation = match operation {
        "move" => {
            reject_field(raw.new_name.is_some(), "newName", "move")?;
            let target = raw
                .target_file_path
                .filter(|path| !path.trim().is_empty())
                .ok_or_else(|| SchemaError::missing_field("targetFilePath"))?;
            Operation::Move {
                target_file_path: PathBuf::from(target),
            }
        }
        "rename" => {
            reject_field(raw.target_file_path.is_some(), "targetFilePath", "rename")?;
            let new_name = raw
                .new_name
                .ok_or_else(|| SchemaError::missing_field("newName"))?;
            if !is_identifier(&new_name) {
                return Err(SchemaError::invalid_field(
                    "newName",
                    format!("'{}' is not a valid identifier", new_name),
                )
                .into());
            }
            Operation::Rename { new_name }
        }
        "remove" => {
            reject_field(raw.target_file_path.is_some(), "targetFilePath", "remove")?;
            reject_field(raw.new_name.is_some(), "newName", "remove")?;
            Operation::Remove
        }
        other => return Err(RefactorError::unsupported_operation(other)),
    };

    Ok(RefactorCommand {
        schema_version,
        selector,
        operation,
    })
}

fn parse_version(value: &Value) -> RefactorResult<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        SchemaError::UnsupportedVersion {
            version: value.to_string(),
        }
        .into()
    })
}

fn parse_selector(raw: Option<RawSelector>) -> RefactorResult<Selector> {
    let raw = raw.ok_or_else(|| SchemaError::missing_field("selector"))?;

    if let Some(selector_type) = &raw.selector_type {
        if selector_type != "identifier" {
            return Err(SchemaError::invalid_field(
                "selector.type",
                format!("unsupported selector type '{}'", selector_type),
            )
            .into());
        }
    }

    let name = raw
        .name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SchemaError::missing_field("selector.name"))?;
    let kind = raw
        .kind
        .ok_or_else(|| SchemaError::missing_field("selector.kind"))?;
    let declaration_kind = match kind.as_str() {
        "function" => DeclarationKind::Function,
        "class" => DeclarationKind::Class,
        "variable" => DeclarationKind::Variable,
        other => {
            return Err(SchemaError::invalid_field(
                "selector.kind",
                format!("expected function, class or variable, got '{}'", other),
            )
            .into())
        }
    };
    let file_path = raw
        .file_path
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| SchemaError::missing_field("selector.filePath"))?;

    Ok(Selector {
        name,
        declaration_kind,
        file_path: PathBuf::from(file_path),
    })
}

fn reject_field(present: bool, field: &str, operation: &str) -> RefactorResult<()> {
    if present {
        return Err(SchemaError::invalid_field(
            field,
            format!("not accepted by the '{}' operation", operation),
        )
        .into());
    }
    Ok(())
}

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield", "let", "static",
    "implements", "interface", "package", "private", "protected", "public", "await",
];

/// Whether `name` can be used as a binding name
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}
