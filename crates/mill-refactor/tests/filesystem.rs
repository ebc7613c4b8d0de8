//! Refactorings against files on disk

use mill_refactor::{EngineConfig, FsSources, RefactorEngine, RefactorError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, text) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, text).unwrap();
    }
    dir
}

#[test]
fn move_into_new_file_and_write_back() {
    let dir = project(&[(
        "src/utils.ts",
        "import { clamp } from './math';\n\nexport function percent(n: number) {\n  return clamp(n) * 100;\n}\n\nexport function keep() {\n  return 1;\n}\n",
    )]);
    let sources = FsSources::new(dir.path());
    let engine = RefactorEngine::default();
    let command = json!({
        "schemaVersion": 1,
        "operation": "move",
        "selector": { "type": "identifier", "name": "percent", "kind": "function", "filePath": "src/utils.ts" },
        "targetFilePath": "src/format/percent.ts"
    });

    let outputs = engine
        .execute_json(&sources, command.to_string().as_bytes())
        .unwrap();
    sources.write_all(&outputs).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("src/utils.ts")).unwrap(),
        "export function keep() {\n  return 1;\n}\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("src/format/percent.ts")).unwrap(),
        "import { clamp } from \"../math\";\n\nexport function percent(n: number) {\n  return clamp(n) * 100;\n}\n"
    );
}

#[test]
fn failed_command_writes_nothing() {
    let original = "export function a() {}\n";
    let dir = project(&[("a.ts", original), ("b.ts", "export const a = 1;\n")]);
    let sources = FsSources::new(dir.path());
    let engine = RefactorEngine::default();
    let command = json!({
        "schemaVersion": 1,
        "operation": "move",
        "selector": { "type": "identifier", "name": "a", "kind": "function", "filePath": "a.ts" },
        "targetFilePath": "b.ts"
    });

    let err = engine
        .execute_json(&sources, command.to_string().as_bytes())
        .unwrap_err();
    assert!(matches!(err, RefactorError::NameCollision { .. }));
    assert_eq!(fs::read_to_string(dir.path().join("a.ts")).unwrap(), original);
}

#[test]
fn configuration_controls_shared_helpers() {
    let dir = project(&[
        (
            ".typemill/refactor.toml",
            "[refactor]\nexportSharedHelpers = true\n",
        ),
        (
            "lib.ts",
            "function base() { return 2; }\nexport function double(n: number) { return n * base(); }\nexport function triple(n: number) { return n * base() + n; }\n",
        ),
    ]);
    let config = EngineConfig::load(dir.path()).unwrap();
    let engine = RefactorEngine::from_config(&config);
    let sources = FsSources::new(dir.path());
    let command = json!({
        "schemaVersion": 1,
        "operation": "move",
        "selector": { "type": "identifier", "name": "double", "kind": "function", "filePath": "lib.ts" },
        "targetFilePath": "double.ts"
    });

    let outputs = engine
        .execute_json(&sources, command.to_string().as_bytes())
        .unwrap();
    let lib = outputs.get(std::path::Path::new("lib.ts")).unwrap();
    let double = outputs.get(std::path::Path::new("double.ts")).unwrap();
    assert!(lib.as_str().starts_with("export function base()"));
    assert!(double.as_str().starts_with("import { base } from \"./lib\";"));
}
