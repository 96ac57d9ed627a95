//! Layered configuration: defaults, global file, workspace files, environment

use super::test_utils::with_env;
use planwright::config::{ConfigLoader, ProviderType};
use planwright::section::SectionKind;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn write_workspace_file(workspace: &TempDir, name: &str, content: &str) {
    let dir = workspace.path().join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn defaults_apply_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let config = with_env(&test_dir, &[], || ConfigLoader::load(workspace.path()).unwrap());

    assert_eq!(config.provider.provider_type, ProviderType::Groq);
    assert_eq!(config.generation.max_attempts, 3);
    assert_eq!(config.generation.pacing_ms, 300);
    assert!(config.generation.enhance);
    assert_eq!(config.logging.output, "stderr");
    assert!(config.validate().is_ok());
}

#[test]
fn workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let global_dir = test_dir.path().join("xdg-config").join("planwright");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        r#"
[provider]
model = "global-model"
temperature = 0.2

[generation]
max_attempts = 5
"#,
    )
    .unwrap();
    write_workspace_file(
        &workspace,
        "config.toml",
        r#"
[generation]
max_attempts = 2
pacing_ms = 50
"#,
    );

    let config = with_env(&test_dir, &[], || ConfigLoader::load(workspace.path()).unwrap());

    assert_eq!(config.provider.model, "global-model");
    assert!((config.provider.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(config.generation.max_attempts, 2);
    assert_eq!(
        config.generation.orchestrator_settings().pacing,
        Duration::from_millis(50)
    );
}

#[test]
fn environment_specific_file_overrides_base_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_workspace_file(&workspace, "config.toml", "[generation]\nenhance = true\n");
    write_workspace_file(&workspace, "staging.toml", "[generation]\nenhance = false\n");

    let config = with_env(&test_dir, &[("PLANWRIGHT_ENV", "staging")], || {
        ConfigLoader::load(workspace.path()).unwrap()
    });

    assert!(!config.generation.enhance);
}

#[test]
fn environment_variables_win_over_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_workspace_file(&workspace, "config.toml", "[generation]\nmax_attempts = 2\n");

    let config = with_env(
        &test_dir,
        &[
            ("PLANWRIGHT__GENERATION__MAX_ATTEMPTS", "4"),
            ("PLANWRIGHT__PROVIDER__MODEL", "env-model"),
        ],
        || ConfigLoader::load(workspace.path()).unwrap(),
    );

    assert_eq!(config.generation.max_attempts, 4);
    assert_eq!(config.generation.retry_policy().max_attempts, 4);
    assert_eq!(config.provider.model, "env-model");
}

#[test]
fn explicit_file_must_exist() {
    let workspace = TempDir::new().unwrap();
    let missing = workspace.path().join("nope.toml");
    assert!(ConfigLoader::load_from_file(&missing).is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let workspace = TempDir::new().unwrap();
    let path = workspace.path().join("planwright.toml");
    fs::write(
        &path,
        r#"
[provider]
provider_type = "local"

[generation]
max_attempts = 0
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(config.ensure_valid().is_err());
}

#[test]
fn catalog_path_replaces_builtin_catalog() {
    let workspace = TempDir::new().unwrap();
    let catalog = workspace.path().join("catalog.toml");
    fs::write(
        &catalog,
        r#"
[[sections]]
key = "pitch"
kind = "narrative"
description = "One paragraph pitch."
min_words = 40

[[sections]]
key = "headcount"
kind = "tabular"
description = "Staff per year."
min_records = 3
record_shape = [
    { name = "year", type = "int" },
    { name = "staff", type = "int" },
]
"#,
    )
    .unwrap();
    let path = workspace.path().join("planwright.toml");
    fs::write(
        &path,
        format!(
            "[generation]\ncatalog_path = \"{}\"\n",
            catalog.display().to_string().replace('\\', "\\\\")
        ),
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    let registry = config.generation.load_registry().unwrap();

    let keys: Vec<&str> = registry.keys().collect();
    assert_eq!(keys, vec!["pitch", "headcount"]);
    assert_eq!(registry.get("pitch").unwrap().min_words(), Some(40));
    assert!(matches!(
        registry.get("headcount").unwrap().kind,
        SectionKind::Tabular { min_records: 3, .. }
    ));
}
