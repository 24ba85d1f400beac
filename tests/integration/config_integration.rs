//! Integration tests for configuration loading.

use fluently::client::InMemoryClient;
use fluently::config::{ConfigLoader, FluentlyConfig};
use fluently::Operation;
use std::fs;
use tempfile::TempDir;

use crate::integration::{with_config_home, SITE};

#[test]
fn test_workspace_config_overrides_global_config() {
    let temp_dir = TempDir::new().unwrap();
    with_config_home(&temp_dir, || {
        let global_dir = temp_dir.path().join("xdg").join("fluently");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(
            global_dir.join("config.toml"),
            r#"
[operation]
default_list_template = "Tasks"

[logging]
level = "warn"
"#,
        )
        .unwrap();

        let workspace = temp_dir.path().join("ws");
        fs::create_dir_all(workspace.join("config")).unwrap();
        fs::write(
            workspace.join("config").join("config.toml"),
            r#"
[operation]
default_list_template = "Announcements"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.operation.default_list_template, "Announcements");
        assert_eq!(config.logging.level, "warn");
    });
}

#[test]
fn test_load_without_any_files_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    with_config_home(&temp_dir, || {
        let config = ConfigLoader::load(temp_dir.path()).unwrap();
        assert_eq!(config.operation, FluentlyConfig::default().operation);
        assert_eq!(
            ConfigLoader::global_config_path().unwrap(),
            temp_dir
                .path()
                .join("xdg")
                .join("fluently")
                .join("config.toml")
        );
    });
}

#[test]
fn test_configured_template_drives_create_list() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("fluently.toml");
    fs::write(
        &config_file,
        r#"
[operation]
default_list_template = "Contacts"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let mut op = Operation::from_config(InMemoryClient::new(SITE), SITE, &config).unwrap();
    op.select_web().unwrap().create_list("People").unwrap();
    op.execute().unwrap();

    let list = op.cache().recall("People").unwrap();
    let loaded = op.state_of(list).unwrap().loaded().unwrap();
    assert_eq!(loaded.property("Template"), Some(&serde_json::json!("Contacts")));
}
