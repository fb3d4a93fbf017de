use cascade_core::config::{dirs_path, GlobalConfig};
use tempfile::TempDir;

#[test]
fn test_global_config_default_march() {
    let config = GlobalConfig::default();
    assert_eq!(config.runtime.march, "minimal");
}

#[test]
fn test_global_config_default_open_loop_target() {
    let config = GlobalConfig::default();
    assert_eq!(config.runtime.open_loop_target, 1);
    assert_eq!(config.runtime.profile_interval, 0);
    assert!(!config.runtime.disable_warnings);
    assert!(config.runtime.include_dirs.is_empty());
}

#[test]
fn test_global_config_color_defaults_true_from_toml() {
    // When deserialized from an empty TOML, serde's default function kicks in
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert!(config.ui.color);
    assert_eq!(config.runtime.march, "minimal");
}

#[test]
fn test_dirs_path_ends_with_cascade_or_env() {
    let path = dirs_path();
    match std::env::var("CASCADE_HOME") {
        Ok(home) => assert_eq!(path, std::path::PathBuf::from(home)),
        Err(_) => assert!(path.ends_with(".cascade")),
    }
}

#[test]
fn test_global_config_parse_from_toml() {
    let toml = r#"
[runtime]
march = "sw"
include-dirs = ["/opt/verilog", "lib"]
open-loop-target = 3
profile-interval = 500
disable-warnings = true

[ui]
color = false
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.runtime.march, "sw");
    assert_eq!(config.runtime.include_dirs, vec!["/opt/verilog", "lib"]);
    assert_eq!(config.runtime.open_loop_target, 3);
    assert_eq!(config.runtime.profile_interval, 500);
    assert!(config.runtime.disable_warnings);
    assert!(!config.ui.color);
}

#[test]
fn test_load_from_missing_file_returns_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert_eq!(config.runtime.march, "minimal");
}

#[test]
fn test_load_from_invalid_file_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[runtime\nmarch = ").unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(
        err.to_string().contains("Failed to parse global config"),
        "got: {err}"
    );
}
