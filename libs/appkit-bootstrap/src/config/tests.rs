use super::*;
use std::fs;
use tempfile::tempdir;

fn is_normalized_path(p: &str) -> bool {
    PathBuf::from(p).is_absolute() && !p.starts_with('~')
}

#[test]
fn test_default_config_structure() {
    let config = AppConfig::default();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3000);
    // raw (not yet normalized)
    assert_eq!(config.server.home_dir, "");
    assert_eq!(config.server.timeout_sec, 0);

    let logging = config.logging.as_ref().unwrap();
    let default_section = &logging["default"];
    assert_eq!(default_section.console_level, "info");
    assert_eq!(default_section.file, "logs/example-app.log");

    assert!(config.modules.is_empty());
    assert_eq!(config.bind_addr(), "127.0.0.1:3000");
}

#[test]
fn test_load_layered_reads_server_and_modules() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("cfg.yaml");
    let home = tmp.path().join("home");

    let yaml = format!(
        r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090
  timeout_sec: 30

logging:
  default:
    console_level: debug
    file: "logs/default.log"

modules:
  example_app:
    contentful:
      space_id: "abc"
"#,
        home.to_string_lossy().replace('\\', "/")
    );
    fs::write(&cfg_path, yaml).unwrap();

    let config = AppConfig::load_layered(&cfg_path).unwrap();

    assert!(is_normalized_path(&config.server.home_dir));
    assert!(home.exists());
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.timeout_sec, 30);

    let def = &config.logging.as_ref().unwrap()["default"];
    assert_eq!(def.console_level, "debug");
    assert_eq!(def.file, "logs/default.log");

    assert_eq!(
        config.modules["example_app"]["contentful"]["space_id"],
        "abc"
    );
}

#[test]
fn test_minimal_yaml_leaves_optional_sections_empty() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("cfg.yaml");
    let yaml = format!(
        r#"
server:
  home_dir: "{}"
  host: "localhost"
  port: 8080
"#,
        tmp.path().join("minimal").to_string_lossy().replace('\\', "/")
    );
    fs::write(&cfg_path, yaml).unwrap();

    let config = AppConfig::load_layered(&cfg_path).unwrap();

    assert_eq!(config.server.host, "localhost");
    assert_eq!(config.server.port, 8080);
    assert!(config.logging.is_none());
    assert!(config.modules.is_empty());
}

#[test]
fn test_unknown_top_level_section_is_rejected() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("cfg.yaml");
    let yaml = format!(
        r#"
server:
  home_dir: "{}"
  host: "localhost"
  port: 8080
database:
  url: "sqlite://nope"
"#,
        tmp.path().to_string_lossy().replace('\\', "/")
    );
    fs::write(&cfg_path, yaml).unwrap();

    assert!(AppConfig::load_layered(&cfg_path).is_err());
}

#[test]
fn test_cli_overrides() {
    let mut config = AppConfig::default();
    let args = CliArgs {
        port: Some(4000),
        verbose: 2,
        ..Default::default()
    };

    config.apply_cli_overrides(&args);

    assert_eq!(config.server.port, 4000);
    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging["default"].console_level, "trace");
}

#[test]
fn test_cli_verbose_levels() {
    for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")] {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs {
            verbose,
            ..Default::default()
        });
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, expected);
    }
}

#[test]
fn test_modules_dir_files_are_merged() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("cfg.yaml");
    let modules_dir = tmp.path().join("modules");
    fs::create_dir_all(&modules_dir).unwrap();
    fs::write(
        modules_dir.join("example_app.yaml"),
        r#"
localization:
  default_locale: "de-DE"
"#,
    )
    .unwrap();
    fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

    let yaml = format!(
        r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 3000
modules_dir: "{}"
"#,
        tmp.path().join("home").to_string_lossy().replace('\\', "/"),
        modules_dir.to_string_lossy().replace('\\', "/")
    );
    fs::write(&cfg_path, yaml).unwrap();

    let config = AppConfig::load_layered(&cfg_path).unwrap();

    assert_eq!(config.modules.len(), 1);
    assert_eq!(
        config.modules["example_app"]["localization"]["default_locale"],
        "de-DE"
    );
}

#[test]
fn test_to_yaml_roundtrip() {
    let config = AppConfig::default();
    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("server:"));
    assert!(yaml.contains("logging:"));

    let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(roundtrip.server.port, config.server.port);
}
