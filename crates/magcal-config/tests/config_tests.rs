//! Integration tests for the configuration system

use magcal_config::{ConfigError, DaemonConfig, OutputFormat};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test helper for configuration tests
struct ConfigTestEnvironment {
    #[allow(dead_code)]
    temp_dir: TempDir,
    config_dir: PathBuf,
}

impl ConfigTestEnvironment {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_dir = temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config directory");

        Self {
            temp_dir,
            config_dir,
        }
    }

    fn write_config(&self, name: &str, content: &str) -> PathBuf {
        let path = self.config_dir.join(name);
        fs::write(&path, content).expect("Failed to write config");
        path
    }
}

#[test]
fn test_full_config_parsing() {
    let env = ConfigTestEnvironment::new();

    let config_content = r#"
[device]
data_path = "/dev/akm8963"
sensitivity_path = "/sys/class/magnetometer/akm8963/asa"

[calibration]
store_path = "/data/misc/akmd_set.txt"

[sampling]
delay_us = 66667

[output]
format = "json"
log_level = "debug"
"#;

    let path = env.write_config("magcal.toml", config_content);
    let config = DaemonConfig::load(&path).unwrap();

    assert_eq!(config.sampling.delay_us, 66_667);
    assert_eq!(config.output.format, OutputFormat::Json);
    assert_eq!(config.output.log_level, "debug");
}

#[test]
fn test_empty_config_uses_defaults() {
    let env = ConfigTestEnvironment::new();
    let path = env.write_config("empty.toml", "");

    let config = DaemonConfig::load(&path).unwrap();
    assert_eq!(config.sampling.delay_us, 200_000);
    assert_eq!(config.device.data_path, PathBuf::from("/dev/akm8963"));
}

#[test]
fn test_invalid_toml() {
    let env = ConfigTestEnvironment::new();
    let path = env.write_config("broken.toml", "[sampling\ndelay_us = ");

    let result = DaemonConfig::load(&path);
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_wrong_type_rejected() {
    let env = ConfigTestEnvironment::new();
    let path = env.write_config("typed.toml", "[sampling]\ndelay_us = \"fast\"\n");

    assert!(DaemonConfig::load(&path).is_err());
}

#[test]
fn test_empty_path_rejected() {
    let env = ConfigTestEnvironment::new();
    let path = env.write_config("paths.toml", "[calibration]\nstore_path = \"\"\n");

    let result = DaemonConfig::load(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_save_creates_directories() {
    let env = ConfigTestEnvironment::new();
    let path = env.config_dir.join("nested").join("magcal.toml");

    DaemonConfig::default().save(&path).unwrap();
    assert!(path.exists());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[sampling]"));
    assert!(content.contains("delay_us = 200000"));
}
