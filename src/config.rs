//! Configuration management.
//!
//! Settings are loaded from `config/<name>.toml` via the `config` crate.
//! The keys mirror the rig's deployment knobs: the two peripheral device
//! names, Wi-Fi credentials handed to the firmware, the TCP listener port,
//! the PPG source files selectable for a session, and the artifact output
//! directory.

use crate::error::{AppResult, MonitorError};
use config::Config;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub devices: DeviceSettings,
    pub wifi: WifiSettings,
    pub tcp: TcpSettings,
    pub storage: StorageSettings,
    #[serde(default = "default_ppg_files")]
    pub ppg_files: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceSettings {
    #[serde(default = "default_s3_name")]
    pub s3_device_name: String,
    #[serde(default = "default_power_name")]
    pub power_device_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WifiSettings {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TcpSettings {
    #[serde(default = "default_tcp_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub output_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_s3_name() -> String {
    "ESP32_S3_PPG".to_string()
}

fn default_power_name() -> String {
    "ESP32_PPG_POWER".to_string()
}

fn default_tcp_port() -> u16 {
    5000
}

fn default_ppg_files() -> Vec<String> {
    (1..=8).map(|i| format!("ppg_{i}.csv")).collect()
}

impl Settings {
    pub fn new(config_name: Option<&str>) -> AppResult<Self> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = Config::builder()
            .add_source(config::File::with_name(&config_path))
            .build()
            .map_err(MonitorError::Config)?;

        let settings: Settings = s.try_deserialize().map_err(MonitorError::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> AppResult<()> {
        if self.ppg_files.is_empty() {
            return Err(MonitorError::Configuration(
                "ppg_files must list at least one source file".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml_str: &str) -> Settings {
        let s = Config::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .unwrap();
        s.try_deserialize().unwrap()
    }

    #[test]
    fn applies_defaults_for_omitted_keys() {
        let settings = from_toml(
            r#"
            [devices]
            [wifi]
            [tcp]
            [storage]
            output_dir = "data"
            "#,
        );
        assert_eq!(settings.devices.s3_device_name, "ESP32_S3_PPG");
        assert_eq!(settings.devices.power_device_name, "ESP32_PPG_POWER");
        assert_eq!(settings.tcp.port, 5000);
        assert_eq!(settings.ppg_files.len(), 8);
        assert_eq!(settings.ppg_files[0], "ppg_1.csv");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn rejects_empty_ppg_file_list() {
        let settings = from_toml(
            r#"
            ppg_files = []
            [devices]
            [wifi]
            [tcp]
            [storage]
            output_dir = "data"
            "#,
        );
        assert!(settings.validate().is_err());
    }
}
