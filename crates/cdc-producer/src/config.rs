//! Typed configuration shape: the recognized options as a plain, inert
//! `serde::Deserialize` struct. Loading it from a file, environment, or CLI
//! flags, and turning the TLS fields into an actual `rustls`/`native-tls`
//! context, is the bootstrap binary's job; this struct only owns the shape.

use serde::Deserialize;

use crate::error::ConfigError;

/// The configuration options a deployment can set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub cdc_working_dir: String,
    pub cdc_dir_poll_interval_ms: u64,
    pub error_commit_log_reprocess_enabled: bool,
    pub topic_prefix: String,
    pub pulsar_service_url: String,
    pub pulsar_auth_plugin_class_name: Option<String>,
    pub pulsar_auth_params: Option<String>,
    pub ssl_keystore_path: Option<String>,
    pub ssl_truststore_password: Option<String>,
    pub ssl_truststore_type: Option<String>,
    pub ssl_allow_insecure_connection: bool,
    pub ssl_hostname_verification_enable: bool,
    pub ssl_provider: Option<String>,
    /// Comma list.
    pub ssl_cipher_suites: Option<String>,
    /// Comma list.
    pub ssl_enabled_protocols: Option<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            cdc_working_dir: "cdc-working".to_string(),
            // 1s is the commonly deployed cadence for this class of poller.
            cdc_dir_poll_interval_ms: 1_000,
            error_commit_log_reprocess_enabled: false,
            topic_prefix: String::new(),
            pulsar_service_url: "pulsar://localhost:6650".to_string(),
            pulsar_auth_plugin_class_name: None,
            pulsar_auth_params: None,
            ssl_keystore_path: None,
            ssl_truststore_password: None,
            ssl_truststore_type: None,
            ssl_allow_insecure_connection: false,
            ssl_hostname_verification_enable: true,
            ssl_provider: None,
            ssl_cipher_suites: None,
            ssl_enabled_protocols: None,
        }
    }
}

impl ProducerConfig {
    /// Pure, side-effect-free parse of a TOML document; the only file I/O
    /// (if any) is the caller's.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::from)
    }

    pub fn ssl_cipher_suites_list(&self) -> Vec<&str> {
        self.ssl_cipher_suites.as_deref().map(split_comma_list).unwrap_or_default()
    }

    pub fn ssl_enabled_protocols_list(&self) -> Vec<&str> {
        self.ssl_enabled_protocols.as_deref().map(split_comma_list).unwrap_or_default()
    }
}

fn split_comma_list(s: &str) -> Vec<&str> {
    s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_named_values() {
        let config = ProducerConfig::default();
        assert!(!config.error_commit_log_reprocess_enabled);
        assert!(config.ssl_hostname_verification_enable);
    }

    #[test]
    fn from_toml_str_overrides_defaults() {
        let config = ProducerConfig::from_toml_str(
            r#"
            cdc_working_dir = "/var/lib/cdc"
            topic_prefix = "cdc-"
            pulsar_service_url = "pulsar://broker:6650"
            "#,
        )
        .unwrap();
        assert_eq!(config.cdc_working_dir, "/var/lib/cdc");
        assert_eq!(config.topic_prefix, "cdc-");
        // Unspecified fields keep their defaults.
        assert_eq!(config.cdc_dir_poll_interval_ms, 1_000);
    }

    #[test]
    fn comma_lists_split_and_trim() {
        let config = ProducerConfig::from_toml_str(r#"ssl_cipher_suites = "TLS_AES_128, TLS_AES_256""#).unwrap();
        assert_eq!(config.ssl_cipher_suites_list(), vec!["TLS_AES_128", "TLS_AES_256"]);
    }
}
