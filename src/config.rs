// Process configuration, read once at startup and passed down explicitly.
//
// Secrets (API key, webhook URL, service account) have no defaults. A `.env`
// file is loaded by main before this runs, so local development works the
// same way as a deployed environment.

use std::path::PathBuf;
use thiserror::Error;

use crate::infra::ai::gemini_client::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::infra::ai::GeminiConfig;
use crate::infra::firestore::{
    CredentialLoader, DEFAULT_LOCAL_CREDENTIALS_FILE, DEFAULT_METADATA_SERVER,
};
use crate::infra::slack::MessageFormat;

pub const DEFAULT_PORT: u16 = 3001;

const GCLOUD_ADC_FILE: &str = "application_default_credentials.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Empty means any origin is allowed.
    pub allowed_origins: Vec<String>,
    pub gemini: GeminiConfig,
    pub slack_webhook_url: Option<String>,
    pub slack_format: MessageFormat,
    pub credentials: CredentialLoader,
    pub verify_credentials_on_startup: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Tests pass a map here so
    /// they never have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let slack_format = match get("SLACK_MESSAGE_FORMAT") {
            Some(raw) => raw
                .parse::<MessageFormat>()
                .map_err(|reason| ConfigError::Invalid {
                    key: "SLACK_MESSAGE_FORMAT",
                    reason,
                })?,
            None => MessageFormat::default(),
        };

        let verify_credentials_on_startup = match get("FIRESTORE_VERIFY_ON_STARTUP") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|e| ConfigError::Invalid {
                key: "FIRESTORE_VERIFY_ON_STARTUP",
                reason: e.to_string(),
            })?,
            None => false,
        };

        Ok(Self {
            port,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: get("GEMINI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                ..GeminiConfig::default()
            },
            slack_webhook_url: get("SLACK_WEBHOOK_URL"),
            slack_format,
            credentials: CredentialLoader {
                encoded: get("FIREBASE_SERVICE_ACCOUNT_BASE64"),
                application_default: get("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
                well_known_file: gcloud_well_known_file(&get),
                metadata_server: Some(
                    get("GCE_METADATA_HOST")
                        .map(|host| metadata_base_url(&host))
                        .unwrap_or_else(|| DEFAULT_METADATA_SERVER.to_string()),
                ),
                local_file: get("FIREBASE_CREDENTIALS_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_CREDENTIALS_FILE)),
            },
            verify_credentials_on_startup,
        })
    }
}

/// Where `gcloud auth application-default login` leaves its credential file.
fn gcloud_well_known_file(get: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(dir) = get("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(dir).join(GCLOUD_ADC_FILE));
    }
    get("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("gcloud"))
        .or_else(|| get("APPDATA").map(|appdata| PathBuf::from(appdata).join("gcloud")))
        .map(|dir| dir.join(GCLOUD_ADC_FILE))
}

/// `GCE_METADATA_HOST` is a bare `host[:port]`.
fn metadata_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

/// Splits a comma-separated origin list, ignoring blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.slack_webhook_url, None);
        assert_eq!(config.slack_format, MessageFormat::Blocks);
        assert_eq!(
            config.credentials.local_file,
            PathBuf::from("serviceAccountKey.json")
        );
        assert!(!config.verify_credentials_on_startup);
        assert_eq!(config.credentials.well_known_file, None);
        assert_eq!(
            config.credentials.metadata_server.as_deref(),
            Some("http://metadata.google.internal")
        );
    }

    #[test]
    fn test_gcloud_well_known_file_locations() {
        let config = config_from(&[("HOME", "/home/relay")]).unwrap();
        assert_eq!(
            config.credentials.well_known_file,
            Some(PathBuf::from(
                "/home/relay/.config/gcloud/application_default_credentials.json"
            ))
        );

        let config =
            config_from(&[("HOME", "/home/relay"), ("CLOUDSDK_CONFIG", "/etc/gcloud")]).unwrap();
        assert_eq!(
            config.credentials.well_known_file,
            Some(PathBuf::from("/etc/gcloud/application_default_credentials.json"))
        );
    }

    #[test]
    fn test_metadata_host_override() {
        let config = config_from(&[("GCE_METADATA_HOST", "127.0.0.1:8080")]).unwrap();
        assert_eq!(
            config.credentials.metadata_server.as_deref(),
            Some("http://127.0.0.1:8080")
        );
    }

    #[test]
    fn test_reads_every_key() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://app.example.com/, http://localhost:5173"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.5-flash"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/T/B/X"),
            ("SLACK_MESSAGE_FORMAT", "text"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/gcp/key.json"),
            ("FIRESTORE_VERIFY_ON_STARTUP", "true"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.allowed_origins,
            vec!["https://app.example.com", "http://localhost:5173"]
        );
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.slack_format, MessageFormat::Text);
        assert_eq!(
            config.credentials.application_default,
            Some(PathBuf::from("/etc/gcp/key.json"))
        );
        assert!(config.verify_credentials_on_startup);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("SLACK_WEBHOOK_URL", "  "), ("PORT", "")]).unwrap();
        assert_eq!(config.slack_webhook_url, None);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_invalid_message_format_is_rejected() {
        let err = config_from(&[("SLACK_MESSAGE_FORMAT", "html")]).unwrap_err();
        assert!(err.to_string().contains("SLACK_MESSAGE_FORMAT"));
    }
}
