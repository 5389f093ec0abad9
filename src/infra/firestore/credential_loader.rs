// Resolves the Firestore identity once at startup.
//
// Sources are tried in a fixed order and the first one that yields a usable
// identity wins:
// 1. FIREBASE_SERVICE_ACCOUNT_BASE64 - the key JSON, base64 encoded
// 2. Application Default Credentials, in the usual Google order:
//    a. GOOGLE_APPLICATION_CREDENTIALS, or the gcloud well-known file when unset
//    b. the metadata server of the hosting environment
// 3. FIREBASE_CREDENTIALS_FILE       - a key file next to the service
//
// The caller decides what to do when nothing works (main exits the process).

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::metadata_server::MetadataServerAuth;
use super::service_account::{CredentialError, ServiceAccountAuth};

pub const DEFAULT_LOCAL_CREDENTIALS_FILE: &str = "serviceAccountKey.json";

/// Standard alphabet, padding optional. Whitespace is stripped before decoding
/// since `base64` wraps its output at 76 columns.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialSource {
    EncodedEnvironment,
    ApplicationDefault,
    MetadataServer,
    LocalFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialSource::EncodedEnvironment => "base64 credential from environment",
            CredentialSource::ApplicationDefault => "application default credentials",
            CredentialSource::MetadataServer => "metadata server",
            CredentialSource::LocalFile => "local service account file",
        };
        f.write_str(name)
    }
}

/// Where access tokens come from: a key we sign with, or the host.
pub enum TokenSource {
    ServiceAccount(ServiceAccountAuth),
    MetadataServer(MetadataServerAuth),
}

/// The database identity held for the lifetime of the process.
pub struct FirestoreIdentity {
    pub source: CredentialSource,
    tokens: TokenSource,
}

impl FirestoreIdentity {
    pub fn new(source: CredentialSource, tokens: TokenSource) -> Self {
        Self { source, tokens }
    }

    pub fn project_id(&self) -> &str {
        match &self.tokens {
            TokenSource::ServiceAccount(auth) => auth.project_id(),
            TokenSource::MetadataServer(auth) => auth.project_id(),
        }
    }

    pub async fn access_token(&self) -> Result<String, CredentialError> {
        match &self.tokens {
            TokenSource::ServiceAccount(auth) => auth.get_access_token().await,
            TokenSource::MetadataServer(auth) => auth.get_access_token().await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialLoader {
    pub encoded: Option<String>,
    /// `GOOGLE_APPLICATION_CREDENTIALS`.
    pub application_default: Option<PathBuf>,
    /// gcloud's `application_default_credentials.json`, used when the variable is unset.
    pub well_known_file: Option<PathBuf>,
    /// Metadata server base URL. `None` skips that stage.
    pub metadata_server: Option<String>,
    pub local_file: PathBuf,
}

impl CredentialLoader {
    pub async fn load(&self) -> Result<FirestoreIdentity, CredentialError> {
        if let Some(encoded) = self.encoded.as_deref().filter(|v| !v.trim().is_empty()) {
            match Self::from_encoded(encoded) {
                Ok(auth) => return Ok(Self::from_key(CredentialSource::EncodedEnvironment, auth)),
                Err(e) => Self::skipped(CredentialSource::EncodedEnvironment, &e),
            }
        }

        match self.application_default.as_ref().or(self.well_known_file.as_ref()) {
            Some(path) => match ServiceAccountAuth::from_file(path).await {
                Ok(auth) => return Ok(Self::from_key(CredentialSource::ApplicationDefault, auth)),
                Err(e) => Self::skipped(CredentialSource::ApplicationDefault, &e),
            },
            None => tracing::warn!(
                source = %CredentialSource::ApplicationDefault,
                "Skipping credential source: no credential file configured"
            ),
        }

        if let Some(base_url) = &self.metadata_server {
            match MetadataServerAuth::discover(base_url).await {
                Ok(auth) => {
                    tracing::info!(
                        source = %CredentialSource::MetadataServer,
                        project_id = %auth.project_id(),
                        "Loaded Firestore credentials"
                    );
                    return Ok(FirestoreIdentity::new(
                        CredentialSource::MetadataServer,
                        TokenSource::MetadataServer(auth),
                    ));
                }
                Err(e) => Self::skipped(CredentialSource::MetadataServer, &e),
            }
        }

        match ServiceAccountAuth::from_file(&self.local_file).await {
            Ok(auth) => Ok(Self::from_key(CredentialSource::LocalFile, auth)),
            Err(e) => {
                Self::skipped(CredentialSource::LocalFile, &e);
                tracing::error!("All Firestore credential sources failed");
                Err(CredentialError::NoCredentials)
            }
        }
    }

    fn from_encoded(encoded: &str) -> Result<ServiceAccountAuth, CredentialError> {
        let compact: String = encoded.split_ascii_whitespace().collect();
        let bytes = LENIENT_BASE64
            .decode(compact)
            .map_err(|e| CredentialError::Decode(e.to_string()))?;
        let json = String::from_utf8(bytes).map_err(|e| CredentialError::Decode(e.to_string()))?;
        ServiceAccountAuth::from_json(&json)
    }

    fn skipped(source: CredentialSource, error: &CredentialError) {
        tracing::warn!(%source, error = %error, "Skipping credential source");
    }

    fn from_key(source: CredentialSource, auth: ServiceAccountAuth) -> FirestoreIdentity {
        tracing::info!(
            %source,
            project_id = %auth.project_id(),
            client_email = %auth.client_email(),
            "Loaded Firestore credentials"
        );
        FirestoreIdentity::new(source, TokenSource::ServiceAccount(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::super::service_account::test_support::key_json;
    use super::*;
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

    fn key_file(project_id: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(key_json(project_id, TOKEN_URI).as_bytes()).unwrap();
        file
    }

    fn missing_path(dir: &TempDir) -> PathBuf {
        dir.path().join("does-not-exist.json")
    }

    /// A loader where every source is absent or missing.
    fn empty_loader(dir: &TempDir) -> CredentialLoader {
        CredentialLoader {
            encoded: None,
            application_default: None,
            well_known_file: None,
            metadata_server: None,
            local_file: missing_path(dir),
        }
    }

    async fn metadata_server(project_id: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/computeMetadata/v1/project/project-id"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_string(project_id))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_encoded_credential_wins() {
        let adc = key_file("from-adc");
        let local = key_file("from-local");
        let loader = CredentialLoader {
            encoded: Some(STANDARD.encode(key_json("from-env", TOKEN_URI))),
            application_default: Some(adc.path().to_path_buf()),
            well_known_file: None,
            metadata_server: None,
            local_file: local.path().to_path_buf(),
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::EncodedEnvironment);
        assert_eq!(identity.project_id(), "from-env");
    }

    #[tokio::test]
    async fn test_line_wrapped_encoded_credential() {
        // What `base64 serviceAccountKey.json` prints: 76-column lines.
        let encoded = STANDARD.encode(key_json("wrapped", TOKEN_URI));
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(wrapped.contains('\n'));

        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            encoded: Some(format!("{}\n", wrapped)),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::EncodedEnvironment);
        assert_eq!(identity.project_id(), "wrapped");
    }

    #[tokio::test]
    async fn test_unpadded_encoded_credential() {
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            encoded: Some(STANDARD_NO_PAD.encode(key_json("unpadded", TOKEN_URI))),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.project_id(), "unpadded");
    }

    #[tokio::test]
    async fn test_bad_encoding_falls_through_to_application_default() {
        let adc = key_file("from-adc");
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            encoded: Some("%%% not base64 %%%".to_string()),
            application_default: Some(adc.path().to_path_buf()),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::ApplicationDefault);
        assert_eq!(identity.project_id(), "from-adc");
    }

    #[tokio::test]
    async fn test_well_known_file_used_when_variable_unset() {
        let gcloud = key_file("from-gcloud");
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            well_known_file: Some(gcloud.path().to_path_buf()),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::ApplicationDefault);
        assert_eq!(identity.project_id(), "from-gcloud");
    }

    #[tokio::test]
    async fn test_explicit_variable_beats_well_known_file() {
        let adc = key_file("from-adc");
        let gcloud = key_file("from-gcloud");
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            application_default: Some(adc.path().to_path_buf()),
            well_known_file: Some(gcloud.path().to_path_buf()),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.project_id(), "from-adc");
    }

    #[tokio::test]
    async fn test_metadata_server_when_no_key_is_available() {
        let server = metadata_server("cloud-run-project").await;
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            metadata_server: Some(server.uri()),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::MetadataServer);
        assert_eq!(identity.project_id(), "cloud-run-project");
    }

    #[tokio::test]
    async fn test_key_file_beats_metadata_server() {
        let server = metadata_server("cloud-run-project").await;
        let adc = key_file("from-adc");
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            application_default: Some(adc.path().to_path_buf()),
            metadata_server: Some(server.uri()),
            ..empty_loader(&dir)
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::ApplicationDefault);
    }

    #[tokio::test]
    async fn test_local_file_is_last_resort() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let local = key_file("from-local");
        let dir = TempDir::new().unwrap();
        let loader = CredentialLoader {
            encoded: Some(STANDARD.encode("{\"not\":\"a key\"}")),
            application_default: Some(missing_path(&dir)),
            well_known_file: None,
            metadata_server: Some(server.uri()),
            local_file: local.path().to_path_buf(),
        };

        let identity = loader.load().await.unwrap();

        assert_eq!(identity.source, CredentialSource::LocalFile);
        assert_eq!(identity.project_id(), "from-local");
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_an_error() {
        let dir = TempDir::new().unwrap();

        let err = empty_loader(&dir).load().await.err().unwrap();

        assert!(matches!(err, CredentialError::NoCredentials));
    }

    #[test]
    fn test_source_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(CredentialSource::ApplicationDefault).unwrap(),
            serde_json::json!("application-default")
        );
        assert_eq!(
            serde_json::to_value(CredentialSource::MetadataServer).unwrap(),
            serde_json::json!("metadata-server")
        );
    }
}
