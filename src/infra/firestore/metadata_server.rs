// =============================================================================
// GCE METADATA SERVER IDENTITY
// =============================================================================
//
// On Compute Engine, Cloud Run, GKE and friends there is no key file: the host
// attaches a service account and hands out tokens through the metadata server.
//
// Every request must carry `Metadata-Flavor: Google`, and the server is only
// reachable from inside Google Cloud, so discovery uses short timeouts to keep
// startup quick everywhere else.

use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

use super::service_account::{CachedToken, CredentialError, TokenResponse, DATASTORE_SCOPE};

pub const DEFAULT_METADATA_SERVER: &str = "http://metadata.google.internal";

const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");
const PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Token source backed by the host's attached service account.
pub struct MetadataServerAuth {
    client: Client,
    base_url: String,
    project_id: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl MetadataServerAuth {
    /// Asks the metadata server for the project id. Success means we are on
    /// a Google host with an attached identity.
    pub async fn discover(base_url: &str) -> Result<Self, CredentialError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CredentialError::MetadataServer(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = client
            .get(format!("{}{}", base_url, PROJECT_ID_PATH))
            .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            .send()
            .await
            .map_err(|e| CredentialError::MetadataServer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::MetadataServer(format!(
                "project id lookup returned {}",
                status
            )));
        }

        let project_id = response
            .text()
            .await
            .map_err(|e| CredentialError::MetadataServer(e.to_string()))?
            .trim()
            .to_string();
        if project_id.is_empty() {
            return Err(CredentialError::MetadataServer("empty project id".into()));
        }

        Ok(Self {
            client,
            base_url,
            project_id,
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Gets a valid access token for the attached account, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String, CredentialError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.token.clone());
            }
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, TOKEN_PATH))
            .query(&[("scopes", DATASTORE_SCOPE)])
            .header(METADATA_FLAVOR.0, METADATA_FLAVOR.1)
            .send()
            .await
            .map_err(|e| CredentialError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CredentialError::TokenExchange(format!(
                "metadata server returned {}: {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::TokenExchange(e.to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));

        let mut cached = self.cached_token.write().await;
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: SystemTime::now() + lifetime,
        });

        tracing::debug!(
            project_id = %self.project_id,
            lifetime_secs = lifetime.as_secs(),
            "Obtained metadata server access token"
        );
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_project_id(server: &MockServer, project_id: &str) {
        Mock::given(method("GET"))
            .and(path(PROJECT_ID_PATH))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_string(project_id))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_discover_reads_project_id() {
        let server = MockServer::start().await;
        mount_project_id(&server, "cloud-run-project\n").await;

        let auth = MetadataServerAuth::discover(&server.uri()).await.unwrap();

        assert_eq!(auth.project_id(), "cloud-run-project");
    }

    #[tokio::test]
    async fn test_discover_fails_off_google_hosts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = MetadataServerAuth::discover(&server.uri()).await.err().unwrap();

        assert!(matches!(err, CredentialError::MetadataServer(_)));
    }

    #[tokio::test]
    async fn test_token_is_fetched_with_datastore_scope_and_cached() {
        let server = MockServer::start().await;
        mount_project_id(&server, "cloud-run-project").await;
        Mock::given(method("GET"))
            .and(path(TOKEN_PATH))
            .and(header("Metadata-Flavor", "Google"))
            .and(query_param("scopes", DATASTORE_SCOPE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.metadata-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = MetadataServerAuth::discover(&server.uri()).await.unwrap();

        assert_eq!(auth.get_access_token().await.unwrap(), "ya29.metadata-token");
        assert_eq!(auth.get_access_token().await.unwrap(), "ya29.metadata-token");
    }
}
