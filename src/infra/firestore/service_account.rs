// =============================================================================
// FIRESTORE SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// The service authenticates to Firestore as a Google service account. The
// key is the JSON file you download from the Cloud Console
// ("IAM & Admin" > "Service Accounts" > "Keys" > "Add Key" > JSON).
//
// Access tokens are minted with the OAuth2 JWT-bearer grant:
// 1. Sign a short-lived RS256 JWT with the account's private key
// 2. POST it to the account's `token_uri`
// 3. Use the returned bearer token until shortly before it expires
//
// Parsing a key also parses its RSA private key, so a credential that loads
// successfully is one that can actually sign.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;

pub(super) const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the provider-reported expiry.
pub(super) const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to read credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential is not valid base64: {0}")]
    Decode(String),

    #[error("Credential is not valid service account JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid service account credential: {0}")]
    Invalid(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Metadata server unavailable: {0}")]
    MetadataServer(String),

    #[error("No usable Firestore service account credential was found")]
    NoCredentials,
}

// =============================================================================
// KEY FILE + JWT STRUCTURES
// =============================================================================

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    /// Always "service_account" for keys we accept. Older exports omit it.
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,

    pub project_id: String,

    /// The service account email (used as issuer in JWT).
    pub client_email: String,

    /// The private key in PEM format.
    private_key: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    /// Max 1 hour from iat.
    exp: u64,
}

/// Token endpoint reply. The metadata server answers with the same shape.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) expires_in: Option<u64>,
}

pub(super) struct CachedToken {
    pub(super) token: String,
    pub(super) expires_at: SystemTime,
}

impl CachedToken {
    pub(super) fn is_fresh(&self) -> bool {
        self.expires_at > SystemTime::now() + EXPIRY_MARGIN
    }
}

// =============================================================================
// AUTHENTICATOR
// =============================================================================

/// Authenticator that handles OAuth2 with service account credentials.
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    signing_key: EncodingKey,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    /// Creates a new authenticator from a JSON key file path.
    pub async fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CredentialError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_json(&content)
    }

    /// Creates a new authenticator from JSON content.
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)?;

        if let Some(kind) = credentials.account_type.as_deref() {
            if kind != "service_account" {
                return Err(CredentialError::Invalid(format!(
                    "expected type 'service_account', found '{}'",
                    kind
                )));
            }
        }
        if credentials.client_email.trim().is_empty() {
            return Err(CredentialError::Invalid("client_email is empty".into()));
        }
        if credentials.project_id.trim().is_empty() {
            return Err(CredentialError::Invalid("project_id is empty".into()));
        }

        let signing_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| CredentialError::Invalid(format!("private_key: {}", e)))?;

        Ok(Self {
            credentials,
            signing_key,
            client: Client::new(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String, CredentialError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.token.clone());
            }
        }

        let (token, lifetime) = self.fetch_new_token().await?;

        {
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                token: token.clone(),
                expires_at: SystemTime::now() + lifetime,
            });
        }

        Ok(token)
    }

    /// Signs the JWT assertion exchanged for an access token.
    fn signed_assertion(&self) -> Result<String, CredentialError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CredentialError::TokenExchange(e.to_string()))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| CredentialError::TokenExchange(e.to_string()))
    }

    async fn fetch_new_token(&self) -> Result<(String, Duration), CredentialError> {
        let jwt = self.signed_assertion()?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &jwt)])
            .send()
            .await
            .map_err(|e| CredentialError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CredentialError::TokenExchange(format!(
                "token endpoint returned {}: {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::TokenExchange(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        tracing::debug!(
            client_email = %self.credentials.client_email,
            lifetime_secs = lifetime.as_secs(),
            "Obtained Firestore access token"
        );
        Ok((token.access_token, lifetime))
    }
}
