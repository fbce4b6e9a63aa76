//! Authentication for outgoing requests.
//!
//! The client only needs something that can attach credentials to a request
//! before it is sent: the [`Authenticator`] trait. [`AuthManager`] is the
//! stock implementation for tokens and GitHub App JWTs; callers with other
//! schemes plug in their own.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Attaches credentials to a request before it is sent.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Mutates `request` so that it carries credentials.
    async fn authenticate(&self, request: &mut HttpRequest) -> GitHubResult<()>;
}

/// Authentication method for GitHub API.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Personal Access Token (classic or fine-grained).
    Pat(SecretString),
    /// GitHub App authentication.
    App(AppAuth),
    /// OAuth token.
    OAuth(SecretString),
    /// GitHub Actions token (from GITHUB_TOKEN).
    Actions(SecretString),
}

impl AuthMethod {
    /// Creates a PAT authentication method.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(SecretString::new(token.into()))
    }

    /// Creates an OAuth authentication method.
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::OAuth(SecretString::new(token.into()))
    }

    /// Creates a GitHub Actions token authentication method.
    pub fn actions(token: impl Into<String>) -> Self {
        Self::Actions(SecretString::new(token.into()))
    }

    /// Creates a GitHub App authentication method.
    pub fn app(app_id: u64, private_key: impl Into<String>) -> Self {
        Self::App(AppAuth {
            app_id,
            private_key: SecretString::new(private_key.into()),
        })
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Pat(t) => {
                let exposed = t.expose_secret();
                if exposed.starts_with("ghp_") {
                    "ghp_***"
                } else if exposed.starts_with("github_pat_") {
                    "github_pat_***"
                } else {
                    "***"
                }
            }
            Self::OAuth(_) => "gho_***",
            Self::Actions(_) => "ghs_***",
            Self::App(_) => "app_jwt",
        }
    }
}

/// GitHub App authentication configuration.
#[derive(Debug, Clone)]
pub struct AppAuth {
    /// GitHub App ID.
    pub app_id: u64,
    /// Private key (PEM format).
    pub private_key: SecretString,
}

/// JWT claims for GitHub App authentication.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    /// Issued at (Unix timestamp).
    iat: i64,
    /// Expiration (Unix timestamp).
    exp: i64,
    /// Issuer (App ID).
    iss: String,
}

/// Authenticator for the built-in [`AuthMethod`]s.
#[derive(Debug, Clone)]
pub struct AuthManager {
    method: AuthMethod,
}

impl AuthManager {
    /// Creates a new authentication manager.
    pub fn new(method: AuthMethod) -> Self {
        Self { method }
    }

    /// Gets the authentication method.
    pub fn method(&self) -> &AuthMethod {
        &self.method
    }

    /// Generates the Authorization header value.
    pub fn auth_header(&self) -> GitHubResult<HeaderValue> {
        let value = match &self.method {
            AuthMethod::Pat(token) | AuthMethod::OAuth(token) | AuthMethod::Actions(token) => {
                format!("Bearer {}", token.expose_secret())
            }
            AuthMethod::App(app) => format!("Bearer {}", self.generate_jwt(app)?),
        };

        let mut header = HeaderValue::from_str(&value).map_err(|_| {
            GitHubError::authentication(format!(
                "Credential for {} contains characters not allowed in a header",
                self.method.token_prefix()
            ))
        })?;
        header.set_sensitive(true);
        Ok(header)
    }

    /// Generates a JWT for GitHub App authentication.
    fn generate_jwt(&self, app: &AppAuth) -> GitHubResult<String> {
        let now = Utc::now();
        // Issued 60 seconds in the past to allow for clock drift
        let iat = (now - Duration::seconds(60)).timestamp();
        // GitHub rejects expirations more than 10 minutes out
        let exp = (now + Duration::minutes(9)).timestamp();

        let claims = JwtClaims {
            iat,
            exp,
            iss: app.app_id.to_string(),
        };

        let key = EncodingKey::from_rsa_pem(app.private_key.expose_secret().as_bytes())
            .map_err(|e| {
                GitHubError::new(
                    GitHubErrorKind::Authentication,
                    format!("Failed to parse private key: {}", e),
                )
                .with_cause(e)
            })?;

        let header = Header::new(Algorithm::RS256);
        encode(&header, &claims, &key).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::Authentication,
                format!("Failed to generate JWT: {}", e),
            )
            .with_cause(e)
        })
    }
}

#[async_trait]
impl Authenticator for AuthManager {
    async fn authenticate(&self, request: &mut HttpRequest) -> GitHubResult<()> {
        let header = self.auth_header()?;
        request.headers.insert(AUTHORIZATION, header);
        Ok(())
    }
}
