//! Identity-provider seam.
//!
//! The core never trusts an identity supplied by the client; it only accepts
//! one returned by the provider's code exchange. [`IdentityProvider`] is the
//! seam the redirect handler calls through, and [`OAuthExchange`] is the
//! production adapter performing the single opaque HTTP exchange (token POST
//! plus identity GET) against configured endpoints.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

/// A verified user identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: u64,
    pub username: String,
    pub avatar: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Outbound authorization URL carrying `state` as the anti-forgery value.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a verified identity.
    async fn exchange(&self, code: &str) -> Result<Identity>;
}

/// Provider endpoint configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_url: String,
    pub token_url: String,
    pub identity_url: String,
    pub redirect_url: String,
}

/// Reqwest-backed OAuth2 code-exchange adapter.
pub struct OAuthExchange {
    client: reqwest::Client,
    auth_url: Url,
    config: ProviderConfig,
}

impl OAuthExchange {
    /// # Errors
    ///
    /// Returns an error if the configured authorization URL does not parse
    /// or the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let auth_url = Url::parse(&config.auth_url).context("invalid authorization URL")?;

        let client = reqwest::Client::builder()
            .user_agent(crate::api::APP_USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            auth_url,
            config,
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct MeResponse {
    user: MeUser,
}

#[derive(Deserialize)]
struct MeUser {
    #[serde(deserialize_with = "id_from_string")]
    id: u64,
    username: String,
    #[serde(default)]
    avatar: Option<String>,
}

// Provider user ids are JSON strings on the wire
fn id_from_string<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[async_trait]
impl IdentityProvider for OAuthExchange {
    fn authorize_url(&self, state: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", "identify")
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("access_type", "online")
            .append_pair("state", state);
        url.to_string()
    }

    async fn exchange(&self, code: &str) -> Result<Identity> {
        let token: TokenResponse = {
            let response = self
                .client
                .post(&self.config.token_url)
                .form(&[
                    ("client_id", self.config.client_id.as_str()),
                    ("client_secret", self.config.client_secret.expose_secret()),
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", self.config.redirect_url.as_str()),
                ])
                .send()
                .await
                .context("token exchange request failed")?;

            if !response.status().is_success() {
                bail!("token exchange rejected: {}", response.status());
            }
            response
                .json()
                .await
                .context("malformed token exchange response")?
        };

        let me: MeResponse = {
            let response = self
                .client
                .get(&self.config.identity_url)
                .bearer_auth(&token.access_token)
                .send()
                .await
                .context("identity request failed")?;

            if !response.status().is_success() {
                bail!("identity request rejected: {}", response.status());
            }
            response
                .json()
                .await
                .context("malformed identity response")?
        };

        if me.user.id == 0 || me.user.username.is_empty() {
            bail!("provider returned an invalid identity");
        }

        Ok(Identity {
            id: me.user.id,
            username: me.user.username,
            avatar: me.user.avatar.unwrap_or_default(),
        })
    }
}
