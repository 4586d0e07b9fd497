//! Session handling for the Google-backed context features.
//!
//! The access token lives in the system keyring, never on disk. Everything
//! here treats the OAuth provider as an external collaborator: we verify
//! tokens and fetch the profile, but token exchange happens in the user's
//! browser.

use std::error::Error;

use keyring::Entry;
use tracing::debug;

use crate::api::{ApiError, TokenInfo, UserProfile};

const KEYRING_SERVICE: &str = "surcor";
const KEYRING_ACCOUNT: &str = "google-access-token";

const TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.appdata",
    "https://www.googleapis.com/auth/drive.photos.readonly",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub access_token: Option<String>,
}

impl SessionStatus {
    pub fn signed_out() -> Self {
        Self::default()
    }
}

pub struct SessionManager {
    use_keyring: bool,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct a SessionManager, optionally disabling keyring access
    /// (useful for tests).
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn store_token(&self, token: &str) -> Result<(), Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self) -> Result<Option<String>, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(Box::new(err)),
        }
    }

    /// Remove the stored token. Returns whether a token was present.
    pub fn clear_token(&self) -> Result<bool, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(false);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(Box::new(err)),
        }
    }

    /// Report session status the way the rest of the app consumes it: a
    /// stored token that the provider confirms as live, or signed out.
    /// Verification failures of any kind degrade to signed out.
    pub async fn check_status(&self, client: &reqwest::Client) -> SessionStatus {
        let token = match self.get_token() {
            Ok(Some(token)) => token,
            Ok(None) => return SessionStatus::signed_out(),
            Err(err) => {
                debug!(error = %err, "keyring lookup failed during status check");
                return SessionStatus::signed_out();
            }
        };

        match verify_token(client, &token).await {
            Ok(info) if info.is_live() => SessionStatus {
                authenticated: true,
                access_token: Some(token),
            },
            Ok(_) => SessionStatus::signed_out(),
            Err(err) => {
                debug!(error = %err, "token verification failed");
                SessionStatus::signed_out()
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Ask the provider whether a token is still valid and what lifetime remains.
pub async fn verify_token(
    client: &reqwest::Client,
    access_token: &str,
) -> Result<TokenInfo, ApiError> {
    let response = client
        .get(TOKENINFO_URL)
        .query(&[("access_token", access_token)])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }

    Ok(response.json::<TokenInfo>().await?)
}

/// Fetch the signed-in user's profile. A 401 maps to
/// [`ApiError::Unauthorized`] so callers prompt re-login rather than showing
/// a generic failure.
pub async fn fetch_profile(
    client: &reqwest::Client,
    access_token: &str,
) -> Result<UserProfile, ApiError> {
    let response = client
        .get(USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }

    Ok(response.json::<UserProfile>().await?)
}

/// Consent URL for the user to open in a browser. Token exchange stays out
/// of scope; the resulting access token is pasted back into `surcor auth`.
pub fn authorization_url(client_id: &str, state: &str) -> Result<String, Box<dyn Error>> {
    let mut url = reqwest::Url::parse(AUTHORIZATION_ENDPOINT)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", client_id);
        query.append_pair("access_type", "offline");
        query.append_pair("scope", &SCOPES.join(" "));
        query.append_pair("state", state);
    }
    Ok(url.into())
}

/// 16 random bytes, hex encoded, for the OAuth `state` parameter.
pub fn random_state() -> Result<String, Box<dyn Error>> {
    let mut bytes = [0_u8; 16];
    getrandom::fill(&mut bytes).map_err(|e| format!("system RNG unavailable: {e}"))?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}
