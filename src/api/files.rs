//! Serialization and deserialization structures for Google OAuth credential files.
//! - `client_secret.json`: OAuth 2.0 client credentials from Google Cloud Console
//! - `token.json`: the access and refresh tokens we receive after the consent flow

use crate::api::OAUTH_SCOPES;
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// This redirect needs to be present in the OAuth credential file, or else OAuth will not work.
pub(super) const REDIRECT: &str = "http://localhost";

/// Represents the structure of the `client_secret.json` file downloaded from Google Cloud Console.
///
/// This file contains OAuth 2.0 Desktop Application credentials. The standard format from Google
/// has an "installed" wrapper around the actual credentials.
///
/// Example:
/// ```json
/// {
///   "installed": {
///     "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
///     "client_secret": "YOUR_CLIENT_SECRET",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub(super) struct SecretFile {
    installed: InstalledCredentials,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    /// Must contain "http://localhost" (without a port number)
    #[serde(deserialize_with = "deserialize_redirects")]
    #[allow(dead_code)]
    redirect_uris: Vec<String>,
    auth_uri: String,
    token_uri: String,
}

impl SecretFile {
    /// Loads the OAuth client credentials from `client_secret.json`.
    pub(super) async fn load(path: &Path) -> Result<SecretFile> {
        utils::deserialize(path).await.with_context(|| {
            format!(
                "Unable to read the OAuth client secret file at {}",
                path.display()
            )
        })
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

fn deserialize_redirects<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let uris = Vec::<String>::deserialize(deserializer)?;
    if !uris.iter().any(|s| is_valid_redirect(s)) {
        return Err(D::Error::custom(format!(
            "At least one of the redirects needs to be {REDIRECT}, but this was not found. \
            When creating the OAuth client for your Google Cloud project, you must include \
            '{REDIRECT}'"
        )));
    }
    Ok(uris)
}

fn is_valid_redirect(s: &str) -> bool {
    s == REDIRECT || s == "http://127.0.0.1"
}

/// This is how we save the token information that we receive from Google OAuth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    pub(super) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Loads the token file and checks that it was granted the scopes we need.
    pub(super) async fn load(p: impl AsRef<Path>) -> Result<Self> {
        let token_file: Self = utils::deserialize(p.as_ref())
            .await
            .context("Unable to deserialize the token JSON file")?;
        token_file.validate_scopes()?;
        Ok(token_file)
    }

    /// Writes the token file, readable only by the owner on Unix.
    pub(super) async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize the token")?;
        utils::write(path, json).await?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    fn validate_scopes(&self) -> Result<()> {
        let found_scopes: HashSet<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        for &required_scope in OAUTH_SCOPES {
            if !found_scopes.contains(required_scope) {
                bail!("OAuth scope '{required_scope}' is missing.");
            }
        }
        Ok(())
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is expired or will expire soon (within 5 minutes)
    pub(super) fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + chrono::Duration::minutes(5)
    }

    /// Google only sometimes rotates the refresh token.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = expires_at;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn secret_json(redirects: &str) -> String {
        format!(
            r#"
{{
    "installed": {{
        "client_id": "YOUR_CLIENT_ID.apps.googleusercontent.com",
        "client_secret": "YOUR_CLIENT_SECRET",
        "redirect_uris": {redirects},
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token"
    }}
}}
"#
        )
    }

    #[tokio::test]
    async fn test_client_secret_good_redirect() {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("file.json");
        let json = secret_json(r#"["http://localhost", "https://example.com:4040/whatever"]"#);
        utils::write(&p, json).await.unwrap();
        let secret_file = SecretFile::load(&p).await.unwrap();
        assert_eq!(
            "YOUR_CLIENT_ID.apps.googleusercontent.com",
            secret_file.client_id()
        );
        assert_eq!("https://oauth2.googleapis.com/token", secret_file.token_uri());
    }

    #[tokio::test]
    async fn test_client_secret_loopback_redirect() {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("file.json");
        utils::write(&p, secret_json(r#"["http://127.0.0.1"]"#))
            .await
            .unwrap();
        assert!(SecretFile::load(&p).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_secret_bad_redirect() {
        let temp_dir = TempDir::new().unwrap();
        let p = temp_dir.path().join("file.json");
        let json = secret_json(r#"["http://localhost:9900", "https://example.com:4040/whatever"]"#);
        utils::write(&p, json).await.unwrap();
        let parse_error = SecretFile::load(&p).await.unwrap_err();
        let parse_error_message = format!("{parse_error:?}");
        assert!(
            parse_error_message.contains("At least one of the redirects needs to be http://localhost")
        );
    }

    #[tokio::test]
    async fn test_token_file_missing_scope() {
        let json = r##"
        {
            "scopes": ["https://www.googleapis.com/auth/drive.readonly"],
            "access_token":"abc12",
            "refresh_token":"xyz89",
            "expires_at":"2025-01-01T00:00:00Z"
        }
    "##;
        let tmp = TempDir::new().unwrap();
        let json_path = tmp.path().join("file.json");
        utils::write(&json_path, json).await.unwrap();

        let error_message = TokenFile::load(&json_path).await.unwrap_err().to_string();
        assert!(error_message.contains(OAUTH_SCOPES[0]));
    }

    #[tokio::test]
    async fn test_token_file_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let json_path = tmp.path().join("token.json");
        let token = TokenFile::new(
            OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            "abc12".to_string(),
            "xyz89".to_string(),
            Utc::now() + chrono::Duration::hours(1),
        );
        token.save(&json_path).await.unwrap();
        let loaded = TokenFile::load(&json_path).await.unwrap();
        assert_eq!(token, loaded);
        assert!(!loaded.is_expired());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&json_path).unwrap().permissions().mode();
            assert_eq!(0o600, mode & 0o777);
        }
    }

    #[test]
    fn test_token_file_expiry_and_update() {
        let mut token = TokenFile::new(
            vec![],
            "old".to_string(),
            "refresh".to_string(),
            Utc::now() + chrono::Duration::minutes(2),
        );
        assert!(token.is_expired());

        let later = Utc::now() + chrono::Duration::hours(1);
        token.update("new".to_string(), later, None);
        assert_eq!("new", token.access_token());
        assert_eq!("refresh", token.refresh_token());
        assert_eq!(later, token.expires_at());
        assert!(!token.is_expired());

        token.update("newer".to_string(), later, Some("rotated".to_string()));
        assert_eq!("rotated", token.refresh_token());
    }
}
