//! Authentication command handlers for OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `balance-sheet auth` - Initial OAuth consent flow
//! - `balance-sheet auth --verify` - Verify and refresh authentication

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;

/// Handles the `balance-sheet auth` command: runs the OAuth consent flow.
///
/// This is the ONLY command that opens a browser for OAuth authentication. It loads
/// `client_secret.json`, opens the consent page, and saves the tokens to `token.json`.
///
/// # Errors
/// Returns an error if OAuth flow fails or if client_secret.json is missing
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let _ = TokenProvider::initialize(config.client_secret_path(), config.token_path()).await?;
    Ok("Authorization complete".into())
}

/// Handles the `balance-sheet auth --verify` command.
///
/// This command NEVER opens a browser. It loads the saved tokens, checks their scopes, and
/// refreshes the access token. If the token is missing, invalid, or has the wrong scopes, it fails
/// with an error message telling the user to run `balance-sheet auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'balance-sheet auth' (without the --verify flag).",
        )?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")?;
    Ok("Your OAuth token is valid!".into())
}
