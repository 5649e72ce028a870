use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its subdirectories and:
/// - Creates an initial `config.json` file using `sheet_url` along with default settings
/// - Moves `secret_file` into its default location in the home directory.
///
/// # Errors
/// - Returns an error if any file operations fail or the URL is not a Google Sheets URL.
pub async fn init(home: &Path, secret_file: &Path, url: &str) -> Result<Out<()>> {
    let config = Config::create(home, secret_file, url)
        .await
        .context("Unable to create the home directory and configs")?;
    Ok(format!(
        "Successfully created {}. Next, run 'balance-sheet auth'",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("download.json");
        utils::write(&secret, "{}").await.unwrap();
        let home = dir.path().join("home");
        let out = init(
            &home,
            &secret,
            "https://docs.google.com/spreadsheets/d/abc123/edit",
        )
        .await
        .unwrap();
        assert!(out.message().contains("Successfully created"));
        assert!(out.structure().is_none());
        assert!(home.join("config.json").is_file());

        // The secret has been moved, so a second init fails
        assert!(init(&home, &secret, "https://docs.google.com/spreadsheets/d/abc123")
            .await
            .is_err());
    }
}
