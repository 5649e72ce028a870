//! OAuth 2.0 installed-application flow for the Google Sheets API.
//!
//! `TokenProvider::initialize` runs the consent flow: it listens on a loopback port, opens the
//! browser to Google's consent page, waits for the redirect carrying the authorization code, and
//! exchanges that code for tokens. `TokenProvider::load` uses tokens saved by an earlier consent
//! flow and never opens a browser.

use crate::api::files::{SecretFile, TokenFile, REDIRECT};
use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::{bail, Context};
use chrono::Utc;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// How long to wait for the user to finish in the browser.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Google does not always report `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

const CALLBACK_PAGE: &str = "<html><body><h2>balance-sheet is authorized.</h2>\
    <p>You can close this window.</p></body></html>";

const FAILED_PAGE: &str = "<html><body><h2>balance-sheet was not authorized.</h2>\
    <p>See the terminal for details.</p></body></html>";

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the OAuth client credentials and the current tokens, and keeps `token.json` up to date
/// when the access token is refreshed.
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: TokenFile,
    token_path: PathBuf,
}

impl TokenProvider {
    /// Runs the interactive consent flow and saves the resulting tokens to `token_path`.
    pub(crate) async fn initialize(
        secret_path: impl AsRef<Path>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let secret_path = secret_path.as_ref();
        let token_path = token_path.into();
        info!("Loading OAuth credentials from {}", secret_path.display());
        let secret = SecretFile::load(secret_path).await.context(
            "The OAuth client secret file is required. Download it from the Google Cloud \
            Console and run 'balance-sheet init' again.",
        )?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context("Unable to start the local OAuth callback listener")?;
        let port = listener
            .local_addr()
            .context("Unable to determine the OAuth callback port")?
            .port();
        let redirect = format!("{REDIRECT}:{port}");
        debug!("Using redirect URI: {redirect}");

        let client = google_client(&secret)?.set_redirect_uri(
            RedirectUrl::new(redirect).context("Unable to build the OAuth redirect URL")?,
        );
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        info!("Opening browser for authorization...");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("Unable to open the browser: {e}");
        }
        info!("If the browser doesn't open automatically, visit this URL:\n\n{auth_url}\n");

        let (code, state) = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_callback(&listener))
            .await
            .context("Timed out waiting for the OAuth consent to complete")??;
        if state != *csrf.secret() {
            bail!("The OAuth callback state did not match, refusing the authorization code");
        }

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client()?)
            .await
            .context("Failed to exchange the authorization code for tokens")?;

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .context("Google did not return a refresh token")?;
        let token = TokenFile::new(
            granted_scopes(&response),
            response.access_token().secret().to_string(),
            refresh_token,
            expires_at(&response),
        );
        token.save(&token_path).await?;
        info!("Authorization successful, tokens saved to {}", token_path.display());

        Ok(Self {
            secret,
            token,
            token_path,
        })
    }

    /// Loads previously saved tokens. This never opens a browser.
    pub(crate) async fn load(
        secret_path: impl AsRef<Path>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let token_path = token_path.into();
        let secret = SecretFile::load(secret_path.as_ref()).await?;
        let token = TokenFile::load(&token_path).await.with_context(|| {
            format!(
                "Unable to load the OAuth token at {}, run 'balance-sheet auth'",
                token_path.display()
            )
        })?;
        Ok(Self {
            secret,
            token,
            token_path,
        })
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        let client = google_client(&self.secret)?;
        let refresh_token = RefreshToken::new(self.token.refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http_client()?)
            .await
            .context("Failed to refresh the OAuth access token")?;

        self.token.update(
            response.access_token().secret().to_string(),
            expires_at(&response),
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save(&self.token_path).await?;
        debug!("Token valid until: {}", self.token.expires_at());
        Ok(())
    }

    /// Returns the access token, refreshing it first if it is expired or about to expire.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.is_expired() {
            debug!("The access token has expired, refreshing");
            self.refresh().await?;
        }
        Ok(self.token.access_token())
    }
}

fn google_client(secret: &SecretFile) -> Result<GoogleClient> {
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(
            TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
        ))
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the HTTP client")
}

fn expires_at(response: &BasicTokenResponse) -> chrono::DateTime<Utc> {
    let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
    Utc::now() + chrono::Duration::seconds(lifetime.as_secs() as i64)
}

/// Google omits `scope` when it granted exactly what was requested.
fn granted_scopes(response: &BasicTokenResponse) -> Vec<String> {
    match response.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

type Callback = Result<(String, String)>;

/// Serves the loopback redirect until a request carries the authorization code, and returns the
/// `(code, state)` pair. A redirect carrying `error` ends the wait with that error.
async fn wait_for_callback(listener: &TcpListener) -> Result<(String, String)> {
    let (tx, mut rx) = mpsc::channel::<Callback>(1);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Failed to accept the OAuth callback connection")?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |request: Request<Incoming>| {
                        let response = answer_callback(request.uri(), &tx);
                        async move { Ok::<_, Infallible>(response) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .keep_alive(false)
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("OAuth callback connection failed: {e}");
                    }
                });
            }
            Some(callback) = rx.recv() => return callback,
        }
    }
}

fn answer_callback(uri: &Uri, tx: &mpsc::Sender<Callback>) -> Response<String> {
    let (status, body) = match parse_callback(uri) {
        Ok(Some(pair)) => {
            let _ = tx.try_send(Ok(pair));
            (StatusCode::OK, CALLBACK_PAGE.to_string())
        }
        // Browsers also ask for things like /favicon.ico
        Ok(None) => (StatusCode::NOT_FOUND, String::new()),
        Err(e) => {
            let _ = tx.try_send(Err(e));
            (StatusCode::BAD_REQUEST, FAILED_PAGE.to_string())
        }
    };
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

/// Reads `code` and `state` from the redirect's query. Returns `None` for requests that are not
/// the OAuth redirect.
fn parse_callback(uri: &Uri) -> Result<Option<(String, String)>> {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = Url::parse(&format!("{REDIRECT}{target}"))
        .context("Unable to parse the OAuth callback URL")?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => bail!("Google refused the authorization: {value}"),
            _ => {}
        }
    }
    match (code, state) {
        (Some(code), Some(state)) => Ok(Some((code, state))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn uri(target: &'static str) -> Uri {
        Uri::from_static(target)
    }

    /// Sends one raw HTTP/1.1 request to the listener and returns the whole response.
    async fn send(port: u16, target: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        let request = format!("GET {target} HTTP/1.1\r\nhost: localhost\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_parse_callback() {
        let target = uri("/?state=abc%3D&code=4%2F0Ab&scope=x");
        let (code, state) = parse_callback(&target).unwrap().unwrap();
        assert_eq!("4/0Ab", code);
        assert_eq!("abc=", state);
    }

    #[test]
    fn test_parse_callback_other_request() {
        assert!(parse_callback(&uri("/favicon.ico")).unwrap().is_none());
        assert!(parse_callback(&uri("/?code=only")).unwrap().is_none());
    }

    #[test]
    fn test_parse_callback_denied() {
        let err = parse_callback(&uri("/?error=access_denied")).unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_answer_callback_statuses() {
        let (tx, mut rx) = mpsc::channel(1);
        let response = answer_callback(&uri("/favicon.ico"), &tx);
        assert_eq!(StatusCode::NOT_FOUND, response.status());
        assert!(rx.try_recv().is_err());

        let response = answer_callback(&uri("/?code=c&state=s"), &tx);
        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(CALLBACK_PAGE, response.body());
        assert_eq!(
            ("c".to_string(), "s".to_string()),
            rx.try_recv().unwrap().unwrap()
        );
    }

    #[tokio::test]
    async fn test_wait_for_callback() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = tokio::spawn(async move {
            let favicon = send(port, "/favicon.ico").await;
            let redirect = send(port, "/?code=c0de&state=s7").await;
            (favicon, redirect)
        });
        let (code, state) = wait_for_callback(&listener).await.unwrap();
        assert_eq!(("c0de", "s7"), (code.as_str(), state.as_str()));
        let (favicon, redirect) = client.await.unwrap();
        assert!(favicon.starts_with("HTTP/1.1 404 Not Found"), "{favicon}");
        assert!(redirect.starts_with("HTTP/1.1 200 OK"), "{redirect}");
        assert!(redirect.ends_with(CALLBACK_PAGE));
    }

    #[tokio::test]
    async fn test_wait_for_callback_denied() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = tokio::spawn(async move { send(port, "/?error=access_denied").await });
        let err = wait_for_callback(&listener).await.unwrap_err();
        assert!(err.to_string().contains("access_denied"));
        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "{response}");
    }
}
