//! Token acquisition against the Microsoft identity platform.
//!
//! Three sign-in methods are supported:
//!
//! - **Device code**: the user enters a short code on another device
//! - **Browser**: authorization code flow through the local redirect URI;
//!   redirect failures fall back to device code
//! - **Client secret**: client credentials of a custom app registration
//!
//! Tokens live in memory only. Delegated sessions are renewed with their
//! refresh token; client credential sessions simply request a new token.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Microsoft Graph PowerShell public client, usable without an app registration
pub const PUBLIC_CLIENT_ID: &str = "14d82eec-204b-4c2f-b7e8-296a70dab67e";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const REDIRECT_URI: &str = "http://localhost:8400";
/// Overrides the secret stored in the credentials file
pub const CLIENT_SECRET_ENV: &str = "INTUNE_CLIENT_SECRET";

const APP_SCOPE: &str = "https://graph.microsoft.com/.default";
const DELEGATED_SCOPE: &str = "https://graph.microsoft.com/.default offline_access";
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Tokens are renewed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Source of bearer tokens for Graph requests
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token, renewing it if needed
    fn access_token(&self) -> Result<String>;
}

/// Fixed token, for tests and pre-acquired tokens
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// How to sign in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    DeviceCode,
    Browser,
    ClientSecret,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceCode => "device-code",
            Self::Browser => "browser",
            Self::ClientSecret => "client-secret",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "device-code" | "device" => Ok(Self::DeviceCode),
            "browser" | "interactive" => Ok(Self::Browser),
            "client-secret" | "custom" | "secret" => Ok(Self::ClientSecret),
            other => Err(Error::Other(format!(
                "unknown auth method '{other}' (expected device-code, browser or client-secret)"
            ))),
        }
    }
}

/// Sign-in settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub method: AuthMethod,
    pub tenant_id: String,
    /// Public client used by the delegated flows
    pub client_id: String,
    pub authority: String,
    /// Credentials file for [`AuthMethod::ClientSecret`]
    pub credentials_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthMethod::default(),
            tenant_id: DEFAULT_TENANT.to_string(),
            client_id: PUBLIC_CLIENT_ID.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            credentials_file: None,
        }
    }
}

impl AuthConfig {
    fn endpoint(&self, tenant: &str, path: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/{}",
            self.authority.trim_end_matches('/'),
            tenant,
            path
        )
    }
}

/// App registration credentials read from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    #[serde(alias = "tenantId")]
    pub tenant_id: String,
    #[serde(alias = "appId")]
    pub app_id: String,
    #[serde(rename = "clientSecret", alias = "client_secret", default)]
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    /// Load credentials, preferring the secret from [`CLIENT_SECRET_ENV`]
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_secret(path, std::env::var(CLIENT_SECRET_ENV).ok())
    }

    /// Load credentials, preferring `secret` over the file's secret
    pub fn load_with_secret(path: &Path, secret: Option<String>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut creds: Self = serde_json::from_str(&content).map_err(|e| Error::Credentials {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            creds.client_secret = Some(secret);
        }

        let invalid = |message: &str| Error::Credentials {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if creds.tenant_id.trim().is_empty() {
            return Err(invalid("tenant_id is empty"));
        }
        if creds.app_id.trim().is_empty() {
            return Err(invalid("app_id is empty"));
        }
        if creds.client_secret.as_deref().is_none_or(str::is_empty) {
            return Err(invalid(&format!(
                "no clientSecret in file and {CLIENT_SECRET_ENV} is not set"
            )));
        }
        Ok(creds)
    }
}

/// Device code issued by the identity platform
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeInfo {
    pub user_code: String,
    pub device_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Ready-made instructions for the user
    pub message: Option<String>,
}

fn default_interval() -> u64 {
    5
}

/// User interaction during sign-in
pub trait AuthPrompt {
    /// Show the device code and where to enter it
    fn show_device_code(&self, info: &DeviceCodeInfo);

    /// Show the authorize URL and return the URL the browser was redirected to
    fn browser_redirect(&self, authorize_url: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl TokenErrorResponse {
    fn into_error(self) -> Error {
        match self.error_description {
            Some(description) => Error::Auth(format!("{}: {}", self.error, description)),
            None => Error::Auth(self.error),
        }
    }
}

/// Next step while polling for a device code token
#[derive(Debug)]
enum PollStep {
    Pending,
    SlowDown,
    Fail(Error),
}

fn poll_step(response: TokenErrorResponse) -> PollStep {
    match response.error.as_str() {
        "authorization_pending" => PollStep::Pending,
        "slow_down" => PollStep::SlowDown,
        "expired_token" | "code_expired" => PollStep::Fail(Error::DeviceCodeExpired),
        "authorization_declined" | "access_denied" => PollStep::Fail(Error::Declined),
        _ => PollStep::Fail(response.into_error()),
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
    refresh_token: Option<String>,
}

impl CachedToken {
    fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: response.access_token,
            expires_at: Utc::now() + TimeDelta::seconds(response.expires_in),
            refresh_token: response.refresh_token.or(previous_refresh),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Clone)]
enum Grant {
    /// Delegated session renewed through its refresh token
    Delegated,
    /// App-only session from client credentials
    ClientCredentials { secret: String },
}

/// Signed-in session handing out access tokens
pub struct Session {
    agent: ureq::Agent,
    token_url: String,
    client_id: String,
    tenant_id: String,
    method: AuthMethod,
    grant: Grant,
    cache: Mutex<CachedToken>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("method", &self.method)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the session acts as the app rather than a user
    pub fn is_app_only(&self) -> bool {
        matches!(self.grant, Grant::ClientCredentials { .. })
    }

    fn cache(&self) -> MutexGuard<'_, CachedToken> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn renew(&self, current: &CachedToken) -> Result<CachedToken> {
        let response = match &self.grant {
            Grant::ClientCredentials { secret } => {
                log::debug!("Requesting new app token for {}", self.client_id);
                request_token(
                    &self.agent,
                    &self.token_url,
                    &[
                        ("grant_type", "client_credentials"),
                        ("client_id", &self.client_id),
                        ("client_secret", secret),
                        ("scope", APP_SCOPE),
                    ],
                )?
            }
            Grant::Delegated => {
                let refresh = current.refresh_token.as_deref().ok_or_else(|| {
                    Error::Auth("session expired and no refresh token is available".into())
                })?;
                log::debug!("Refreshing delegated access token");
                request_token(
                    &self.agent,
                    &self.token_url,
                    &[
                        ("grant_type", "refresh_token"),
                        ("client_id", &self.client_id),
                        ("refresh_token", refresh),
                        ("scope", DELEGATED_SCOPE),
                    ],
                )?
            }
        };
        Ok(CachedToken::from_response(
            response,
            current.refresh_token.clone(),
        ))
    }
}

impl TokenProvider for Session {
    fn access_token(&self) -> Result<String> {
        let mut cache = self.cache();
        if !cache.is_fresh(Utc::now()) {
            *cache = self.renew(&cache)?;
        }
        Ok(cache.access_token.clone())
    }
}

/// Runs the sign-in flows
pub struct Authenticator {
    agent: ureq::Agent,
    config: AuthConfig,
}

impl Authenticator {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            agent: crate::client::http_agent(),
            config,
        }
    }

    /// Sign in with the configured method
    pub fn login(&self, prompt: &dyn AuthPrompt) -> Result<Session> {
        let session = match self.config.method {
            AuthMethod::DeviceCode => self.device_code(prompt),
            AuthMethod::Browser => match self.browser(prompt) {
                Err(e) if e.is_redirect_failure() => {
                    log::info!("Browser sign-in failed ({e}), falling back to device code");
                    self.device_code(prompt)
                }
                other => other,
            },
            AuthMethod::ClientSecret => self.client_secret(),
        }?;
        log::info!("Authentication successful using {}", session.method);
        Ok(session)
    }

    /// Device code flow for the public client
    pub fn device_code(&self, prompt: &dyn AuthPrompt) -> Result<Session> {
        let tenant = &self.config.tenant_id;
        let mut response = self
            .agent
            .post(self.config.endpoint(tenant, "devicecode"))
            .send_form([
                ("client_id", self.config.client_id.as_str()),
                ("scope", DELEGATED_SCOPE),
            ])?;
        let status = response.status();
        let body = response.body_mut().read_to_string()?;
        if !status.is_success() {
            return Err(token_error(status.as_u16(), &body));
        }
        let info: DeviceCodeInfo = serde_json::from_str(&body)?;
        prompt.show_device_code(&info);

        let token_url = self.config.endpoint(tenant, "token");
        let deadline = Instant::now() + Duration::from_secs(info.expires_in);
        let mut interval = info.interval.max(1);

        loop {
            if Instant::now() >= deadline {
                return Err(Error::DeviceCodeExpired);
            }
            thread::sleep(Duration::from_secs(interval));

            let outcome = post_token(
                &self.agent,
                &token_url,
                &[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", &self.config.client_id),
                    ("device_code", &info.device_code),
                ],
            )?;
            match outcome {
                Ok(token) => {
                    return Ok(self.delegated_session(AuthMethod::DeviceCode, token));
                }
                Err(err) => match poll_step(err) {
                    PollStep::Pending => log::trace!("Waiting for device code sign-in"),
                    PollStep::SlowDown => interval += 5,
                    PollStep::Fail(e) => return Err(e),
                },
            }
        }
    }

    /// Authorization code flow through [`REDIRECT_URI`]
    pub fn browser(&self, prompt: &dyn AuthPrompt) -> Result<Session> {
        let state = new_state();
        let url = authorize_url(&self.config, &state);
        let redirected = prompt.browser_redirect(&url)?;
        let code = parse_redirect(&redirected, &state)?;

        let tenant = &self.config.tenant_id;
        let token = request_token(
            &self.agent,
            &self.config.endpoint(tenant, "token"),
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &self.config.client_id),
                ("code", &code),
                ("redirect_uri", REDIRECT_URI),
                ("scope", DELEGATED_SCOPE),
            ],
        )?;
        Ok(self.delegated_session(AuthMethod::Browser, token))
    }

    /// Client credentials flow for a custom app registration
    pub fn client_secret(&self) -> Result<Session> {
        let path = self.config.credentials_file.as_deref().ok_or_else(|| {
            Error::Other("client-secret sign-in needs auth.credentials_file".into())
        })?;
        let creds = ClientCredentials::load(path)?;
        let secret = creds.client_secret.unwrap_or_default();

        let token_url = self.config.endpoint(&creds.tenant_id, "token");
        let token = request_token(
            &self.agent,
            &token_url,
            &[
                ("grant_type", "client_credentials"),
                ("client_id", &creds.app_id),
                ("client_secret", &secret),
                ("scope", APP_SCOPE),
            ],
        )?;

        Ok(Session {
            agent: self.agent.clone(),
            token_url,
            client_id: creds.app_id,
            tenant_id: creds.tenant_id,
            method: AuthMethod::ClientSecret,
            grant: Grant::ClientCredentials { secret },
            cache: Mutex::new(CachedToken::from_response(token, None)),
        })
    }

    fn delegated_session(&self, method: AuthMethod, token: TokenResponse) -> Session {
        Session {
            agent: self.agent.clone(),
            token_url: self.config.endpoint(&self.config.tenant_id, "token"),
            client_id: self.config.client_id.clone(),
            tenant_id: self.config.tenant_id.clone(),
            method,
            grant: Grant::Delegated,
            cache: Mutex::new(CachedToken::from_response(token, None)),
        }
    }
}

/// POST a token request; identity platform errors come back as `Ok(Err(_))`
fn post_token(
    agent: &ureq::Agent,
    url: &str,
    form: &[(&str, &str)],
) -> Result<std::result::Result<TokenResponse, TokenErrorResponse>> {
    let mut response = agent.post(url).send_form(form.iter().copied())?;
    let status = response.status();
    let body = response.body_mut().read_to_string()?;

    if status.is_success() {
        return Ok(Ok(serde_json::from_str(&body)?));
    }
    match serde_json::from_str::<TokenErrorResponse>(&body) {
        Ok(err) => Ok(Err(err)),
        Err(_) => Err(token_error(status.as_u16(), &body)),
    }
}

fn request_token(agent: &ureq::Agent, url: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
    post_token(agent, url, form)?.map_err(TokenErrorResponse::into_error)
}

fn token_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => err.into_error(),
        Err(_) => Error::api(status, None, format!("token endpoint returned HTTP {status}")),
    }
}

fn new_state() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    format!("{:x}", nanos ^ (u64::from(std::process::id()) << 32))
}

/// URL the user opens to sign in with the browser flow
pub fn authorize_url(config: &AuthConfig, state: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}&state={}",
        config.endpoint(&config.tenant_id, "authorize"),
        encode_component(&config.client_id),
        encode_component(REDIRECT_URI),
        encode_component(DELEGATED_SCOPE),
        encode_component(state),
    )
}

/// Extract the authorization code from the URL the browser landed on
pub fn parse_redirect(url: &str, expected_state: &str) -> Result<String> {
    let query = url
        .split_once('?')
        .map(|(_, q)| q)
        .ok_or_else(|| Error::Redirect("URL has no query string".into()))?;
    let query = query.split('#').next().unwrap_or_default();

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_component(value);
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(TokenErrorResponse {
            error,
            error_description: description,
        }
        .into_error());
    }
    if state.as_deref() != Some(expected_state) {
        return Err(Error::Redirect("state does not match the sign-in request".into()));
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| Error::Redirect("no authorization code in redirect URL".into()))
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn decode_component(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(decoded) => {
                        out.push(decoded);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
