//! # Graph
//!
//! Microsoft Graph backed [`assignment::RemoteDirectory`] for Intune.
//!
//! - [`auth`]: sign-in flows producing a [`Session`] token provider
//! - [`client`]: [`GraphClient`], the directory implementation
//! - [`retry`]: backoff for throttled and transient reads
//!
//! ```no_run
//! use graph::{AuthConfig, AuthMethod, Authenticator, GraphClient};
//! # struct Terminal;
//! # impl graph::AuthPrompt for Terminal {
//! #     fn show_device_code(&self, info: &graph::DeviceCodeInfo) { println!("{}", info.user_code) }
//! #     fn browser_redirect(&self, _: &str) -> graph::Result<String> { Err(graph::Error::Other("no browser".into())) }
//! # }
//!
//! let config = AuthConfig { method: AuthMethod::DeviceCode, ..Default::default() };
//! let session = Authenticator::new(config).login(&Terminal)?;
//! let client = GraphClient::new(session);
//! # Ok::<(), graph::Error>(())
//! ```

pub mod auth;
pub mod client;
pub mod error;
mod models;
pub mod retry;

pub use auth::{
    AuthConfig, AuthMethod, AuthPrompt, Authenticator, ClientCredentials, DeviceCodeInfo,
    Session, StaticToken, TokenProvider,
};
pub use client::{GRAPH_BASE, GraphClient};
pub use error::{Error, ErrorCategory, Result};
pub use models::GraphUser;
pub use retry::RetryConfig;
