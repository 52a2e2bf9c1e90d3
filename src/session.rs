//! Sign-in and directory selection for commands.

use anyhow::{Context as _, Result};
use colored::Colorize;
use dialoguer::Input;

use assignment::{InMemoryDirectory, RemoteDirectory};
use graph::{AuthConfig, AuthPrompt, Authenticator, DeviceCodeInfo, GraphClient, Session};

use crate::{Context, ui};

/// Prompts on the controlling terminal
struct TerminalPrompt;

impl AuthPrompt for TerminalPrompt {
    fn show_device_code(&self, info: &DeviceCodeInfo) {
        println!();
        match &info.message {
            Some(message) => ui::info(message),
            None => ui::info(&format!(
                "To sign in, open {} and enter the code {}",
                info.verification_uri.underline(),
                info.user_code.bold()
            )),
        }
        ui::dim(&format!(
            "Waiting for sign-in (code expires in {} minutes)...",
            info.expires_in / 60
        ));
    }

    fn browser_redirect(&self, authorize_url: &str) -> graph::Result<String> {
        println!();
        ui::info("Open this URL in your browser and sign in:");
        println!("  {}", authorize_url.underline());
        open_browser(authorize_url);
        ui::dim("After signing in the browser shows an error page on localhost.");
        ui::dim("Copy the full address from the address bar.");

        let redirect: String = Input::new()
            .with_prompt("Redirected URL")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| graph::Error::Redirect(e.to_string()))?;

        if redirect.trim().is_empty() {
            return Err(graph::Error::Redirect("no redirect URL entered".into()));
        }
        Ok(redirect.trim().to_string())
    }
}

/// Best effort; the URL is printed either way
fn open_browser(url: &str) {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    };
    if let Err(e) = std::process::Command::new(opener).arg(url).spawn() {
        log::debug!("Could not launch {opener}: {e}");
    }
}

/// Sign in with the given settings, printing advice on failure
pub fn sign_in(auth: AuthConfig) -> Result<Session> {
    let method = auth.method;
    Authenticator::new(auth)
        .login(&TerminalPrompt)
        .inspect_err(|e| ui::dim(e.category().advice()))
        .with_context(|| format!("Sign-in with {method} failed"))
}

/// Graph client for a signed-in session, configured from the config file
pub fn graph_client(ctx: &Context, session: Session, member_counts: bool) -> GraphClient {
    let mut client = GraphClient::new(session)
        .with_retry(ctx.config.retry_config())
        .with_member_counts(member_counts && ctx.config.graph.member_counts);
    if let Some(base) = &ctx.config.graph.base_url {
        client = client.with_base_url(base.as_str());
    }
    client
}

/// The directory commands operate on: Graph, or demo data with `--demo`.
///
/// `member_counts` is for commands that display group sizes; counting costs
/// one request per group.
pub fn open_directory(ctx: &Context, member_counts: bool) -> Result<Box<dyn RemoteDirectory>> {
    if ctx.demo {
        if !ctx.quiet {
            ui::warn("Using demo data; nothing is sent to Intune");
        }
        return Ok(Box::new(InMemoryDirectory::demo()));
    }

    let session = sign_in(ctx.config.auth_config())?;
    Ok(Box::new(graph_client(ctx, session, member_counts)))
}
