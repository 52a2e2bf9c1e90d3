use anyhow::{Context as _, Result};

use graph::AuthMethod;

use crate::session;
use crate::{Context, ui};

pub fn run(ctx: &Context, method: Option<AuthMethod>) -> Result<()> {
    if ctx.demo {
        ui::success("Demo mode needs no sign-in");
        return Ok(());
    }

    let mut auth = ctx.config.auth_config();
    if let Some(method) = method {
        auth.method = method;
    }

    ui::header("Sign in to Microsoft Intune");
    ui::kv("Method", auth.method.as_str());
    ui::kv("Tenant", &auth.tenant_id);

    let session = session::sign_in(auth)?;
    let method = session.method();
    let tenant = session.tenant_id().to_string();
    let client_id = session.client_id().to_string();
    let app_only = session.is_app_only();

    println!();
    ui::success(&format!("Signed in using {method}"));

    if app_only {
        ui::kv("Tenant", &tenant);
        ui::kv("Application", &client_id);
        return Ok(());
    }

    let client = session::graph_client(ctx, session, false);
    let user = client.me().context("Could not read the signed-in user")?;
    ui::kv(
        "User",
        user.display_name.as_deref().unwrap_or(user.id.as_str()),
    );
    if let Some(upn) = user.user_principal_name.as_deref().or(user.mail.as_deref()) {
        ui::kv("Account", upn);
    }
    ui::dim("Tokens are kept in memory only; each command signs in again.");
    Ok(())
}
