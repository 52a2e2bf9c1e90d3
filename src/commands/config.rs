use anyhow::{Context as _, Result, bail};

use assignment::DedupKey;

use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::paths;
use crate::{Context, ui};

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { force } => init(ctx, force),
        ConfigCommand::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}

fn show(ctx: &Context) -> Result<()> {
    ui::header("Configuration");
    ui::kv("Config directory", &paths::config_dir()?.display().to_string());
    let state = if ctx.config_path.exists() {
        ""
    } else {
        " (not found, using defaults)"
    };
    ui::kv(
        "Config file",
        &format!("{}{state}", ctx.config_path.display()),
    );

    let config = &ctx.config;
    ui::section("auth");
    ui::kv("method", config.auth.method.as_str());
    let auth = config.auth_config();
    ui::kv("tenant_id", &auth.tenant_id);
    ui::kv("client_id", &auth.client_id);
    if let Some(path) = config.credentials_path() {
        ui::kv("credentials_file", &path.display().to_string());
    }

    ui::section("assign");
    ui::kv("intent", config.assign.intent.as_str());
    ui::kv("notify", &config.assign.notify.to_string());
    ui::kv("restart_required", &config.assign.restart_required.to_string());
    ui::kv("override_existing", &config.assign.override_existing.to_string());
    let dedup = match config.assign.dedup {
        DedupKey::Group => "group",
        DedupKey::GroupAndIntent => "group-and-intent",
    };
    ui::kv("dedup", dedup);
    ui::kv("jobs", &config.assign.jobs.to_string());
    ui::kv(
        "auth_failure_limit",
        &config.assign.auth_failure_limit.to_string(),
    );

    ui::section("graph");
    ui::kv(
        "base_url",
        config.graph.base_url.as_deref().unwrap_or(graph::GRAPH_BASE),
    );
    ui::kv("member_counts", &config.graph.member_counts.to_string());
    ui::kv("retry_attempts", &config.graph.retry_attempts.to_string());

    if ctx.verbose > 0 {
        println!();
        let raw = toml::to_string_pretty(config).context("Failed to serialize config")?;
        println!("{raw}");
    }
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(path)?;
    ui::success(&format!("Wrote {}", path.display()));
    Ok(())
}
