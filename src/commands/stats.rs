use anyhow::{Context as _, Result};

use assignment::{AppStats, GroupStats, PlatformFilter, RemoteDirectory};

use crate::session;
use crate::{Context, ui};

pub fn run(ctx: &Context) -> Result<()> {
    let directory = session::open_directory(ctx, true)?;
    let groups = directory.list_groups().context("Failed to list groups")?;
    let apps = directory
        .list_apps(PlatformFilter::MacOs)
        .context("Failed to list apps")?;

    print_group_stats(&GroupStats::from_groups(&groups));
    print_app_stats(&AppStats::from_apps(&apps));
    Ok(())
}

fn print_group_stats(stats: &GroupStats) {
    ui::header("Groups");
    ui::kv("Total", &stats.total.to_string());
    ui::kv("Security", &stats.security.to_string());
    ui::kv("Mail-enabled", &stats.mail_enabled.to_string());
    ui::kv(
        "Dynamic / static",
        &format!("{} / {}", stats.dynamic, stats.static_groups),
    );

    ui::section("Membership");
    ui::kv("Total members", &stats.total_members.to_string());
    ui::kv("Average", &format!("{:.1}", stats.average_members));
    ui::kv(
        "Largest / smallest",
        &format!("{} / {}", stats.max_members, stats.min_members),
    );
}

fn print_app_stats(stats: &AppStats) {
    ui::header("macOS Apps");
    ui::kv("Total", &stats.total.to_string());
    if stats.total_size_bytes > 0 {
        ui::kv("Content size", &ui::format_size(stats.total_size_bytes));
    }

    if !stats.by_type.is_empty() {
        ui::section("By type");
        for (app_type, count) in &stats.by_type {
            ui::kv(app_type, &count.to_string());
        }
    }

    if !stats.top_publishers.is_empty() {
        ui::section("Top publishers");
        for (publisher, count) in &stats.top_publishers {
            ui::kv(publisher, &count.to_string());
        }
    }
}
