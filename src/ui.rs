use assignment::{
    Application, BatchResult, ExistingAssignment, Group, GroupKind, Intent, Plan, PreviewSummary,
};
use colored::{ColoredString, Colorize};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Size Formatting
// ============================================================================

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Truncate text for display, keeping the start
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        let kept: String = text.chars().take(max_chars - 1).collect();
        format!("{kept}…")
    }
}

// ============================================================================
// Directory Objects
// ============================================================================

pub fn intent_label(intent: Intent) -> ColoredString {
    match intent {
        Intent::Required => intent.as_str().green(),
        Intent::Available => intent.as_str().blue(),
        Intent::Uninstall => intent.as_str().red(),
    }
}

fn kind_label(kind: GroupKind) -> ColoredString {
    match kind {
        GroupKind::Security => kind.as_str().cyan(),
        GroupKind::Dynamic => kind.as_str().magenta(),
        GroupKind::MailEnabled => kind.as_str().yellow(),
    }
}

/// One-line summary of a group
pub fn group_line(group: &Group) -> String {
    format!(
        "{}  {} · {} members",
        truncate(&group.display_name, 40).bold(),
        kind_label(group.kind),
        group.member_count
    )
}

/// One-line summary of an app
pub fn app_line(app: &Application) -> String {
    let mut line = format!(
        "{} {}",
        app.app_type.icon(),
        truncate(&app.display_name, 40).bold()
    );
    if let Some(version) = &app.version {
        line.push_str(&format!(" {}", version.dimmed()));
    }
    line.push_str(&format!(
        "  {} · {}",
        app.publisher.as_deref().unwrap_or("Unknown"),
        app.app_type.as_str().dimmed()
    ));
    line
}

pub fn print_group(group: &Group) {
    println!("  {}", group_line(group));
    println!("    {}", group.id.dimmed());
    if let Some(description) = &group.description {
        println!("    {}", truncate(description, 72).dimmed());
    }
}

pub fn print_app(app: &Application) {
    println!("  {}", app_line(app));
    let mut details = app.id.clone();
    if app.size_bytes > 0 {
        details.push_str(&format!(" · {}", format_size(app.size_bytes)));
    }
    if let Some(modified) = app.last_modified {
        details.push_str(&format!(" · modified {}", modified.format("%Y-%m-%d")));
    }
    println!("    {}", details.dimmed());
}

/// Target and intent of an existing assignment; exclusions are marked instead of the intent
pub fn existing_line(assignment: &ExistingAssignment, group_name: Option<&str>) -> String {
    let target = match (&assignment.group_id, group_name) {
        (Some(_), Some(name)) => name.to_string(),
        (Some(id), None) => id.clone(),
        (None, _) => "(all devices or users)".to_string(),
    };
    let status = if assignment.target.is_exclusion() {
        "excluded".red()
    } else {
        assignment
            .intent
            .map_or_else(|| "unknown".dimmed(), intent_label)
    };
    format!("{} {}  {}", "•".dimmed(), target.bold(), status)
}

pub fn print_existing(assignment: &ExistingAssignment, group_name: Option<&str>) {
    println!("  {}", existing_line(assignment, group_name));
    println!("    {}", assignment.id.dimmed());
}

// ============================================================================
// Preview and Results
// ============================================================================

const PREVIEW_NAMES: usize = 10;

fn print_names(label: &str, names: &[String]) {
    println!("  {} ({}):", label.dimmed(), names.len());
    for name in names.iter().take(PREVIEW_NAMES) {
        println!("    • {name}");
    }
    if names.len() > PREVIEW_NAMES {
        println!(
            "    {}",
            format!("… and {} more", names.len() - PREVIEW_NAMES).dimmed()
        );
    }
}

pub fn print_preview(summary: &PreviewSummary) {
    header("Assignment Preview");
    kv("Assignments", &summary.total_pairs.to_string());
    kv("Intent", &intent_label(summary.intent).to_string());
    print_names("Groups", &summary.group_names);
    print_names("Apps", &summary.app_names);
}

/// Planned work after deduplication
pub fn print_plan(plan: &Plan) {
    println!();
    kv("To create", &plan.len().to_string());
    if !plan.already_satisfied().is_empty() {
        kv(
            "Already assigned (skipped)",
            &plan.already_satisfied().len().to_string(),
        );
    }
}

/// Print final summary
pub fn print_summary(result: &BatchResult) {
    println!();
    if result.is_success() {
        println!(
            "  {} {} of {} assignments created",
            "✓".green().bold(),
            result.success,
            result.total
        );
        return;
    }

    println!("  {} Assignments applied with errors", "⚠".yellow().bold());
    println!("    • {} succeeded", result.success);
    println!("    • {} {}", result.failure, "failed".red());
    let skipped = result.total - result.attempted();
    if skipped > 0 {
        println!("    • {skipped} not attempted");
    }

    section("Failures");
    for failure in &result.failures {
        println!(
            "  {} {} → {}: {}",
            "✗".red(),
            failure.app_id,
            failure.group_id,
            failure.message
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024 * 100), "100.0 MB");
        assert_eq!(
            format_size(1024 * 1024 * 1024 * 2 + 1024 * 1024 * 512),
            "2.5 GB"
        );
        assert_eq!(format_size(1024u64 * 1024 * 1024 * 1024), "1.00 TB");
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("Slack", 10), "Slack");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("Microsoft Defender", 10), "Microsoft…");
        assert_eq!(truncate("Microsoft Defender", 10).chars().count(), 10);
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("Équipe Département", 7), "Équipe…");
        assert_eq!(truncate("abc", 1), "…");
    }

    #[test]
    fn test_app_line_includes_publisher() {
        colored::control::set_override(false);
        let app = Application {
            id: "a1".into(),
            display_name: "Slack".into(),
            publisher: None,
            version: Some("4.38".into()),
            app_type: assignment::AppType::MacOsDmg,
            size_bytes: 0,
            created: None,
            last_modified: None,
        };
        let line = app_line(&app);
        assert!(line.contains("Slack 4.38"));
        assert!(line.contains("Unknown"));
        assert!(line.contains("macOSDmgApp"));
    }

    #[test]
    fn test_existing_line_marks_exclusion() {
        colored::control::set_override(false);
        let mut existing = ExistingAssignment {
            id: "x3".into(),
            app_id: "a1".into(),
            group_id: Some("g2".into()),
            target: assignment::TargetKind::Exclude,
            intent: Some(Intent::Required),
            settings: None,
        };

        let line = existing_line(&existing, Some("Contractors"));
        assert!(line.contains("Contractors"));
        assert!(line.contains("excluded"));
        assert!(!line.contains("required"));

        existing.target = assignment::TargetKind::Include;
        let line = existing_line(&existing, None);
        assert!(line.contains("g2"));
        assert!(!line.contains("excluded"));
    }
}
