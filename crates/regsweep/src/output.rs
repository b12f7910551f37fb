//! Terminal output utilities

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use regsweep_core::RepositoryPlan;
use tabled::{settings::Style, Table, Tabled};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Create a spinner
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(spinner_style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[derive(Tabled)]
struct DecisionRow {
    action: String,
    digest: String,
    tags: String,
    #[tabled(rename = "age (days)")]
    age: String,
    reason: String,
}

/// Shorten "sha256:<64 hex>" to the algorithm plus 12 characters
pub fn short_digest(digest: &str) -> String {
    match digest.split_once(':') {
        Some((algo, hex)) if hex.len() > 12 => format!("{}:{}", algo, &hex[..12]),
        _ => digest.to_string(),
    }
}

/// Render the decisions of a plan as a table
pub fn decision_table(plan: &RepositoryPlan) -> String {
    let rows: Vec<DecisionRow> = plan
        .decisions
        .iter()
        .map(|d| DecisionRow {
            action: d.action.to_string(),
            digest: short_digest(&d.digest),
            tags: if d.tags.is_empty() {
                "<none>".to_string()
            } else {
                d.tags.join(", ")
            },
            age: d.age_days.map(|a| a.to_string()).unwrap_or_default(),
            reason: d.reason.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}
