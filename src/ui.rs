use colored::{ColoredString, Colorize};
use declarative::{
    Action, AttributeChange, AttributeValue, Diagnostics, DiffSummary, ExecuteSummary,
    ExecutionPlan, PlannedChange, Severity,
};
use std::fmt::Write;

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
// Diagnostics
// ============================================================================

/// Render diagnostics, one block each
pub fn render_diagnostics(diags: &Diagnostics) -> String {
    let mut out = String::new();
    for diag in diags.iter() {
        let label = match diag.severity {
            Severity::Error => format!("{} {}", "✗".red(), "Error:".red().bold()),
            Severity::Warning => format!("{} {}", "⚠".yellow(), "Warning:".yellow().bold()),
        };
        let _ = writeln!(out, "{label} {}", diag.summary.bold());
        if let Some(attribute) = &diag.attribute {
            let _ = writeln!(out, "  {} {attribute}", "with attribute".dimmed());
        }
        for line in diag.detail.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}

/// Print diagnostics to stderr
pub fn diagnostics(diags: &Diagnostics) {
    eprint!("{}", render_diagnostics(diags));
}

// ============================================================================
// Plan Rendering
// ============================================================================

fn paint(text: &str, action: Action) -> ColoredString {
    match action {
        Action::Create => text.green(),
        Action::Update => text.yellow(),
        Action::Replace => text.magenta(),
        Action::Delete => text.red(),
        Action::NoOp => text.normal(),
    }
}

fn attribute_action(change: &AttributeChange) -> Action {
    match (&change.before, &change.after) {
        (AttributeValue::Absent, _) => Action::Create,
        (_, AttributeValue::Absent) => Action::Delete,
        _ => Action::Update,
    }
}

fn display_value(value: &AttributeValue, sensitive: bool) -> String {
    match value {
        AttributeValue::Known(_) if sensitive => "(sensitive value)".to_string(),
        other => other.to_string(),
    }
}

fn render_attribute(out: &mut String, change: &AttributeChange, width: usize) {
    let action = attribute_action(change);
    let symbol = paint(action.symbol(), action);
    let marker = if change.forces_replacement {
        format!(" {}", "# forces replacement".red())
    } else {
        String::new()
    };

    let before = change.before.as_multiline();
    let after = change.after.as_multiline();
    if !change.sensitive && (before.is_some() || after.is_some()) {
        let _ = writeln!(out, "      {symbol} {}:{marker}", change.name);
        render_text_diff(out, before.unwrap_or_default(), after.unwrap_or_default());
        return;
    }

    let value = match action {
        Action::Create => display_value(&change.after, change.sensitive),
        Action::Delete => format!(
            "{} {}",
            display_value(&change.before, change.sensitive),
            "-> null".dimmed()
        ),
        _ => format!(
            "{} -> {}",
            display_value(&change.before, change.sensitive),
            display_value(&change.after, change.sensitive)
        ),
    };
    let _ = writeln!(
        out,
        "      {symbol} {:<width$} = {value}{marker}",
        change.name
    );
}

/// Line diff for multi-line attribute values
fn render_text_diff(out: &mut String, before: &str, after: &str) {
    let diff = similar::TextDiff::from_lines(before, after);
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        match change.tag() {
            similar::ChangeTag::Delete => {
                let _ = writeln!(out, "          {}", format!("- {line}").red());
            }
            similar::ChangeTag::Insert => {
                let _ = writeln!(out, "          {}", format!("+ {line}").green());
            }
            similar::ChangeTag::Equal => {
                let _ = writeln!(out, "          {}", format!("  {line}").dimmed());
            }
        }
    }
}

/// Render one planned change with its attribute diff
pub fn render_change(change: &PlannedChange) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {} {} {}",
        paint(change.action.symbol(), change.action).bold(),
        change.address.to_string().bold(),
        change.action.describe()
    );

    let width = change
        .attributes
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or_default();
    for attribute in &change.attributes {
        render_attribute(&mut out, attribute, width);
    }
    out
}

/// Render the closing plan line
pub fn render_plan_summary(summary: &DiffSummary) -> String {
    if summary.has_changes() {
        format!(
            "{} {} to add, {} to change, {} to destroy.",
            "Plan:".bold(),
            summary.add.to_string().green(),
            summary.change.to_string().yellow(),
            summary.destroy.to_string().red()
        )
    } else {
        "No changes. Your model gardens match the configuration.".to_string()
    }
}

/// Print every pending change and the plan summary
pub fn plan(plan: &ExecutionPlan) {
    for change in plan.pending() {
        println!();
        print!("{}", render_change(change));
    }
    println!();
    println!("{}", render_plan_summary(&plan.summary()));
}

// ============================================================================
// Execution Summary
// ============================================================================

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Apply complete!", "✓".green().bold());
    } else {
        println!("  {} Apply finished with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} updated", summary.updated);
    }
    if summary.replaced > 0 {
        println!("    • {} replaced", summary.replaced);
    }
    if summary.deleted > 0 {
        println!("    • {} destroyed", summary.deleted);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

// ============================================================================
// Tests
// ============================================================================
