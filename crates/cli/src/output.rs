//! Output formatting for CLI responses

use anyhow::Error;
use ckbpkg_exchange::prelude::*;
use colored::*;
use serde_json::{Value, json};

use crate::error::CliError;

fn print_json(value: &Value, what: &str) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format {} as JSON: {}", what, e),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    print_json(&error_json, "error");
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print success message
pub fn print_success(message: &str, json: bool) {
    if json {
        print_json(&json!({ "success": true, "message": message }), "success message");
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

/// Print warning message
pub fn print_warning(message: &str, json: bool) {
    if json {
        print_json(&json!({ "success": true, "warning": message }), "warning");
    } else {
        println!("{} {}", "⚠".yellow(), message);
    }
}

/// Print the profile list, marking the current profile
pub fn print_profile_list(collection: &ProfileCollection, json: bool) {
    let current = collection.current_id();
    if json {
        let profiles: Vec<Value> = collection
            .profiles()
            .iter()
            .map(|p| {
                json!({
                    "id": p.id(),
                    "name": p.name(),
                    "current": p.id() == current,
                    "fields": p.fields().len(),
                })
            })
            .collect();
        print_json(&json!({ "success": true, "profiles": profiles }), "profile list");
        return;
    }

    println!("{}", "Profiles:".bold());
    for profile in collection.profiles() {
        let marker = if profile.id() == current {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!(
            "  {} {} {}",
            marker,
            profile.name().bold(),
            profile.id().to_string().dimmed()
        );
    }
}

fn rejected_json(rejected: &[RejectedCandidate]) -> Vec<Value> {
    rejected
        .iter()
        .map(|r| json!({ "member": r.member, "reason": r.reason.to_string() }))
        .collect()
}

fn print_rejected_human(rejected: &[RejectedCandidate]) {
    for r in rejected {
        println!("  {} {} ({})", "✗".red(), r.member, r.reason.to_string().dimmed());
    }
}

pub fn print_export_report(report: &ExportReport, json: bool) {
    if json {
        print_json(
            &json!({
                "success": true,
                "archive": report.archive_path,
                "exported": report.exported,
            }),
            "export report",
        );
        return;
    }

    println!(
        "{} Exported {} profile(s) to {}",
        "✓".green(),
        report.exported.len(),
        report.archive_path.display().to_string().bold()
    );
    for profile in &report.exported {
        println!("  {} {} {}", "●".green(), profile.name, profile.base_name.dimmed());
    }
}

pub fn print_inspect_report(report: &InspectReport, json: bool) {
    if json {
        print_json(
            &json!({
                "success": true,
                "archive": report.archive_path,
                "profiles": report.profiles,
                "rejected": rejected_json(&report.rejected),
            }),
            "inspect report",
        );
        return;
    }

    println!(
        "{} {}",
        "Archive:".bold(),
        report.archive_path.display()
    );
    if report.profiles.is_empty() {
        println!("{}", "  No valid profiles".yellow());
    }
    for profile in &report.profiles {
        println!(
            "  {} {} {}",
            "●".green(),
            profile.name.bold(),
            profile.id.to_string().dimmed()
        );
    }
    print_rejected_human(&report.rejected);
}

pub fn print_import_report(report: &ImportReport, json: bool) {
    if json {
        print_json(
            &json!({
                "success": true,
                "status": report.status(),
                "archive": report.archive_path,
                "imported": report.imported(),
                "overwritten": report.overwritten(),
                "renamed": report.renamed(),
                "unchanged": report.unchanged(),
                "skipped": report.skipped(),
                "invalid": report.invalid(),
                "outcomes": report.outcomes,
                "rejected": rejected_json(&report.rejected),
            }),
            "import report",
        );
        return;
    }

    for outcome in &report.outcomes {
        let line = match outcome.kind {
            OutcomeKind::Imported => format!("{} {} imported", "●".green(), outcome.name),
            OutcomeKind::Unchanged => {
                format!("{} {} already present", "○".dimmed(), outcome.name)
            }
            OutcomeKind::Overwritten => {
                format!("{} {} overwritten", "●".yellow(), outcome.name)
            }
            OutcomeKind::RenamedAsNew { new_id } => format!(
                "{} {} imported as new ({})",
                "●".green(),
                outcome.name,
                new_id.to_string().dimmed()
            ),
            OutcomeKind::Skipped { .. } => format!("{} {} skipped", "○".yellow(), outcome.name),
        };
        println!("  {}", line);
    }
    print_rejected_human(&report.rejected);

    let summary = format!(
        "{} imported, {} overwritten, {} renamed, {} skipped, {} invalid",
        report.imported(),
        report.overwritten(),
        report.renamed(),
        report.skipped(),
        report.invalid()
    );
    match report.status() {
        ImportStatus::Success => println!("{} {}", "✓".green(), summary),
        ImportStatus::Partial => println!("{} {}", "⚠".yellow(), summary),
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::ProfileNotFound(_)) => "ProfileNotFound",
        Some(CliError::AmbiguousProfile(_)) => "AmbiguousProfile",
        Some(CliError::LastProfile) => "LastProfile",
        Some(CliError::InvalidConfiguration(_)) => "InvalidConfiguration",
        Some(CliError::Profile(_)) => "ProfileError",
        Some(CliError::Exchange(ExchangeError::ArchiveRead { .. })) => "ArchiveRead",
        Some(CliError::Exchange(ExchangeError::ArchiveWrite { .. })) => "ArchiveWrite",
        Some(CliError::Exchange(ExchangeError::NothingSelected)) => "NothingSelected",
        Some(CliError::Exchange(_)) => "ExchangeError",
        None => "Error",
    }
}
