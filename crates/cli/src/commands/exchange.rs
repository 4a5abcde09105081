//! Archive commands: export, inspect and import of `.ckb` files

use anyhow::{Context as _, Result};
use ckbpkg_exchange::prelude::*;
use dialoguer::{Confirm, Select};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::commands::{Completion, ConflictMode, Context};
use crate::error::CliError;
use crate::output;

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExchangeError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(task)
        .await
        .context("Archive task panicked")?;
    Ok(result.map_err(CliError::from)?)
}

pub async fn export(
    ctx: &Context,
    archive: PathBuf,
    references: &[String],
    all: bool,
) -> Result<Completion> {
    let collection = ctx.load().await?;

    let ids = if all {
        collection.ids()
    } else {
        references
            .iter()
            .map(|reference| {
                collection
                    .resolve(reference)
                    .map(|p| p.id())
                    .map_err(CliError::from)
            })
            .collect::<Result<Vec<_>, _>>()?
    };
    debug!(count = ids.len(), archive = ?archive, "Exporting profiles");

    let exchange = Arc::clone(&ctx.exchange);
    let report = blocking(move || exchange.export(&collection, &ids, &archive)).await?;

    info!(archive = ?report.archive_path, profiles = report.exported.len(), "Export finished");
    output::print_export_report(&report, ctx.json);
    Ok(Completion::Done)
}

pub async fn inspect(ctx: &Context, archive: PathBuf) -> Result<Completion> {
    let exchange = Arc::clone(&ctx.exchange);
    let report = blocking(move || exchange.inspect(&archive)).await?;

    output::print_inspect_report(&report, ctx.json);
    Ok(if report.rejected.is_empty() {
        Completion::Done
    } else {
        Completion::Partial
    })
}

pub async fn import(
    ctx: &Context,
    archive: PathBuf,
    mode: ConflictMode,
    yes: bool,
) -> Result<Completion> {
    let interactive = !yes && !ctx.json;

    if interactive {
        let exchange = Arc::clone(&ctx.exchange);
        let path = archive.clone();
        let preview = blocking(move || exchange.inspect(&path)).await?;
        output::print_inspect_report(&preview, false);

        if preview.profiles.is_empty() {
            output::print_warning("Archive holds no importable profiles", ctx.json);
        } else if !Confirm::new()
            .with_prompt(format!("Import {} profile(s)?", preview.profiles.len()))
            .default(true)
            .interact()?
        {
            output::print_warning("Import cancelled", ctx.json);
            return Ok(Completion::Done);
        }
    }

    let mut collection = ctx.load().await?;
    let exchange = Arc::clone(&ctx.exchange);
    let (collection, report) = blocking(move || {
        let mut policy = ImportPolicy::new(mode, interactive);
        let report = exchange.import(&mut collection, &archive, &mut policy)?;
        Ok((collection, report))
    })
    .await?;

    if report.outcomes.iter().any(ImportOutcome::is_change) {
        ctx.save(&collection).await?;
    } else {
        debug!("Import changed nothing, store left untouched");
    }

    output::print_import_report(&report, ctx.json);
    Ok(match report.status() {
        ImportStatus::Success => Completion::Done,
        ImportStatus::Partial => Completion::Partial,
    })
}

/// Conflict policy driven by `--on-conflict`
struct ImportPolicy {
    mode: ConflictMode,
    interactive: bool,
}

impl ImportPolicy {
    fn new(mode: ConflictMode, interactive: bool) -> Self {
        Self { mode, interactive }
    }

    fn ask(conflict: &Conflict<'_>) -> Option<ConflictDecision> {
        let choices = [
            ConflictDecision::Skip,
            ConflictDecision::Overwrite,
            ConflictDecision::RenameAsNew,
        ];
        let labels = [
            "Keep existing".to_string(),
            format!("Overwrite {}", conflict.existing.name()),
            "Import as new profile".to_string(),
        ];

        let picked = Select::new()
            .with_prompt(format!(
                "Profile {} ({}) already exists",
                conflict.candidate.name(),
                conflict.candidate.id()
            ))
            .items(&labels)
            .default(0)
            .interact_opt();

        match picked {
            Ok(Some(index)) => choices.get(index).copied(),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Conflict prompt failed, leaving unresolved");
                None
            }
        }
    }
}

impl ConflictPolicy for ImportPolicy {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Option<ConflictDecision> {
        match self.mode.fixed() {
            Some(decision) => Some(decision),
            None if self.interactive => Self::ask(conflict),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckbpkg_exchange::{ImportCandidate, IniProfileSerializer, IntegrityStamper, ProfileSerializer};
    use ckbpkg_test_helpers::prelude::*;

    #[test]
    fn test_fixed_modes_never_prompt() {
        let existing = work_profile();
        let profile = must(work_profile().with_field("Mode0/Name", "Other"));
        let document = IniProfileSerializer.serialize(&profile);
        let candidate = ImportCandidate {
            base_name: "ckbprofile0".to_string(),
            digest: IntegrityStamper::digest(&document.to_bytes()),
            document,
            profile,
        };
        let conflict = Conflict {
            existing: &existing,
            candidate: &candidate,
        };

        for (mode, expected) in [
            (ConflictMode::Skip, Some(ConflictDecision::Skip)),
            (ConflictMode::Overwrite, Some(ConflictDecision::Overwrite)),
            (ConflictMode::Rename, Some(ConflictDecision::RenameAsNew)),
            (ConflictMode::Ask, None),
        ] {
            let mut policy = ImportPolicy::new(mode, false);
            assert_eq!(policy.decide(&conflict), expected);
        }
    }
}
