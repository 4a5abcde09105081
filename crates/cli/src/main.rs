//! ckbpkgctl - profile manager for ckb devices
//!
//! Manages the profile list of a device and moves profiles between
//! machines through portable `.ckb` archives.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;

use anyhow::Result;
use ckbpkg_exchange::ExchangeConfig;
use ckbpkg_profile::ProfileStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Completion, ConflictMode, Context, MoveDirection};
use crate::error::{CliError, EXIT_PARTIAL};

#[derive(Parser)]
#[command(name = "ckbpkgctl")]
#[command(about = "Manage ckb device profiles and exchange them as .ckb archives")]
#[command(version)]
#[command(long_about = "
ckbpkgctl manages the profile list of a ckb device and exports or imports
profiles as .ckb archives. Every profile in an archive carries a SHA-256
digest that is verified before anything is imported.

Use --json flag for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Profile store file
    #[arg(long, global = true, env = "CKBPKG_STORE")]
    store: Option<PathBuf>,

    /// Parent directory for per-operation scratch directories
    #[arg(long, global = true, env = "CKBPKG_SCRATCH")]
    scratch_dir: Option<PathBuf>,

    /// Deflate level for exported archives
    #[arg(long, global = true, value_parser = clap::value_parser!(i64).range(0..=9))]
    compression_level: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List profiles, marking the current one
    List,

    /// Create an empty profile
    Create {
        /// Profile name
        name: String,
    },

    /// Rename a profile
    Rename {
        /// Profile GUID or name
        profile: String,
        /// New name
        name: String,
    },

    /// Copy a profile under a new GUID
    Duplicate {
        /// Profile GUID or name
        profile: String,
    },

    /// Delete a profile
    Delete {
        /// Profile GUID or name
        profile: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a profile one place up or down
    Move {
        /// Profile GUID or name
        profile: String,
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Make a profile current
    Select {
        /// Profile GUID or name
        profile: String,
    },

    /// Export profiles to a .ckb archive
    Export {
        /// Destination archive; .ckb is appended when missing
        archive: PathBuf,
        /// Profiles to export, by GUID or name
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        profiles: Vec<String>,
        /// Export every profile
        #[arg(short, long)]
        all: bool,
    },

    /// Import profiles from a .ckb archive
    Import {
        /// Source archive
        archive: PathBuf,
        /// How to settle profiles whose GUID already exists
        #[arg(long, value_enum, default_value_t = ConflictMode::Ask)]
        on_conflict: ConflictMode,
        /// Skip the confirmation and conflict prompts
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the profiles held by a .ckb archive
    Inspect {
        /// Source archive
        archive: PathBuf,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "ckbpkgctl={0},ckbpkg_exchange={0},ckbpkg_profile={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli).await {
        Ok(Completion::Done) => ExitCode::SUCCESS,
        Ok(Completion::Partial) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let code = e
                .downcast_ref::<CliError>()
                .map(CliError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn store_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.store {
        return Ok(path.clone());
    }
    dirs::config_dir()
        .map(|dir| dir.join("ckbpkg").join("profiles.json"))
        .ok_or_else(|| {
            CliError::InvalidConfiguration(
                "no config directory found, pass --store or set CKBPKG_STORE".to_string(),
            )
            .into()
        })
}

fn exchange_config(cli: &Cli) -> ExchangeConfig {
    let mut config = ExchangeConfig::default();
    if let Some(level) = cli.compression_level {
        config = config.with_compression_level(Some(level));
    }
    if let Some(root) = &cli.scratch_dir {
        config = config.with_scratch_root(root);
    }
    config
}

fn build_context(cli: &Cli) -> Result<Context> {
    Ok(Context::new(
        ProfileStore::new(store_path(cli)?),
        exchange_config(cli),
        cli.json,
    ))
}

async fn execute_command(cli: &Cli) -> Result<Completion> {
    if let Commands::Completion { shell } = &cli.command {
        completion::generate_completion(*shell);
        return Ok(Completion::Done);
    }

    let ctx = build_context(cli)?;
    match &cli.command {
        Commands::List => commands::manage::list(&ctx).await,
        Commands::Create { name } => commands::manage::create(&ctx, name).await,
        Commands::Rename { profile, name } => commands::manage::rename(&ctx, profile, name).await,
        Commands::Duplicate { profile } => commands::manage::duplicate(&ctx, profile).await,
        Commands::Delete { profile, yes } => commands::manage::delete(&ctx, profile, *yes).await,
        Commands::Move { profile, direction } => {
            commands::manage::move_profile(&ctx, profile, *direction).await
        }
        Commands::Select { profile } => commands::manage::select(&ctx, profile).await,
        Commands::Export {
            archive,
            profiles,
            all,
        } => commands::exchange::export(&ctx, archive.clone(), profiles, *all).await,
        Commands::Import {
            archive,
            on_conflict,
            yes,
        } => commands::exchange::import(&ctx, archive.clone(), *on_conflict, *yes).await,
        Commands::Inspect { archive } => commands::exchange::inspect(&ctx, archive.clone()).await,
        Commands::Completion { .. } => Ok(Completion::Done),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_list_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["ckbpkgctl", "list"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(cli.compression_level.is_none());
        assert!(matches!(cli.command, Commands::List));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from([
            "ckbpkgctl",
            "list",
            "--json",
            "-vv",
            "--store",
            "/tmp/p.json",
        ])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/p.json")));
        Ok(())
    }

    #[test]
    fn parse_compression_level_range() -> TestResult {
        let cli = Cli::try_parse_from(["ckbpkgctl", "--compression-level", "9", "list"])?;
        assert_eq!(cli.compression_level, Some(9));
        assert!(Cli::try_parse_from(["ckbpkgctl", "--compression-level", "12", "list"]).is_err());
        Ok(())
    }

    #[test]
    fn parse_export_requires_profiles_or_all() -> TestResult {
        assert!(Cli::try_parse_from(["ckbpkgctl", "export", "out.ckb"]).is_err());
        assert!(Cli::try_parse_from(["ckbpkgctl", "export", "out.ckb", "Work", "--all"]).is_err());

        let cli = Cli::try_parse_from(["ckbpkgctl", "export", "out.ckb", "Work", "Home"])?;
        match cli.command {
            Commands::Export { profiles, all, .. } => {
                assert_eq!(profiles, vec!["Work", "Home"]);
                assert!(!all);
            }
            _ => return Err("expected Export command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_import_conflict_modes() -> TestResult {
        let cli = Cli::try_parse_from(["ckbpkgctl", "import", "in.ckb"])?;
        assert!(matches!(
            cli.command,
            Commands::Import {
                on_conflict: ConflictMode::Ask,
                yes: false,
                ..
            }
        ));

        let cli = Cli::try_parse_from([
            "ckbpkgctl",
            "import",
            "in.ckb",
            "--on-conflict",
            "rename",
            "-y",
        ])?;
        assert!(matches!(
            cli.command,
            Commands::Import {
                on_conflict: ConflictMode::Rename,
                yes: true,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_move_direction() -> TestResult {
        let cli = Cli::try_parse_from(["ckbpkgctl", "move", "Home", "up"])?;
        assert!(matches!(
            cli.command,
            Commands::Move {
                direction: MoveDirection::Up,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["ckbpkgctl", "move", "Home", "sideways"]).is_err());
        Ok(())
    }

    #[test]
    fn compression_level_defaults_unless_given() -> TestResult {
        let cli = Cli::try_parse_from(["ckbpkgctl", "list"])?;
        assert_eq!(
            exchange_config(&cli).compression_level,
            ExchangeConfig::default().compression_level
        );

        let cli = Cli::try_parse_from(["ckbpkgctl", "--compression-level", "1", "list"])?;
        assert_eq!(exchange_config(&cli).compression_level, Some(1));
        Ok(())
    }

    #[test]
    fn explicit_store_wins() -> TestResult {
        let cli = Cli::try_parse_from(["ckbpkgctl", "--store", "/tmp/x.json", "list"])?;
        assert_eq!(store_path(&cli)?, PathBuf::from("/tmp/x.json"));
        Ok(())
    }
}
