//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bookworm post-processing command line.
#[derive(Debug, Parser)]
#[command(
    name = "bookworm",
    about = "Moves completed downloads into the Bookworm library"
)]
pub struct Cli {
    /// JSON configuration document; environment overrides apply on top.
    #[arg(long, global = true, env = "BOOKWORM_CONFIG")]
    pub config: Option<PathBuf>,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Process the staging area once and exit.
    Run,
    /// Process the staging area on an interval until interrupted.
    Watch,
    /// Repair interrupted relocations and exit.
    Reconcile,
}

impl Command {
    /// Stable label used for the application span and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Watch => "watch",
            Self::Reconcile => "reconcile",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_before_or_after_subcommand() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["bookworm", "--config", "/etc/bookworm.json", "run"])?;
        assert_eq!(cli.command, Command::Run);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/bookworm.json")));

        let cli = Cli::try_parse_from(["bookworm", "watch", "--config", "cfg.json"])?;
        assert_eq!(cli.command.label(), "watch");
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        Ok(())
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["bookworm"]).is_err());
    }
}
