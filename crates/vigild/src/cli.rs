use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface of the vigil server.
#[derive(Debug, Parser)]
#[command(name = "vigild", version, about = "Server process lifecycle manager")]
pub struct Cli {
    /// Verbose logging; serves from a single process.
    #[arg(long)]
    pub debug: bool,

    /// Bypass the prefork topology and serve from this process.
    #[arg(long)]
    pub dev: bool,

    /// TOML configuration file. A missing file is not an error.
    #[arg(long, short, value_name = "PATH", default_value = "vigil.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prefork worker entry point; started by the arbiter.
    #[command(hide = true)]
    Worker,
}

impl Cli {
    pub fn is_worker(&self) -> bool {
        matches!(self.command, Some(Command::Worker))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_supervisor_mode() {
        let cli = Cli::parse_from(["vigild"]);
        assert!(!cli.debug);
        assert!(!cli.dev);
        assert!(!cli.is_worker());
        assert_eq!(cli.config, PathBuf::from("vigil.toml"));
    }

    #[test]
    fn parses_flags_and_worker_mode() {
        let cli = Cli::parse_from(["vigild", "--debug", "--config", "/etc/vigil.toml", "worker"]);
        assert!(cli.debug);
        assert!(cli.is_worker());
        assert_eq!(cli.config, PathBuf::from("/etc/vigil.toml"));
    }

    #[test]
    fn worker_subcommand_is_hidden_from_help() {
        let help = Cli::command().render_help().to_string();
        assert!(!help.contains("worker"));
    }

    #[test]
    fn version_flag_is_builtin() {
        let err = Cli::try_parse_from(["vigild", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
