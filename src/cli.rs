//! Command-line interface

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ISO 9241-9 multi-directional pointing test driven by classifier decisions
#[derive(Parser, Debug)]
#[command(name = "isofitts")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one session and save its log
    Run {
        /// Where control decisions come from
        #[arg(short, long, value_enum, default_value_t = SourceKind::Udp)]
        source: SourceKind,

        /// Datagram address to listen on (udp source)
        #[arg(short, long)]
        bind: Option<String>,

        /// Condition tag embedded in the file name, e.g. the classifier
        #[arg(short, long)]
        label: Option<String>,

        /// Seed for the simulated operator
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Results directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute metrics for every session log in a directory
    Analyze {
        /// Directory of session logs
        dir: PathBuf,

        /// Also write the reports as JSON to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Classifier datagrams over UDP
    Udp,
    /// Seeded synthetic participant
    Sim,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_simulated_source() {
        let cli = Cli::try_parse_from([
            "isofitts", "-v", "run", "--source", "sim", "--seed", "9", "--label", "lda",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                source, seed, label, ..
            } => {
                assert_eq!(source, SourceKind::Sim);
                assert_eq!(seed, 9);
                assert_eq!(label.as_deref(), Some("lda"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_analyze_with_report() {
        let cli = Cli::try_parse_from(["isofitts", "analyze", "results", "--report", "out.json"])
            .unwrap();
        match cli.command {
            Commands::Analyze { dir, report } => {
                assert_eq!(dir, PathBuf::from("results"));
                assert_eq!(report, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
