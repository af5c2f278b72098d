//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// envstack - Environment-parameterized AWS stack deployment.
#[derive(Parser, Debug)]
#[command(name = "envstack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, env = "ENVSTACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Context values (`key=value`); `env=<name>` selects the environment.
    #[arg(short = 'c', long = "context", global = true, value_parser = parse_key_value)]
    pub context: Vec<(String, String)>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new envstack project.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration file.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// List the stacks of the selected environment.
    List,

    /// Synthesize stack templates.
    Synth {
        /// Stack name filter (all stacks if not specified).
        stack: Option<String>,

        /// Write templates to this directory instead of stdout.
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Diff synthesized templates against the deployed stacks.
    Diff {
        /// Stack name filter (all stacks if not specified).
        stack: Option<String>,
    },

    /// Deploy the selected environment's stacks.
    Deploy {
        /// Stack name filter (all stacks if not specified).
        stack: Option<String>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Destroy the selected environment's stacks.
    Destroy {
        /// Stack name filter (all stacks if not specified).
        stack: Option<String>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Looks up a `--context` value by key.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a `KEY=VALUE` context argument.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Invalid context value '{s}'. Expected format: KEY=VALUE"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("env=production").unwrap(),
            (String::from("env"), String::from("production"))
        );
        assert!(parse_key_value("env").is_err());
    }

    #[test]
    fn test_context_selection() {
        let cli = Cli::parse_from(["envstack", "--context", "env=staging", "list"]);
        assert_eq!(cli.context_value("env"), Some("staging"));
        assert_eq!(cli.context_value("other"), None);
    }

    #[test]
    fn test_stack_filter_positional() {
        let cli = Cli::parse_from(["envstack", "deploy", "VpcStack", "--yes"]);
        match cli.command {
            Commands::Deploy { stack, yes } => {
                assert_eq!(stack.as_deref(), Some("VpcStack"));
                assert!(yes);
            }
            _ => panic!("expected deploy command"),
        }
    }
}
