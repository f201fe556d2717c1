//! CLI arguments for fdgraph.
//!
//! This module defines the command-line interface structure using the clap
//! library. The tool is a classic filter: `lsof -F` output in, DOT out.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "fdgraph",
    about = "Convert lsof -F output into a Graphviz graph of processes and their IPC channels",
    long_about = "Convert lsof -F output into a Graphviz graph of processes and their IPC channels.\n\n\
                  Reads the tagged-field stream produced by `lsof -n -F` (add -R for parent/child \
                  edges), pairs up the two ends of unix sockets, FIFOs, pipes, and TCP/UDP \
                  connections, and writes a DOT digraph to stdout. Pipe the result into `dot -Tsvg` \
                  or any other Graphviz renderer.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Typical use: sudo lsof -n -R -F | fdgraph | dot -Tsvg > procs.svg"
)]
pub struct Args {
    /// Read lsof field output from a file instead of stdin
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Write the graph to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Log level (logs go to stderr, the graph goes to stdout)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Graph layout direction (LR or TB)
    #[arg(long)]
    pub rankdir: Option<String>,

    /// Font for node and edge labels
    #[arg(long)]
    pub fontname: Option<String>,

    /// Font size for node and edge labels
    #[arg(long)]
    pub fontsize: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["fdgraph"]);
        assert!(args.input.is_none());
        assert!(args.output.is_none());
        assert!(!args.no_config);
        assert!(args.rankdir.is_none());
    }

    #[test]
    fn test_style_flags() {
        let args = Args::parse_from(["fdgraph", "--rankdir", "TB", "--fontsize", "12"]);
        assert_eq!(args.rankdir.as_deref(), Some("TB"));
        assert_eq!(args.fontsize, Some(12));
    }

    #[test]
    fn test_io_flags() {
        let args = Args::parse_from(["fdgraph", "-i", "dump.lsof", "-o", "out.dot"]);
        assert_eq!(args.input.unwrap().to_str(), Some("dump.lsof"));
        assert_eq!(args.output.unwrap().to_str(), Some("out.dot"));
    }
}
