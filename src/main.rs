//! fdgraph - version 0.1.0
//!
//! Filter binary: reads `lsof -F` field output, writes a Graphviz digraph.
//! This is the main entry point that wires the CLI, logging, and the
//! three-stage pipeline together.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing::{info, Level};

use fdgraph::cli::{Args, LogLevel};
use fdgraph::config::{resolve_config, show_config};
use fdgraph::connections::find_connections;
use fdgraph::graph::render;
use fdgraph::parser::parse;

/// Initializes tracing logging subsystem with configured log level.
///
/// Logs go to stderr: stdout carries the graph and must stay clean.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = resolve_config(args)?;

    if args.show_config {
        print!("{}", show_config(&config, args.config_format.clone())?);
        return Ok(());
    }

    let procs = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open input file {}", path.display()))?;
            parse(BufReader::new(file))?
        }
        None => parse(io::stdin().lock())?,
    };
    info!(processes = procs.len(), "parsed process table");

    let conns = find_connections(&procs);
    let dot = render(&procs, &conns, &config.style);

    match &args.output {
        Some(path) => std::fs::write(path, &dot)
            .with_context(|| format!("cannot write output file {}", path.display()))?,
        None => io::stdout()
            .write_all(dot.as_bytes())
            .context("cannot write graph to stdout")?,
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    if let Err(err) = run(&args) {
        eprintln!("fdgraph: {err}");
        std::process::exit(1);
    }
}
