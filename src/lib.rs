//! fdgraph library
//!
//! This library holds the full lsof-to-DOT pipeline so it can be exercised
//! outside the binary. The pipeline has three stages, each a pure function
//! over the previous stage's output:
//!
//! 1. **Parsing** ([`parser::parse`]): the `lsof -F` tagged-field stream is
//!    reconstructed into a pid-ordered process table.
//! 2. **Matching** ([`connections::find_connections`]): descriptors are
//!    grouped by kind under normalized identity keys so the two ends of a
//!    channel land in the same bucket.
//! 3. **Emission** ([`graph::render`]): processes become DOT nodes, live
//!    parent/child pairs and two-ended channels become edges.
//!
//! # Usage
//!
//! ```rust
//! use fdgraph::config::GraphStyle;
//! use fdgraph::{connections, graph, parser};
//!
//! let input = "p100\ncshell\nLalice\np200\ncsshd\nLbob\nR100\n";
//! let procs = parser::parse(input.as_bytes())?;
//! let conns = connections::find_connections(&procs);
//! let dot = graph::render(&procs, &conns, &GraphStyle::default());
//! assert!(dot.starts_with("digraph G {"));
//! # Ok::<(), fdgraph::parser::ParseError>(())
//! ```

pub mod cli;
pub mod config;
pub mod connections;
pub mod graph;
pub mod parser;

// Re-export main types for convenience
pub use config::{Config, GraphStyle};
pub use connections::{find_connections, ChannelKind, ConnectionMap};
pub use graph::render;
pub use parser::{parse, FileRecord, ParseError, ProcTable, ProcessRecord};
