//! Graphviz DOT emission.
//!
//! Turns the parsed process table and the matched connection buckets into a
//! `digraph` text block: one node per known process, one undirected-style
//! edge per live parent/child pair, one colored edge per matched two-ended
//! channel. The output is plain DOT, anything downstream (`dot`, `xdot`,
//! `graphviz-cli`) handles layout and rendering.

use crate::config::GraphStyle;
use crate::connections::{Bucket, ChannelKind, ConnectionMap};
use crate::parser::{ProcTable, ProcessRecord};
use std::fmt::{self, Write};

/// Renders the whole graph as one DOT text block.
pub fn render(procs: &ProcTable, conns: &ConnectionMap<'_>, style: &GraphStyle) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_graph(&mut out, procs, conns, style);
    out
}

fn write_graph(
    out: &mut impl Write,
    procs: &ProcTable,
    conns: &ConnectionMap<'_>,
    style: &GraphStyle,
) -> fmt::Result {
    writeln!(out, "digraph G {{")?;
    writeln!(
        out,
        "\tgraph [ center=true, margin=0.2, nodesep=0.1, ranksep=0.3, rankdir={}];",
        style.rankdir
    )?;
    writeln!(
        out,
        "\tnode [ shape=box, style=\"rounded,filled\" width=0, height=0, fontname={}, fontsize={}];",
        style.fontname, style.fontsize
    )?;
    writeln!(
        out,
        "\tedge [ fontname={}, fontsize={}];",
        style.fontname, style.fontsize
    )?;

    for (_, proc) in procs.iter() {
        write_node(out, procs, proc, style)?;
    }

    for (kind, bucket) in conns.kinds() {
        write_channel_edges(out, kind, bucket, style)?;
    }

    writeln!(out, "}}")
}

/// Emits the node statement for one process, then its parent edge if the
/// parent is known, live, and not the init process. Placeholders carry no
/// pid and produce nothing.
fn write_node(
    out: &mut impl Write,
    procs: &ProcTable,
    proc: &ProcessRecord,
    style: &GraphStyle,
) -> fmt::Result {
    let Some(pid) = proc.pid.as_deref() else {
        return Ok(());
    };

    // Children of init are de-emphasized by fill rather than by an edge.
    let fill = if proc.parent_pid.as_deref() == Some("1") {
        style.init_child_fill.as_str()
    } else {
        "white"
    };

    writeln!(
        out,
        "\tp{} [ label = \"{}\" fillcolor={} ];",
        pid,
        node_label(proc, pid),
        fill
    )?;

    if let Some(parent_pid) = proc.parent_pid.as_deref() {
        if let Some(parent) = procs.get(parent_pid) {
            if !parent.is_suppressed() && parent.pid.as_deref() != Some("1") {
                writeln!(
                    out,
                    "\tp{parent_pid} -> p{pid} [ penwidth=2 weight=100 color=grey60 dir=\"none\" ];"
                )?;
            }
        }
    }
    Ok(())
}

/// Builds the node label: display name over command name, pid, and login.
/// A missing login is surfaced as "no user" rather than dropped, the
/// anomaly is worth an operator's attention.
fn node_label(proc: &ProcessRecord, pid: &str) -> String {
    let command = proc.command.as_deref().unwrap_or("?");
    match (proc.display_name.as_deref(), proc.login.as_deref()) {
        (Some(name), Some(login)) => format!("{name}\\n{pid} {login}"),
        (_, Some(login)) => format!("{command}\\n{pid} {login}"),
        (_, None) => format!("{command}\\n{pid} no user"),
    }
}

/// Emits one edge per identity key whose bucket holds exactly two
/// descriptors owned by different processes. Singletons have no partner and
/// keys shared by more than two descriptors (duplicated after forking) are
/// ambiguous; both are skipped without comment.
fn write_channel_edges(
    out: &mut impl Write,
    kind: ChannelKind,
    bucket: &Bucket<'_>,
    style: &GraphStyle,
) -> fmt::Result {
    for (key, files) in bucket.iter() {
        let [a, b] = files else {
            continue;
        };
        if a.owner_pid == b.owner_pid {
            continue;
        }

        // The first-seen end decides the arrow: a writer pushes data toward
        // its partner, a reader pulls it, anything else is two-way.
        let dir = match a.access.as_deref() {
            Some("w") => "forward",
            Some("r") => "backward",
            _ => "both",
        };

        writeln!(
            out,
            "\tp{} -> p{} [ color=\"{}\" label=\"{}:\\n{}\" dir=\"{}\"];",
            a.owner_pid,
            b.owner_pid,
            style.edge_color(kind),
            kind.label(),
            key,
            dir
        )?;
    }
    Ok(())
}
