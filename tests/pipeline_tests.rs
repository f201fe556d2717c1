//! Integration tests for the full lsof-to-DOT pipeline.
//!
//! These tests feed realistic `lsof -F` field streams through parse ->
//! match -> render and check the emitted DOT text, including one
//! byte-for-byte scenario to pin down the output format.

use fdgraph::config::GraphStyle;
use fdgraph::connections::find_connections;
use fdgraph::graph::render;
use fdgraph::parser::parse;
use std::fs::File;
use std::io::{BufReader, Write};

fn pipeline(lines: &[&str]) -> String {
    let procs = parse(lines.join("\n").as_bytes()).expect("parse failed");
    let conns = find_connections(&procs);
    render(&procs, &conns, &GraphStyle::default())
}

#[test]
fn test_tcp_session_end_to_end() {
    let out = pipeline(&[
        "p100",
        "cshell",
        "Lalice",
        "f1",
        "tIPv4",
        "n10.0.0.1:22->10.0.0.9:4444",
        "PTCP",
        "aw",
        "p200",
        "csshd",
        "Lbob",
        "f2",
        "tIPv4",
        "n10.0.0.9:4444->10.0.0.1:22",
        "PTCP",
        "ar",
    ]);

    let expected = [
        "digraph G {",
        "\tgraph [ center=true, margin=0.2, nodesep=0.1, ranksep=0.3, rankdir=LR];",
        "\tnode [ shape=box, style=\"rounded,filled\" width=0, height=0, fontname=Helvetica, fontsize=10];",
        "\tedge [ fontname=Helvetica, fontsize=10];",
        "\tp100 [ label = \"shell\\n100 alice\" fillcolor=white ];",
        "\tp200 [ label = \"sshd\\n200 bob\" fillcolor=white ];",
        "\tp100 -> p200 [ color=\"red\" label=\"tcp:\\n10.0.0.1:22\\n10.0.0.9:4444\" dir=\"forward\"];",
        "}",
    ]
    .join("\n")
        + "\n";

    assert_eq!(out, expected);
}

#[test]
fn test_every_emitted_node_is_a_known_pid() {
    let procs = parse(
        "p100\nca\nLu\np200\ncb\nR100\np7\nftxt\ntunknown\n".as_bytes(),
    )
    .unwrap();
    let conns = find_connections(&procs);
    let out = render(&procs, &conns, &GraphStyle::default());

    for line in out.lines() {
        let Some(rest) = line.strip_prefix("\tp") else {
            continue;
        };
        let Some((pid, _)) = rest.split_once(" [") else {
            continue;
        };
        if pid.contains("->") {
            continue;
        }
        assert!(procs.contains(pid), "emitted node for unknown pid {pid}");
    }
}

#[test]
fn test_kernel_thread_emits_nothing() {
    // The kworker had already accumulated a command, a login, and a FIFO
    // descriptor before the txt/unknown pair arrived.
    let out = pipeline(&[
        "p7", "ckworker", "Lroot", "f1", "tFIFO", "i99", "ftxt", "tunknown",
        "p200", "ccat", "Lalice", "f2", "tFIFO", "i99", "ar",
    ]);

    assert!(!out.contains("p7 "), "suppressed process must emit no node");
    assert!(!out.contains("kworker"));
    assert!(
        !out.contains("color=\"green\""),
        "suppressed process must contribute no edges"
    );
}

#[test]
fn test_duplicate_section_is_idempotent() {
    let once = pipeline(&["p100", "cshell", "Lalice"]);
    let twice = pipeline(&["p100", "cshell", "Lalice", "p100", "cother", "Lbob"]);
    assert_eq!(once, twice);
}

#[test]
fn test_init_children_are_grayed_not_linked() {
    let out = pipeline(&[
        "p1", "cinit", "Lroot", "p300", "csshd", "Lroot", "R1", "p400", "cbash", "Lalice", "R300",
    ]);

    assert!(out.contains("\tp300 [ label = \"sshd\\n300 root\" fillcolor=grey70 ];"));
    assert!(!out.contains("p1 -> p300"));
    assert!(out.contains("\tp300 -> p400 [ penwidth=2 weight=100 color=grey60 dir=\"none\" ];"));
}

#[test]
fn test_missing_login_is_labeled_no_user() {
    let out = pipeline(&["p50", "cinit"]);
    assert!(out.contains("\tp50 [ label = \"init\\n50 no user\" fillcolor=white ];"));
}

#[test]
fn test_unix_socket_pair_produces_one_purple_edge() {
    let out = pipeline(&[
        "p100", "cdbus", "Lmsg", "f3", "tunix", "i31337", "au",
        "p200", "cclient", "Lalice", "f7", "tunix", "i31337", "au",
    ]);

    let edges: Vec<&str> = out
        .lines()
        .filter(|l| l.contains("color=\"purple\""))
        .collect();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].contains("label=\"unix:\\n31337\""));
}

#[test]
fn test_listening_socket_produces_no_edge() {
    let out = pipeline(&["p100", "csshd", "Lroot", "f4", "tIPv4", "n*:22", "PTCP", "au"]);
    assert!(!out.contains("color=\"red\""));
}

#[test]
fn test_udp_edge_is_orange() {
    let out = pipeline(&[
        "p100", "ca", "Lu", "f1", "tIPv4", "n1.1.1.1:68->2.2.2.2:67", "PUDP", "au",
        "p200", "cb", "Lu", "f2", "tIPv4", "n2.2.2.2:67->1.1.1.1:68", "PUDP", "au",
    ]);
    assert!(out.contains("color=\"orange\""));
    assert!(out.contains("dir=\"both\""));
}

#[test]
fn test_not_field_mode_input_fails() {
    let err = parse("COMMAND   PID   USER\nsshd  100  root".as_bytes()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "input is not in field format - did you run lsof without -F?"
    );
}

#[test]
fn test_parse_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "p100\ncshell\nLalice\nf1\ntFIFO\ni5\n").unwrap();

    let reader = BufReader::new(File::open(file.path()).unwrap());
    let procs = parse(reader).unwrap();

    assert_eq!(procs.len(), 1);
    assert_eq!(procs.get("100").unwrap().files.len(), 1);
}
