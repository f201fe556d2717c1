//! Connection matching across process boundaries.
//!
//! Every descriptor of every live process is classified by its type tag and
//! filed into a per-kind bucket under a normalized identity key. Two
//! descriptors landing under the same key are the two ends of one channel;
//! the emitter turns exactly-two-member buckets into edges.

use crate::parser::{FileRecord, ProcTable};
use ahash::AHashMap;
use tracing::debug;

/// The channel kinds we know how to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Fifo,
    Unix,
    Tcp,
    Udp,
    Pipe,
}

impl ChannelKind {
    /// Lowercase name used in edge labels.
    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::Fifo => "fifo",
            ChannelKind::Unix => "unix",
            ChannelKind::Tcp => "tcp",
            ChannelKind::Udp => "udp",
            ChannelKind::Pipe => "pipe",
        }
    }

    /// Default edge color for this kind.
    pub fn default_color(self) -> &'static str {
        match self {
            ChannelKind::Fifo => "green",
            ChannelKind::Unix => "purple",
            ChannelKind::Tcp => "red",
            ChannelKind::Udp => "orange",
            ChannelKind::Pipe => "blue",
        }
    }
}

/// Descriptors grouped by identity key, in key-first-seen order.
#[derive(Debug, Default)]
pub struct Bucket<'a> {
    order: Vec<String>,
    map: AHashMap<String, Vec<&'a FileRecord>>,
}

impl<'a> Bucket<'a> {
    fn push(&mut self, key: String, file: &'a FileRecord) {
        match self.map.get_mut(&key) {
            Some(list) => list.push(file),
            None => {
                self.order.push(key.clone());
                self.map.insert(key, vec![file]);
            }
        }
    }

    /// Iterates (key, members) in key-first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[&'a FileRecord])> {
        self.order
            .iter()
            .filter_map(|key| self.map.get(key).map(|list| (key.as_str(), list.as_slice())))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&[&'a FileRecord]> {
        self.map.get(key).map(Vec::as_slice)
    }
}

/// The five per-kind buckets produced by one matching pass.
#[derive(Debug, Default)]
pub struct ConnectionMap<'a> {
    pub fifo: Bucket<'a>,
    pub unix: Bucket<'a>,
    pub tcp: Bucket<'a>,
    pub udp: Bucket<'a>,
    pub pipe: Bucket<'a>,
}

impl<'a> ConnectionMap<'a> {
    /// Buckets paired with their kind, in emission order.
    pub fn kinds(&self) -> [(ChannelKind, &Bucket<'a>); 5] {
        [
            (ChannelKind::Fifo, &self.fifo),
            (ChannelKind::Unix, &self.unix),
            (ChannelKind::Tcp, &self.tcp),
            (ChannelKind::Udp, &self.udp),
            (ChannelKind::Pipe, &self.pipe),
        ]
    }
}

/// Joins two endpoint halves into an order-independent key.
///
/// The separator is the literal two-character sequence `\n`, which DOT
/// renders as a line break inside the edge label. Pairs that collapse to a
/// single distinct member are rejected, a channel needs two ends.
fn paired_key(a: &str, b: &str) -> Option<String> {
    if a == b {
        return None;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    Some(format!("{lo}\\n{hi}"))
}

/// Classifies every descriptor of every live process into the five buckets.
pub fn find_connections(procs: &ProcTable) -> ConnectionMap<'_> {
    let mut conns = ConnectionMap::default();

    for (_, proc) in procs.iter() {
        for file in &proc.files {
            match file.kind.as_deref() {
                Some("unix") => {
                    // Inode when reported, device as the fallback identity.
                    if let Some(key) = file.inode.clone().or_else(|| file.device.clone()) {
                        conns.unix.push(key, file);
                    }
                }
                Some("FIFO") => {
                    if let Some(inode) = &file.inode {
                        conns.fifo.push(inode.clone(), file);
                    }
                }
                Some("PIPE") => {
                    let (Some(name), Some(device)) = (&file.name, &file.device) else {
                        continue;
                    };
                    // Strips leading arrow characters, then pairs the device
                    // with each remaining character individually. This
                    // reproduces the reference tool's behavior; see the
                    // matching note in DESIGN.md before "fixing" it.
                    for ch in name.trim_start_matches(['-', '>']).chars() {
                        let mut endpoint = [0u8; 4];
                        if let Some(key) = paired_key(device, ch.encode_utf8(&mut endpoint)) {
                            conns.pipe.push(key, file);
                        }
                    }
                }
                Some("IPv4") | Some("IPv6") => {
                    let Some(name) = &file.name else {
                        continue;
                    };
                    // Only connected sockets carry "local->remote" names;
                    // listeners have no partner to pair with.
                    let Some((local, remote)) = name.split_once("->") else {
                        continue;
                    };
                    if let Some(key) = paired_key(local, remote) {
                        if file.protocol.as_deref() == Some("TCP") {
                            conns.tcp.push(key, file);
                        } else {
                            conns.udp.push(key, file);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    debug!(
        unix = conns.unix.len(),
        fifo = conns.fifo.len(),
        pipe = conns.pipe.len(),
        tcp = conns.tcp.len(),
        udp = conns.udp.len(),
        "matched connection buckets"
    );
    conns
}
