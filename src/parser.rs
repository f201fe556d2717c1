//! Parser for `lsof -F` tagged-field output.
//!
//! Every input line is one ASCII tag character followed by its value. A `p`
//! line opens a process section, an `f` line opens a file-descriptor section
//! inside it, and every other tag is a field assignment to whichever section
//! is currently open. The parser reconstructs one [`ProcessRecord`] per pid,
//! each owning its [`FileRecord`]s in input order.

use ahash::AHashMap;
use std::io::BufRead;
use thiserror::Error;
use tracing::debug;

/// Descriptor label lsof uses for a program text segment.
pub const TEXT_SEGMENT_FD: &str = "txt";
/// Type label lsof uses when it cannot classify a descriptor.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Errors produced while reading and parsing the field stream.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The stream starts with lsof's human-readable column header, which
    /// means field mode was not enabled. Not recoverable.
    #[error("input is not in field format - did you run lsof without -F?")]
    NotFieldMode,

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// One open file descriptor belonging to a process.
///
/// All fields except `owner_pid` are optional because they arrive as
/// independent tagged lines and the stream may stop at any point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRecord {
    /// Pid of the owning process. Used for identity comparison and for
    /// naming the owning node during emission.
    pub owner_pid: String,
    /// Descriptor label as reported (`f` tag): a number or a symbolic name
    /// such as `txt` or `cwd`.
    pub descriptor: Option<String>,
    /// Descriptor kind (`t` tag): `unix`, `FIFO`, `PIPE`, `IPv4`, `IPv6`, ...
    pub kind: Option<String>,
    /// Endpoint description (`n` tag); format depends on the kind.
    pub name: Option<String>,
    /// Inode number (`i` tag), when lsof reports one.
    pub inode: Option<String>,
    /// Device identifier (`d` tag).
    pub device: Option<String>,
    /// Access mode (`a` tag): `r`, `w`, or `u`.
    pub access: Option<String>,
    /// Transport protocol (`P` tag), meaningful for network descriptors.
    pub protocol: Option<String>,
    /// Tags we do not interpret, kept verbatim.
    pub other: AHashMap<char, String>,
}

/// One inventoried process with its open descriptors.
///
/// A default-constructed record doubles as the empty placeholder left behind
/// by duplicate-section discarding and kernel-thread suppression; placeholders
/// carry no pid and therefore emit nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    /// Process id (`p` tag), kept as a string to tolerate any formatting.
    pub pid: Option<String>,
    /// Short command name (`c` tag).
    pub command: Option<String>,
    /// Richer display name (`n` tag on a process section), preferred over
    /// the command name for node labels when present.
    pub display_name: Option<String>,
    /// Resolved login name (`L` tag). Legitimately absent when the owning
    /// account was removed while the process kept running.
    pub login: Option<String>,
    /// Parent pid (`R` tag), present only when lsof ran with `-R`.
    pub parent_pid: Option<String>,
    /// Open descriptors in order of appearance.
    pub files: Vec<FileRecord>,
    /// Tags we do not interpret, kept verbatim.
    pub other: AHashMap<char, String>,
}

impl ProcessRecord {
    /// True for the empty placeholders left by duplicate-section discarding
    /// and kernel-thread suppression.
    pub fn is_suppressed(&self) -> bool {
        self.pid.is_none()
    }
}

/// Pid-to-process mapping that preserves first-seen order.
///
/// lsof emits processes in a meaningful order and the reference output
/// depends on it, so a plain hash map is not enough; iteration follows the
/// order in which pids were first observed.
#[derive(Debug, Default)]
pub struct ProcTable {
    order: Vec<String>,
    map: AHashMap<String, ProcessRecord>,
}

impl ProcTable {
    pub fn contains(&self, pid: &str) -> bool {
        self.map.contains_key(pid)
    }

    pub fn get(&self, pid: &str) -> Option<&ProcessRecord> {
        self.map.get(pid)
    }

    fn get_mut(&mut self, pid: &str) -> Option<&mut ProcessRecord> {
        self.map.get_mut(pid)
    }

    /// Inserts or replaces the record for `pid`. First insertion fixes the
    /// pid's position in iteration order; replacement keeps it.
    fn insert(&mut self, pid: String, record: ProcessRecord) {
        if !self.map.contains_key(&pid) {
            self.order.push(pid.clone());
        }
        self.map.insert(pid, record);
    }

    /// Iterates records in first-seen pid order, placeholders included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessRecord)> {
        self.order
            .iter()
            .filter_map(|pid| self.map.get(pid).map(|rec| (pid.as_str(), rec)))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Which record is currently receiving field assignments.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    /// No section open, or the open section is being discarded.
    None,
    /// The current process record.
    Process,
    /// The most recently opened file record of the current process.
    File,
}

impl Default for Target {
    fn default() -> Self {
        Target::None
    }
}

/// Rolling parse state: the table built so far plus the open section context.
#[derive(Debug, Default)]
struct Parser {
    procs: ProcTable,
    cur_pid: Option<String>,
    target: Target,
}

impl Parser {
    fn feed(&mut self, line: &str) -> Result<(), ParseError> {
        // lsof without -F prints a column header instead of tagged fields.
        if line.starts_with("COMMAND") {
            return Err(ParseError::NotFieldMode);
        }

        let mut chars = line.chars();
        let Some(tag) = chars.next() else {
            return Ok(());
        };
        let value = chars.as_str();

        match tag {
            'p' => self.open_process(value),
            'f' => self.open_file(value),
            _ => self.assign(tag, value),
        }
        Ok(())
    }

    /// A `p` line. A pid seen before means lsof repeated a section; the
    /// repeat is discarded wholesale so the first section's fields survive.
    fn open_process(&mut self, pid: &str) {
        if self.procs.contains(pid) {
            debug!(pid, "duplicate process section, discarding");
            self.cur_pid = None;
            self.target = Target::None;
            return;
        }

        let record = ProcessRecord {
            pid: Some(pid.to_string()),
            ..ProcessRecord::default()
        };
        self.procs.insert(pid.to_string(), record);
        self.cur_pid = Some(pid.to_string());
        self.target = Target::Process;
    }

    /// An `f` line. Ignored unless a live process section is open.
    fn open_file(&mut self, descriptor: &str) {
        let Some(pid) = self.cur_pid.clone() else {
            return;
        };
        if let Some(proc) = self.procs.get_mut(&pid) {
            proc.files.push(FileRecord {
                owner_pid: pid.clone(),
                descriptor: Some(descriptor.to_string()),
                ..FileRecord::default()
            });
            self.target = Target::File;
            self.suppress_kernel_thread();
        }
    }

    /// Any other tag: a field assignment to the open section, overwriting a
    /// prior value for the same tag. Silently dropped when no section is
    /// open (stray field, or inside a discarded duplicate section).
    fn assign(&mut self, tag: char, value: &str) {
        let Some(pid) = self.cur_pid.clone() else {
            return;
        };
        let Some(proc) = self.procs.get_mut(&pid) else {
            return;
        };

        match self.target {
            Target::Process => match tag {
                'c' => proc.command = Some(value.to_string()),
                'n' => proc.display_name = Some(value.to_string()),
                'L' => proc.login = Some(value.to_string()),
                'R' => proc.parent_pid = Some(value.to_string()),
                _ => {
                    proc.other.insert(tag, value.to_string());
                }
            },
            Target::File => {
                let Some(file) = proc.files.last_mut() else {
                    return;
                };
                match tag {
                    't' => file.kind = Some(value.to_string()),
                    'n' => file.name = Some(value.to_string()),
                    'i' => file.inode = Some(value.to_string()),
                    'd' => file.device = Some(value.to_string()),
                    'a' => file.access = Some(value.to_string()),
                    'P' => file.protocol = Some(value.to_string()),
                    _ => {
                        file.other.insert(tag, value.to_string());
                    }
                }
                self.suppress_kernel_thread();
            }
            Target::None => {}
        }
    }

    /// Kernel threads show up as a `txt` descriptor of `unknown` type. When
    /// the current file record has accumulated that shape, the whole owning
    /// process is wiped to an empty placeholder and the section is closed.
    ///
    /// Checked after every file-field assignment since the two fields may
    /// arrive in either order.
    fn suppress_kernel_thread(&mut self) {
        let Some(pid) = self.cur_pid.clone() else {
            return;
        };
        let shaped = self
            .procs
            .get(&pid)
            .and_then(|proc| proc.files.last())
            .is_some_and(|file| {
                file.descriptor.as_deref() == Some(TEXT_SEGMENT_FD)
                    && file.kind.as_deref() == Some(UNKNOWN_TYPE)
            });
        if shaped {
            debug!(pid = %pid, "kernel thread, suppressing process");
            self.procs.insert(pid, ProcessRecord::default());
            self.cur_pid = None;
            self.target = Target::None;
        }
    }
}

/// Parses a full field stream into a [`ProcTable`].
///
/// The only fatal condition is input that is not in field format; everything
/// else degrades silently per the rules above. No trailing validation is
/// performed, a truncated stream simply yields partial records.
pub fn parse<R: BufRead>(input: R) -> Result<ProcTable, ParseError> {
    let mut parser = Parser::default();
    for line in input.lines() {
        parser.feed(&line?)?;
    }
    debug!(processes = parser.procs.len(), "parsed process table");
    Ok(parser.procs)
}
