//! Configuration management for fdgraph.
//!
//! This module handles loading and merging graph styling configuration from
//! files and CLI arguments. It supports YAML, JSON, and TOML formats. The
//! defaults reproduce the reference output exactly, a config file is only
//! needed to restyle the graph.

use crate::cli::{Args, ConfigFormat};
use crate::connections::ChannelKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// Default styling constants
pub const DEFAULT_RANKDIR: &str = "LR";
pub const DEFAULT_FONTNAME: &str = "Helvetica";
pub const DEFAULT_FONTSIZE: u32 = 10;

/// Errors while loading or serializing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Graph styling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStyle {
    /// Layout direction, usually "LR" or "TB" (default: LR)
    #[serde(default = "default_rankdir")]
    pub rankdir: String,

    /// Font for node and edge labels (default: Helvetica)
    #[serde(default = "default_fontname")]
    pub fontname: String,

    /// Font size for node and edge labels (default: 10)
    #[serde(default = "default_fontsize")]
    pub fontsize: u32,

    /// Fill color for children of the init process (default: grey70)
    #[serde(default = "default_init_child_fill", alias = "init-child-fill")]
    pub init_child_fill: String,

    /// Edge color per channel kind (defaults: unix=purple, fifo=green,
    /// pipe=blue, tcp=red, udp=orange)
    #[serde(default = "default_unix_color", alias = "unix-color")]
    pub unix_color: String,
    #[serde(default = "default_fifo_color", alias = "fifo-color")]
    pub fifo_color: String,
    #[serde(default = "default_pipe_color", alias = "pipe-color")]
    pub pipe_color: String,
    #[serde(default = "default_tcp_color", alias = "tcp-color")]
    pub tcp_color: String,
    #[serde(default = "default_udp_color", alias = "udp-color")]
    pub udp_color: String,
}

fn default_rankdir() -> String {
    DEFAULT_RANKDIR.to_string()
}
fn default_fontname() -> String {
    DEFAULT_FONTNAME.to_string()
}
fn default_fontsize() -> u32 {
    DEFAULT_FONTSIZE
}
fn default_init_child_fill() -> String {
    "grey70".to_string()
}
fn default_unix_color() -> String {
    ChannelKind::Unix.default_color().to_string()
}
fn default_fifo_color() -> String {
    ChannelKind::Fifo.default_color().to_string()
}
fn default_pipe_color() -> String {
    ChannelKind::Pipe.default_color().to_string()
}
fn default_tcp_color() -> String {
    ChannelKind::Tcp.default_color().to_string()
}
fn default_udp_color() -> String {
    ChannelKind::Udp.default_color().to_string()
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            rankdir: default_rankdir(),
            fontname: default_fontname(),
            fontsize: default_fontsize(),
            init_child_fill: default_init_child_fill(),
            unix_color: default_unix_color(),
            fifo_color: default_fifo_color(),
            pipe_color: default_pipe_color(),
            tcp_color: default_tcp_color(),
            udp_color: default_udp_color(),
        }
    }
}

impl GraphStyle {
    /// Effective edge color for a channel kind.
    pub fn edge_color(&self, kind: ChannelKind) -> &str {
        match kind {
            ChannelKind::Unix => &self.unix_color,
            ChannelKind::Fifo => &self.fifo_color,
            ChannelKind::Pipe => &self.pipe_color,
            ChannelKind::Tcp => &self.tcp_color,
            ChannelKind::Udp => &self.udp_color,
        }
    }
}

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub style: GraphStyle,
}

/// Loads configuration from an explicit path or the default locations.
/// Absent files yield the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        // Try default locations
        let defaults = [
            "/etc/fdgraph/fdgraph.yaml",
            "/etc/fdgraph/fdgraph.yml",
            "./fdgraph.yaml",
            "./fdgraph.yml",
            "./fdgraph.toml",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(rankdir) = &args.rankdir {
        config.style.rankdir = rankdir.clone();
    }
    if let Some(fontname) = &args.fontname {
        config.style.fontname = fontname.clone();
    }
    if let Some(fontsize) = args.fontsize {
        config.style.fontsize = fontsize;
    }

    Ok(config)
}

/// Shows effective configuration in the requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        ConfigFormat::Toml => {
            toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
        }
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
        }
    };
    Ok(output)
}
