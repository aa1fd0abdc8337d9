//! Error types for the replica configuration generator

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfgenError>;

/// Which of the two external generators an error or key batch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Identity,
    Tls,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Identity => write!(f, "identity key generator"),
            ToolKind::Tls => write!(f, "TLS key generator"),
        }
    }
}

/// Pipeline stage an error surfaced in, used for the user-facing report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configuration,
    AddressPlanning,
    KeyGeneration,
    FileEmission,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Configuration => write!(f, "configuration"),
            Phase::AddressPlanning => write!(f, "address planning"),
            Phase::KeyGeneration => write!(f, "key generation"),
            Phase::FileEmission => write!(f, "file emission"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfgenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Cannot read address file {path:?}: {source}")]
    AddressFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} not found: {path:?}")]
    ToolNotFound { tool: ToolKind, path: PathBuf },

    #[error("{tool} ({path:?}) failed to start: {source}")]
    ToolSpawn {
        tool: ToolKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} ({path:?}) exited with status {status}")]
    ToolFailed {
        tool: ToolKind,
        path: PathBuf,
        status: String,
    },

    #[error("{tool} produced malformed output on line {line}: {reason}")]
    MalformedKeyLine {
        tool: ToolKind,
        line: usize,
        reason: String,
    },

    #[error("{tool} returned {actual} key pairs, expected {expected}")]
    KeyCountMismatch {
        tool: ToolKind,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to write {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl ConfgenError {
    /// Stage of the run this error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            ConfgenError::Config(_)
            | ConfgenError::TomlSer(_)
            | ConfgenError::TomlDe(_) => Phase::Configuration,
            ConfgenError::Input(_) | ConfgenError::AddressFile { .. } => Phase::AddressPlanning,
            ConfgenError::ToolNotFound { .. }
            | ConfgenError::ToolSpawn { .. }
            | ConfgenError::ToolFailed { .. }
            | ConfgenError::MalformedKeyLine { .. }
            | ConfgenError::KeyCountMismatch { .. } => Phase::KeyGeneration,
            ConfgenError::OutputWrite { .. } => Phase::FileEmission,
        }
    }

    /// The generator responsible, if this is a tool error
    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            ConfgenError::ToolNotFound { tool, .. }
            | ConfgenError::ToolSpawn { tool, .. }
            | ConfgenError::ToolFailed { tool, .. }
            | ConfgenError::MalformedKeyLine { tool, .. }
            | ConfgenError::KeyCountMismatch { tool, .. } => Some(*tool),
            _ => None,
        }
    }
}
