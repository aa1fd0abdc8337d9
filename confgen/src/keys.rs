//! Key material from external generators
//!
//! Both generators are invoked as `<tool> --num <count>` and print one key per
//! line on stdout. Every whitespace-separated token on a line starts with a
//! label of exactly [`LABEL_WIDTH`] characters (`pub:`, `sec:`, `crt:`, ...)
//! which carries no information and is discarded.

use crate::config::ToolConfig;
use crate::error::{ConfgenError, Result, ToolKind};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Width of the label in front of every generator output token
pub const LABEL_WIDTH: usize = 4;

/// Consensus signing key pair of one replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeyPair {
    pub public_component: String,
    pub private_component: String,
}

impl IdentityKeyPair {
    /// Decode `<label>public <label>private`
    pub fn decode(line: &str) -> std::result::Result<Self, String> {
        let fields = strip_labels(line, 2)?;
        Ok(Self {
            public_component: fields[0].to_string(),
            private_component: fields[1].to_string(),
        })
    }
}

/// Transport key material of one replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsKeyPair {
    pub certificate: String,
    pub private_key: String,
    /// Short public form of the certificate, safe for the shared config
    pub public_fingerprint: String,
}

impl TlsKeyPair {
    /// Decode `<label>certificate <label>private_key <label>fingerprint`
    pub fn decode(line: &str) -> std::result::Result<Self, String> {
        let fields = strip_labels(line, 3)?;
        Ok(Self {
            certificate: fields[0].to_string(),
            private_key: fields[1].to_string(),
            public_fingerprint: fields[2].to_string(),
        })
    }
}

/// Split a generator line on whitespace and drop the label of each token.
///
/// Returns the first `fields` values in line order. Lines with fewer tokens,
/// or with a token no longer than its label, are rejected. Tokens past
/// `fields` are ignored.
pub fn strip_labels(line: &str, fields: usize) -> std::result::Result<Vec<&str>, String> {
    let tokens: Vec<&str> = line.split_whitespace().take(fields).collect();
    if tokens.len() < fields {
        return Err(format!("expected {} fields, found {}", fields, tokens.len()));
    }

    tokens
        .into_iter()
        .enumerate()
        .map(|(i, token)| match token.get(LABEL_WIDTH..) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(format!("field {} ({:?}) has no value after its label", i, token)),
        })
        .collect()
}

/// Source of replica key material.
///
/// Implementations return one key pair per requested replica, in index order.
/// Callers still check the returned counts.
pub trait KeyMaterialProvider {
    fn generate_identity_keys(&self, n: usize) -> Result<Vec<IdentityKeyPair>>;

    fn generate_tls_keys(&self, n: usize) -> Result<Vec<TlsKeyPair>>;
}

/// Runs the two generator executables and parses their stdout
#[derive(Debug, Clone)]
pub struct ExternalKeygen {
    identity_tool: PathBuf,
    tls_tool: PathBuf,
}

impl ExternalKeygen {
    pub fn new(identity_tool: impl Into<PathBuf>, tls_tool: impl Into<PathBuf>) -> Self {
        Self {
            identity_tool: identity_tool.into(),
            tls_tool: tls_tool.into(),
        }
    }

    pub fn from_config(tools: &ToolConfig) -> Self {
        Self::new(&tools.keygen, &tools.tls_keygen)
    }

    fn tool_path(&self, tool: ToolKind) -> &Path {
        match tool {
            ToolKind::Identity => self.identity_tool.as_path(),
            ToolKind::Tls => self.tls_tool.as_path(),
        }
    }

    /// Invoke `tool` for `n` keys and return its stdout
    fn run(&self, tool: ToolKind, n: usize) -> Result<String> {
        let path = self.tool_path(tool);

        // Bare names are looked up on PATH, anything with a separator is checked as given
        let executable = which::which(path).map_err(|_| ConfgenError::ToolNotFound {
            tool,
            path: path.to_path_buf(),
        })?;

        debug!("Running {:?} --num {}", executable, n);
        let output = Command::new(&executable)
            .arg("--num")
            .arg(n.to_string())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| ConfgenError::ToolSpawn {
                tool,
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConfgenError::ToolFailed {
                tool,
                path: path.to_path_buf(),
                status: output.status.to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ConfgenError::MalformedKeyLine {
            tool,
            line: 0,
            reason: format!("output is not valid UTF-8: {}", e),
        })
    }
}

/// Decode every non-blank line of generator output
fn decode_lines<T>(
    tool: ToolKind,
    stdout: &str,
    decode: fn(&str) -> std::result::Result<T, String>,
) -> Result<Vec<T>> {
    stdout
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            decode(line).map_err(|reason| ConfgenError::MalformedKeyLine {
                tool,
                line: i + 1,
                reason,
            })
        })
        .collect()
}

impl KeyMaterialProvider for ExternalKeygen {
    fn generate_identity_keys(&self, n: usize) -> Result<Vec<IdentityKeyPair>> {
        let stdout = self.run(ToolKind::Identity, n)?;
        let keys = decode_lines(ToolKind::Identity, &stdout, IdentityKeyPair::decode)?;
        info!("Received {} identity key pairs", keys.len());
        Ok(keys)
    }

    fn generate_tls_keys(&self, n: usize) -> Result<Vec<TlsKeyPair>> {
        let stdout = self.run(ToolKind::Tls, n)?;
        let keys = decode_lines(ToolKind::Tls, &stdout, TlsKeyPair::decode)?;
        info!("Received {} TLS key pairs", keys.len());
        Ok(keys)
    }
}

/// Fixed key material, returned as-is regardless of the requested count
#[derive(Debug, Clone, Default)]
pub struct CannedKeyMaterial {
    pub identity: Vec<IdentityKeyPair>,
    pub tls: Vec<TlsKeyPair>,
}

impl CannedKeyMaterial {
    pub fn new(identity: Vec<IdentityKeyPair>, tls: Vec<TlsKeyPair>) -> Self {
        Self { identity, tls }
    }

    /// `n` distinct, recognisable key pairs of each kind
    pub fn numbered(n: usize) -> Self {
        let identity = (0..n)
            .map(|i| IdentityKeyPair {
                public_component: format!("idpub{}", i),
                private_component: format!("idsec{}", i),
            })
            .collect();
        let tls = (0..n)
            .map(|i| TlsKeyPair {
                certificate: format!("cert{}", i),
                private_key: format!("tlssec{}", i),
                public_fingerprint: format!("fp{}", i),
            })
            .collect();
        Self { identity, tls }
    }
}

impl KeyMaterialProvider for CannedKeyMaterial {
    fn generate_identity_keys(&self, _n: usize) -> Result<Vec<IdentityKeyPair>> {
        Ok(self.identity.clone())
    }

    fn generate_tls_keys(&self, _n: usize) -> Result<Vec<TlsKeyPair>> {
        Ok(self.tls.clone())
    }
}
