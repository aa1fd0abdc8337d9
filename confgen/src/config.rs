//! Run configuration for the replica configuration generator

use crate::error::{ConfgenError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Full description of one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClusterSpec {
    /// Replica host addresses, given inline
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,

    /// Newline-delimited file of replica host addresses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_file: Option<PathBuf>,

    /// Number of replicas to place on each address
    pub replicas_per_address: usize,

    /// Peer port of the first replica on each address
    pub peer_port: u16,

    /// Client port of the first replica on each address
    pub client_port: u16,

    /// Cluster-wide protocol parameters
    pub params: ClusterParams,

    /// Output file layout
    pub output: OutputConfig,

    /// External key generators
    pub tools: ToolConfig,
}

/// Optional protocol parameters written at the top of the shared config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClusterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_period: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace_maker: Option<String>,
}

impl ClusterParams {
    /// Parameters that are set, as `(key, value)` in emission order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(block_size) = self.block_size {
            entries.push(("block-size", block_size.to_string()));
        }
        if let Some(stable_period) = self.stable_period {
            entries.push(("stable-period", stable_period.to_string()));
        }
        if let Some(ref pace_maker) = self.pace_maker {
            entries.push(("pace-maker", pace_maker.clone()));
        }
        entries
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory all artifacts are written into
    pub dir: PathBuf,

    /// Shared file name prefix
    pub prefix: String,

    /// File name of the node directory
    pub node_directory: String,

    /// Create `dir` if it does not exist
    pub create_dir: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("conf-gen"),
            prefix: "hotstuff.gen".into(),
            node_directory: "nodes.txt".into(),
            create_dir: false,
        }
    }
}

impl OutputConfig {
    /// Path of the shared cluster config
    pub fn main_config_path(&self) -> PathBuf {
        self.dir.join(format!("{}.conf", self.prefix))
    }

    /// Path of the secret config for replica `index`
    pub fn replica_config_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}-sec{}.conf", self.prefix, index))
    }

    /// Path of the node directory
    pub fn node_directory_path(&self) -> PathBuf {
        self.dir.join(&self.node_directory)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolConfig {
    /// Identity key generator executable
    pub keygen: PathBuf,

    /// TLS key generator executable
    pub tls_keygen: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            keygen: PathBuf::from("./hotstuff-keygen"),
            tls_keygen: PathBuf::from("./hotstuff-tls-keygen"),
        }
    }
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            address_file: None,
            replicas_per_address: 1,
            peer_port: 30000,
            client_port: 40000,
            params: ClusterParams::default(),
            output: OutputConfig::default(),
            tools: ToolConfig::default(),
        }
    }
}

/// Where the replica host addresses come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    Inline(Vec<String>),
    File(PathBuf),
}

impl AddressSource {
    /// Read the ordered address list. Entries are trimmed and blank ones dropped.
    pub fn resolve(&self) -> Result<Vec<String>> {
        let addresses: Vec<String> = match self {
            AddressSource::Inline(list) => list
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect(),
            AddressSource::File(path) => {
                let content = fs::read_to_string(path).map_err(|source| {
                    ConfgenError::AddressFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect()
            }
        };

        if addresses.is_empty() {
            return Err(ConfgenError::Input(match self {
                AddressSource::Inline(_) => "address list is empty".into(),
                AddressSource::File(path) => format!("address file {:?} lists no addresses", path),
            }));
        }

        debug!("Resolved {} addresses", addresses.len());
        Ok(addresses)
    }
}

impl ClusterSpec {
    /// Load a spec from a TOML file, or start from defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                let content = fs::read_to_string(path).map_err(|e| {
                    ConfgenError::Config(format!("cannot read {:?}: {}", path, e))
                })?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Serialize the spec back to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Pick the address source. Exactly one of inline addresses or a file must be set.
    pub fn address_source(&self) -> Result<AddressSource> {
        match (&self.address_file, self.addresses.is_empty()) {
            (Some(_), false) => Err(ConfgenError::Config(
                "both inline addresses and an address file were given".into(),
            )),
            (Some(path), true) => Ok(AddressSource::File(path.clone())),
            (None, false) => Ok(AddressSource::Inline(self.addresses.clone())),
            (None, true) => Err(ConfgenError::Input(
                "no addresses given (use --addr or --ips)".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_spec() {
        let spec = ClusterSpec::default();
        assert_eq!(spec.replicas_per_address, 1);
        assert_eq!(spec.peer_port, 30000);
        assert_eq!(spec.client_port, 40000);
        assert_eq!(spec.params, ClusterParams::default());
        assert_eq!(
            spec.output.main_config_path(),
            PathBuf::from("conf-gen/hotstuff.gen.conf")
        );
        assert_eq!(
            spec.output.replica_config_path(7),
            PathBuf::from("conf-gen/hotstuff.gen-sec7.conf")
        );
        assert_eq!(spec.output.node_directory_path(), PathBuf::from("conf-gen/nodes.txt"));
    }

    #[test]
    fn test_param_entries_order() {
        let params = ClusterParams {
            block_size: Some(400),
            stable_period: None,
            pace_maker: Some("rr".into()),
        };
        assert_eq!(
            params.entries(),
            vec![("block-size", "400".to_string()), ("pace-maker", "rr".to_string())]
        );
        assert!(ClusterParams::default().entries().is_empty());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
addresses = ["10.0.2.6", "10.0.3.6"]
replicas-per-address = 2

[params]
stable-period = 40

[output]
prefix = "geo"
"#
        )
        .unwrap();

        let spec = ClusterSpec::load(Some(file.path())).unwrap();
        assert_eq!(spec.addresses, vec!["10.0.2.6", "10.0.3.6"]);
        assert_eq!(spec.replicas_per_address, 2);
        assert_eq!(spec.peer_port, 30000);
        assert_eq!(spec.params.stable_period, Some(40));
        assert_eq!(spec.params.block_size, None);
        assert_eq!(spec.output.prefix, "geo");
        assert_eq!(spec.output.node_directory, "nodes.txt");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut spec = ClusterSpec::default();
        spec.addresses = vec!["127.0.0.1".into()];
        spec.params.pace_maker = Some("rr".into());

        let text = spec.to_toml().unwrap();
        let parsed: ClusterSpec = toml::from_str(&text).unwrap();
        assert_eq!(parsed.addresses, spec.addresses);
        assert_eq!(parsed.params, spec.params);
    }

    #[test]
    fn test_address_source_selection() {
        let mut spec = ClusterSpec::default();
        assert!(matches!(spec.address_source(), Err(ConfgenError::Input(_))));

        spec.addresses = vec!["10.0.0.1".into()];
        assert_eq!(
            spec.address_source().unwrap(),
            AddressSource::Inline(vec!["10.0.0.1".into()])
        );

        spec.address_file = Some(PathBuf::from("ips.txt"));
        assert!(matches!(spec.address_source(), Err(ConfgenError::Config(_))));
    }

    #[test]
    fn test_address_file_trims_and_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "10.0.0.1\n  10.0.0.2  \n\n10.0.0.3\n").unwrap();

        let addresses = AddressSource::File(file.path().to_path_buf()).resolve().unwrap();
        assert_eq!(addresses, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn test_empty_or_missing_address_file() {
        let file = NamedTempFile::new().unwrap();
        let err = AddressSource::File(file.path().to_path_buf()).resolve().unwrap_err();
        assert!(matches!(err, ConfgenError::Input(_)));

        let err = AddressSource::File(PathBuf::from("/nonexistent/ips.txt"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfgenError::AddressFile { .. }));
    }
}
