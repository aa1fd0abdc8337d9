//! Rendering and writing of the generated configuration files

use crate::config::{ClusterParams, OutputConfig};
use crate::error::{ConfgenError, Result, ToolKind};
use crate::keys::{IdentityKeyPair, TlsKeyPair};
use crate::planner::ReplicaEndpoint;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One replica's endpoint joined with its key material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaRecord {
    pub endpoint: ReplicaEndpoint,
    pub identity: IdentityKeyPair,
    pub tls: TlsKeyPair,
}

impl ReplicaRecord {
    /// Pair endpoints with key pairs by position.
    ///
    /// All three sequences must have the same length.
    pub fn join(
        endpoints: Vec<ReplicaEndpoint>,
        identity: Vec<IdentityKeyPair>,
        tls: Vec<TlsKeyPair>,
    ) -> Result<Vec<ReplicaRecord>> {
        if identity.len() != endpoints.len() {
            return Err(ConfgenError::KeyCountMismatch {
                tool: ToolKind::Identity,
                expected: endpoints.len(),
                actual: identity.len(),
            });
        }
        if tls.len() != endpoints.len() {
            return Err(ConfgenError::KeyCountMismatch {
                tool: ToolKind::Tls,
                expected: endpoints.len(),
                actual: tls.len(),
            });
        }

        Ok(endpoints
            .into_iter()
            .zip(identity)
            .zip(tls)
            .map(|((endpoint, identity), tls)| ReplicaRecord {
                endpoint,
                identity,
                tls,
            })
            .collect())
    }

    pub fn index(&self) -> usize {
        self.endpoint.index
    }
}

/// Shared cluster config: parameters first, then one line per replica
pub fn render_main_config(params: &ClusterParams, records: &[ReplicaRecord]) -> String {
    let mut out = String::new();
    for (key, value) in params.entries() {
        out.push_str(&format!("{} = {}\n", key, value));
    }
    for record in records {
        out.push_str(&format!(
            "replica = {}, {}, {}\n",
            record.endpoint, record.identity.public_component, record.tls.public_fingerprint
        ));
    }
    out
}

/// Secret config of a single replica
pub fn render_replica_config(record: &ReplicaRecord) -> String {
    format!(
        "privkey = {}\ntls-privkey = {}\ntls-cert = {}\nidx = {}\n",
        record.identity.private_component,
        record.tls.private_key,
        record.tls.certificate,
        record.index()
    )
}

/// Index, address and secret config path of every replica
pub fn render_node_directory(output: &OutputConfig, records: &[ReplicaRecord]) -> String {
    records
        .iter()
        .map(|record| {
            format!(
                "{}:{}\t{}\n",
                record.index(),
                record.endpoint.address,
                output.replica_config_path(record.index()).display()
            )
        })
        .collect()
}

/// Paths written by [`ConfigEmitter::emit`]
#[derive(Debug, Clone)]
pub struct EmittedFiles {
    pub main_config: PathBuf,
    pub replica_configs: Vec<PathBuf>,
    pub node_directory: PathBuf,
}

/// Writes the artifact set for a list of replica records
pub struct ConfigEmitter<'a> {
    output: &'a OutputConfig,
    params: &'a ClusterParams,
}

impl<'a> ConfigEmitter<'a> {
    pub fn new(output: &'a OutputConfig, params: &'a ClusterParams) -> Self {
        Self { output, params }
    }

    /// Write the shared config, every replica config in index order, then the
    /// node directory. Stops at the first failed write; files already written
    /// are left behind.
    pub fn emit(&self, records: &[ReplicaRecord]) -> Result<EmittedFiles> {
        if self.output.create_dir {
            fs::create_dir_all(&self.output.dir).map_err(|source| ConfgenError::OutputWrite {
                path: self.output.dir.clone(),
                source,
            })?;
        }

        let main_config = self.output.main_config_path();
        write_file(&main_config, &render_main_config(self.params, records))?;
        info!("Wrote cluster config {:?}", main_config);

        let mut replica_configs = Vec::with_capacity(records.len());
        for record in records {
            let path = self.output.replica_config_path(record.index());
            write_file(&path, &render_replica_config(record))?;
            debug!("Wrote secret config for replica {}", record.index());
            replica_configs.push(path);
        }
        info!("Wrote {} replica configs", replica_configs.len());

        let node_directory = self.output.node_directory_path();
        write_file(&node_directory, &render_node_directory(self.output, records))?;
        info!("Wrote node directory {:?}", node_directory);

        Ok(EmittedFiles {
            main_config,
            replica_configs,
            node_directory,
        })
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| ConfgenError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{CannedKeyMaterial, KeyMaterialProvider};
    use crate::planner::plan_endpoints;
    use tempfile::TempDir;

    fn records(addresses: &[&str], k: usize) -> Vec<ReplicaRecord> {
        let addresses: Vec<String> = addresses.iter().map(|s| s.to_string()).collect();
        let endpoints = plan_endpoints(&addresses, k, 30000, 40000).unwrap();
        let keys = CannedKeyMaterial::numbered(endpoints.len());
        ReplicaRecord::join(
            endpoints,
            keys.generate_identity_keys(0).unwrap(),
            keys.generate_tls_keys(0).unwrap(),
        )
        .unwrap()
    }

    fn output_in(dir: &Path) -> OutputConfig {
        OutputConfig {
            dir: dir.to_path_buf(),
            prefix: "test".into(),
            node_directory: "nodes.txt".into(),
            create_dir: false,
        }
    }

    #[test]
    fn test_join_rejects_count_mismatch() {
        let endpoints = plan_endpoints(&["10.0.0.1".to_string()], 3, 30000, 40000).unwrap();
        let keys = CannedKeyMaterial::numbered(3);
        let short = CannedKeyMaterial::numbered(2);

        let err = ReplicaRecord::join(endpoints.clone(), short.identity, keys.tls.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfgenError::KeyCountMismatch { tool: ToolKind::Identity, expected: 3, actual: 2 }
        ));

        let long = CannedKeyMaterial::numbered(4);
        let err = ReplicaRecord::join(endpoints, keys.identity, long.tls).unwrap_err();
        assert!(matches!(
            err,
            ConfgenError::KeyCountMismatch { tool: ToolKind::Tls, expected: 3, actual: 4 }
        ));
    }

    #[test]
    fn test_main_config_format() {
        let params = ClusterParams {
            block_size: Some(400),
            stable_period: None,
            pace_maker: Some("rr".into()),
        };
        let text = render_main_config(&params, &records(&["10.0.0.1", "10.0.0.2"], 1));
        assert_eq!(
            text,
            "block-size = 400\n\
             pace-maker = rr\n\
             replica = 10.0.0.1:30000;40000, idpub0, fp0\n\
             replica = 10.0.0.2:30000;40000, idpub1, fp1\n"
        );
    }

    #[test]
    fn test_main_config_all_params() {
        let params = ClusterParams {
            block_size: Some(1),
            stable_period: Some(40),
            pace_maker: Some("rr".into()),
        };
        let text = render_main_config(&params, &[]);
        assert_eq!(text, "block-size = 1\nstable-period = 40\npace-maker = rr\n");
    }

    #[test]
    fn test_replica_config_format() {
        let recs = records(&["10.0.0.1"], 2);
        assert_eq!(
            render_replica_config(&recs[1]),
            "privkey = idsec1\ntls-privkey = tlssec1\ntls-cert = cert1\nidx = 1\n"
        );
    }

    #[test]
    fn test_node_directory_format() {
        let output = output_in(Path::new("conf-gen"));
        let text = render_node_directory(&output, &records(&["10.0.0.1", "10.0.0.2"], 1));
        assert_eq!(
            text,
            "0:10.0.0.1\tconf-gen/test-sec0.conf\n1:10.0.0.2\tconf-gen/test-sec1.conf\n"
        );
    }

    #[test]
    fn test_emit_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let output = output_in(dir.path());
        let params = ClusterParams::default();
        let recs = records(&["10.0.0.1", "10.0.0.2", "10.0.0.3"], 1);

        let files = ConfigEmitter::new(&output, &params).emit(&recs).unwrap();

        assert_eq!(files.replica_configs.len(), 3);
        let main = fs::read_to_string(&files.main_config).unwrap();
        assert_eq!(main.lines().count(), 3);
        assert!(main.lines().all(|l| l.starts_with("replica = ")));

        let nodes = fs::read_to_string(&files.node_directory).unwrap();
        for (line, record) in nodes.lines().zip(&recs) {
            let (_, path) = line.split_once('\t').unwrap();
            let secret = fs::read_to_string(path).unwrap();
            assert!(secret.contains(&format!("privkey = {}\n", record.identity.private_component)));
            assert!(secret.ends_with(&format!("idx = {}\n", record.index())));
        }
    }

    #[test]
    fn test_emit_into_missing_directory() {
        let dir = TempDir::new().unwrap();
        let mut output = output_in(&dir.path().join("missing"));
        let params = ClusterParams::default();
        let recs = records(&["10.0.0.1"], 1);

        let err = ConfigEmitter::new(&output, &params).emit(&recs).unwrap_err();
        assert!(matches!(err, ConfgenError::OutputWrite { .. }));

        output.create_dir = true;
        let files = ConfigEmitter::new(&output, &params).emit(&recs).unwrap();
        assert!(files.node_directory.exists());
    }
}
