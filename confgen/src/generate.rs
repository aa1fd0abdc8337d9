//! End-to-end generation run: plan, fetch keys, validate, emit

use crate::config::ClusterSpec;
use crate::emitter::{ConfigEmitter, EmittedFiles, ReplicaRecord};
use crate::error::Result;
use crate::keys::KeyMaterialProvider;
use crate::planner::{plan_endpoints, ReplicaEndpoint};
use std::fmt;
use tracing::info;

/// Outcome of a successful run
#[derive(Debug)]
pub struct GenerationReport {
    pub replicas: usize,
    pub files: EmittedFiles,
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Replicas: {}", self.replicas)?;
        writeln!(f, "Cluster config: {}", self.files.main_config.display())?;
        writeln!(f, "Node directory: {}", self.files.node_directory.display())?;
        if let (Some(first), Some(last)) =
            (self.files.replica_configs.first(), self.files.replica_configs.last())
        {
            writeln!(f, "Replica configs: {} .. {}", first.display(), last.display())?;
        }
        Ok(())
    }
}

/// Resolve the address source and plan every replica endpoint
pub fn plan(spec: &ClusterSpec) -> Result<Vec<ReplicaEndpoint>> {
    let addresses = spec.address_source()?.resolve()?;
    plan_endpoints(
        &addresses,
        spec.replicas_per_address,
        spec.peer_port,
        spec.client_port,
    )
}

/// Run the whole pipeline. Nothing is written unless planning and both key
/// batches succeed and the key counts match the endpoint count.
pub fn generate(spec: &ClusterSpec, keys: &dyn KeyMaterialProvider) -> Result<GenerationReport> {
    let endpoints = plan(spec)?;
    let n = endpoints.len();
    info!("Planned {} replicas", n);

    let identity = keys.generate_identity_keys(n)?;
    let tls = keys.generate_tls_keys(n)?;
    let records = ReplicaRecord::join(endpoints, identity, tls)?;

    let files = ConfigEmitter::new(&spec.output, &spec.params).emit(&records)?;
    Ok(GenerationReport { replicas: n, files })
}
