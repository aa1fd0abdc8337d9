//! Deployment configuration generator for consensus replica fleets.
//!
//! Plans replica endpoints from a list of host addresses, pairs each replica
//! with identity and TLS key material produced by external generators, and
//! writes a shared cluster config, one secret config per replica and a node
//! directory.

pub mod config;
pub mod emitter;
pub mod error;
pub mod generate;
pub mod keys;
pub mod planner;

pub use config::{AddressSource, ClusterParams, ClusterSpec, OutputConfig, ToolConfig};
pub use emitter::{ConfigEmitter, EmittedFiles, ReplicaRecord};
pub use error::{ConfgenError, Phase, Result, ToolKind};
pub use generate::{generate, plan, GenerationReport};
pub use keys::{
    CannedKeyMaterial, ExternalKeygen, IdentityKeyPair, KeyMaterialProvider, TlsKeyPair,
};
pub use planner::{plan_endpoints, ReplicaEndpoint};
