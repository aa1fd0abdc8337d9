//! Replica endpoint planning
//!
//! Expands an address list into the ordered replica endpoints of a cluster.
//! Enumeration is address-major: every replica offset of the first address is
//! emitted before moving on to the next address, and a replica's index is its
//! position in that order.

use crate::error::{ConfgenError, Result};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Network identity of one replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaEndpoint {
    pub index: usize,
    pub address: String,
    pub peer_port: u16,
    pub client_port: u16,
}

impl fmt::Display for ReplicaEndpoint {
    /// `<address>:<peer_port>;<client_port>`, the form used in the shared config
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{};{}", self.address, self.peer_port, self.client_port)
    }
}

/// Plan `addresses.len() * replicas_per_address` endpoints.
///
/// Replica offset `i` on any address gets `base_peer_port + i` and
/// `base_client_port + i`. Repeated addresses are allowed but produce
/// colliding ports when `replicas_per_address > 1`.
pub fn plan_endpoints(
    addresses: &[String],
    replicas_per_address: usize,
    base_peer_port: u16,
    base_client_port: u16,
) -> Result<Vec<ReplicaEndpoint>> {
    if addresses.is_empty() {
        return Err(ConfgenError::Input("address list is empty".into()));
    }
    if replicas_per_address == 0 {
        return Err(ConfgenError::Input(
            "replicas per address must be at least 1".into(),
        ));
    }

    let last_offset = replicas_per_address - 1;
    let peer_ports = port_range(base_peer_port, last_offset, "peer")?;
    let client_ports = port_range(base_client_port, last_offset, "client")?;

    let mut seen = HashSet::new();
    for address in addresses {
        if !seen.insert(address.as_str()) && replicas_per_address > 1 {
            warn!(
                "Address {} is listed more than once; its replicas will share ports",
                address
            );
        }
    }

    let (peer_ports, client_ports) = (&peer_ports, &client_ports);
    let endpoints: Vec<ReplicaEndpoint> = addresses
        .iter()
        .flat_map(move |address| {
            peer_ports
                .iter()
                .zip(client_ports.iter())
                .map(move |(&peer_port, &client_port)| (address, peer_port, client_port))
        })
        .enumerate()
        .map(|(index, (address, peer_port, client_port))| ReplicaEndpoint {
            index,
            address: address.clone(),
            peer_port,
            client_port,
        })
        .collect();

    debug!(
        "Planned {} endpoints ({} addresses x {} replicas)",
        endpoints.len(),
        addresses.len(),
        replicas_per_address
    );
    Ok(endpoints)
}

fn port_range(base: u16, last_offset: usize, kind: &str) -> Result<Vec<u16>> {
    let last = u16::try_from(last_offset)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or_else(|| {
            ConfgenError::Input(format!(
                "{} ports starting at {} overflow with {} replicas per address",
                kind,
                base,
                last_offset + 1
            ))
        })?;
    Ok((base..=last).collect())
}
