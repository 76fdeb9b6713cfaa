//! Network resource health tracking.
//!
//! Each tracked class keeps a {total, healthy} pair; derived values
//! (unhealthy, percentage) are computed at snapshot time. Direct Connect
//! virtual interfaces carry several generations of BGP signal, evaluated in
//! strict priority order.

use serde_json::Value;

use crate::record::{normalize_state, ResourceRecord};

/// Health bucket key for Direct Connect connections.
pub const DIRECT_CONNECT_CONNECTIONS: &str = "directConnectConnections";
/// Health bucket key for Direct Connect virtual interfaces.
pub const DIRECT_CONNECT_VIRTUAL_INTERFACES: &str = "directConnectVirtualInterfaces";
/// Health bucket key for site-to-site VPN connections.
pub const VPN_CONNECTIONS: &str = "vpnConnections";
/// Health bucket key for transit gateways.
pub const TRANSIT_GATEWAYS: &str = "transitGateways";

/// Classes tracked from the start of every run, in output order.
pub const SEEDED_CLASSES: &[&str] = &[
    DIRECT_CONNECT_CONNECTIONS,
    DIRECT_CONNECT_VIRTUAL_INTERFACES,
    VPN_CONNECTIONS,
    TRANSIT_GATEWAYS,
];

/// Raw {total, healthy} counter pair for one network resource class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthBucket {
    pub total: u64,
    pub healthy: u64,
}

/// Ordered health buckets, pre-seeded with the tracked classes and
/// extensible to new classes encountered at runtime.
#[derive(Debug, Clone)]
pub struct HealthBuckets {
    entries: Vec<(String, HealthBucket)>,
}

impl HealthBuckets {
    pub fn new() -> Self {
        Self {
            entries: SEEDED_CLASSES
                .iter()
                .map(|class| (class.to_string(), HealthBucket::default()))
                .collect(),
        }
    }

    /// Count one resource of `class`, healthy or not.
    pub fn record(&mut self, class: &str, healthy: bool) {
        let bucket = match self.entries.iter_mut().find(|(key, _)| key == class) {
            Some((_, bucket)) => bucket,
            None => {
                self.entries.push((class.to_string(), HealthBucket::default()));
                // Just pushed, so last_mut always yields the new bucket.
                match self.entries.last_mut() {
                    Some((_, bucket)) => bucket,
                    None => return,
                }
            }
        };

        bucket.total += 1;
        if healthy {
            bucket.healthy += 1;
        }
    }

    pub fn get(&self, class: &str) -> Option<HealthBucket> {
        self.entries
            .iter()
            .find(|(key, _)| key == class)
            .map(|(_, bucket)| *bucket)
    }

    /// Iterate `(class, bucket)` in seed-then-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, HealthBucket)> {
        self.entries.iter().map(|(key, bucket)| (key.as_str(), *bucket))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HealthBuckets {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate Direct Connect virtual interface health from BGP signals.
///
/// Priority order: an explicit `bgpAllUp` boolean wins outright, then
/// `bgpAnyUp`, then the first non-empty of the `bgpStatus` /
/// `bgpStatusIpv4` / `bgpStatusIpv6` strings (healthy iff `up`), then a
/// per-peer scan where any healthy peer suffices. A peer whose status is
/// present but not `up` is skipped, not disqualifying; a peer without a
/// status falls back to its `bgpPeerState` (healthy iff `available`).
/// No signal at all means unhealthy.
pub fn virtual_interface_healthy(record: &ResourceRecord) -> bool {
    if let Some(Value::Bool(all_up)) = record.get("bgpAllUp") {
        return *all_up;
    }

    if let Some(Value::Bool(any_up)) = record.get("bgpAnyUp") {
        return *any_up;
    }

    for key in ["bgpStatus", "bgpStatusIpv4", "bgpStatusIpv6"] {
        if let Some(status) = record.normalized_state(key) {
            return status == "up";
        }
    }

    let peers = match record.get("bgpPeers") {
        Some(Value::Array(peers)) => peers.as_slice(),
        _ => &[],
    };

    for peer in peers {
        let peer = match peer {
            Value::Object(fields) => fields,
            _ => continue,
        };

        if let Some(status) = normalize_state(peer.get("bgpStatus")) {
            if status == "up" {
                return true;
            }
            continue;
        }

        if normalize_state(peer.get("bgpPeerState")).as_deref() == Some("available") {
            return true;
        }
    }

    false
}
