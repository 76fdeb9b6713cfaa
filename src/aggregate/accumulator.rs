//! Streaming accumulation of inventory metrics.
//!
//! The [`Accumulator`] consumes resource records one at a time and maintains
//! the raw counters the snapshot is later derived from. Feeding order does
//! not affect totals, only the insertion order of histogram keys.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::record::{as_list_or_none, nonempty_string, ResourceKind, ResourceRecord};

use super::count::CountMap;
use super::network::{
    virtual_interface_healthy, HealthBuckets, DIRECT_CONNECT_CONNECTIONS,
    DIRECT_CONNECT_VIRTUAL_INTERFACES, TRANSIT_GATEWAYS, VPN_CONNECTIONS,
};
use super::status::{PatchCompliance, SsmStatus};

/// Incremental metrics state, updated per record.
///
/// Every record with a non-empty `resourceType` participates in the global
/// type/account/region counters; records of known kinds additionally feed
/// their type-specific counters.
#[derive(Debug, Default)]
pub struct Accumulator {
    // Global distribution counters.
    pub resource_counts: CountMap,
    pub account_counts: CountMap,
    pub account_names: HashMap<String, String>,
    pub region_counts: CountMap,
    pub regions_collected: HashSet<String>,

    // EC2 fleet state.
    pub ec2_total: u64,
    pub ec2_running: u64,
    pub ec2_stopped: u64,
    pub ec2_states: CountMap,
    pub ec2_health: CountMap,
    pub ec2_cw_memory: u64,
    pub ec2_cw_disk: u64,
    pub ec2_cw_both: u64,
    pub ec2_ssm_connected: u64,
    pub ec2_ssm_not_connected: u64,
    pub ec2_ssm_not_installed: u64,
    pub ec2_patch_compliant: u64,
    pub ec2_patch_noncompliant: u64,
    pub ec2_patch_unknown: u64,

    // RDS fleet state.
    pub rds_total: u64,
    pub rds_available: u64,
    pub rds_engines: CountMap,
    pub rds_multi_az: u64,
    pub rds_performance_insights: u64,

    // Storage and backup counters.
    pub s3_total: u64,
    pub s3_with_lifecycle: u64,
    pub efs_total: u64,
    pub fsx_total: u64,
    pub backup_plans: u64,
    pub backup_vaults: u64,
    pub backup_recovery_points: u64,

    // Security groups.
    pub sg_total: u64,
    pub sg_exposed: u64,

    // Topology counters, surfaced only through resource_counts.
    pub vpc_total: u64,
    pub subnet_total: u64,

    // Network endpoint health.
    pub network_health: HealthBuckets,

    // Waste detection.
    pub ebs_unattached: u64,
    pub eip_unassociated: u64,

    seen_ebs: HashSet<(String, String, String)>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all accumulated state, ready for a fresh run.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mark a region as having been collected this run.
    pub fn add_collected_region(&mut self, region: &str) {
        if !region.is_empty() {
            self.regions_collected.insert(region.to_string());
        }
    }

    /// Fold one resource record into the accumulated state.
    ///
    /// Records without a `resourceType` are ignored entirely. Unknown types
    /// still count toward the global type/account/region distributions.
    pub fn add_resource(&mut self, record: &ResourceRecord) {
        let resource_type = match record.resource_type() {
            Some(resource_type) => resource_type,
            None => return,
        };

        self.resource_counts.increment(resource_type);

        if let Some(account_id) = nonempty_string(record.get("accountId")) {
            self.account_counts.increment(&account_id);
            if let Some(account_name) = nonempty_string(record.get("accountName")) {
                self.account_names.insert(account_id, account_name);
            }
        }

        // Global resources (IAM, Route53, ...) are excluded from the
        // per-region distribution.
        if let Some(region) = nonempty_string(record.get("region")) {
            if region != "global" {
                self.region_counts.increment(&region);
            }
        }

        let kind = match record.kind() {
            Some(kind) => kind,
            None => return,
        };

        match kind {
            ResourceKind::Ec2Instance => self.process_ec2(record),
            ResourceKind::RdsInstance => self.process_rds(record),
            ResourceKind::S3Bucket => self.process_s3(record),
            ResourceKind::EbsVolume => self.process_ebs(record),
            ResourceKind::ElasticIp => self.process_eip(record),
            ResourceKind::SecurityGroup => self.process_sg(record),
            ResourceKind::EbsSnapshot | ResourceKind::Ami => self.process_snapshot(record),
            ResourceKind::Vpc => self.vpc_total += 1,
            ResourceKind::Subnet => self.subnet_total += 1,
            ResourceKind::EfsFileSystem => self.efs_total += 1,
            ResourceKind::FsxFileSystem => self.fsx_total += 1,
            ResourceKind::BackupPlan => self.backup_plans += 1,
            ResourceKind::BackupVault => self.backup_vaults += 1,
            ResourceKind::BackupRecoveryPoint => self.backup_recovery_points += 1,
            ResourceKind::DirectConnectConnection
            | ResourceKind::DirectConnectVirtualInterface
            | ResourceKind::VpnConnection
            | ResourceKind::TransitGateway => self.process_network(kind, record),
        }
    }

    // --- Type-specific processors ---

    fn process_network(&mut self, kind: ResourceKind, record: &ResourceRecord) {
        match kind {
            ResourceKind::DirectConnectConnection => {
                let healthy =
                    record.normalized_state("connectionState").as_deref() == Some("available");
                self.network_health.record(DIRECT_CONNECT_CONNECTIONS, healthy);
            }
            ResourceKind::DirectConnectVirtualInterface => {
                let healthy = virtual_interface_healthy(record);
                self.network_health
                    .record(DIRECT_CONNECT_VIRTUAL_INTERFACES, healthy);
            }
            ResourceKind::VpnConnection => {
                let healthy = record.normalized_state("state").as_deref() == Some("available");
                self.network_health.record(VPN_CONNECTIONS, healthy);
            }
            ResourceKind::TransitGateway => {
                let healthy = record.normalized_state("state").as_deref() == Some("available");
                self.network_health.record(TRANSIT_GATEWAYS, healthy);
            }
            _ => {}
        }
    }

    fn process_ec2(&mut self, record: &ResourceRecord) {
        self.ec2_total += 1;

        let state = record
            .normalized_state("instanceState")
            .unwrap_or_else(|| "unknown".to_string());
        self.ec2_states.increment(&state);

        if state == "running" {
            self.ec2_running += 1;

            // Agent coverage is only meaningful while the instance runs.
            let has_memory = record.truthy("cwAgentMemoryDetected");
            let has_disk = record.truthy("cwAgentDiskDetected");
            if has_memory {
                self.ec2_cw_memory += 1;
            }
            if has_disk {
                self.ec2_cw_disk += 1;
            }
            if has_memory && has_disk {
                self.ec2_cw_both += 1;
            }

            match SsmStatus::classify(record.str_field("ssmStatus")) {
                SsmStatus::Connected => self.ec2_ssm_connected += 1,
                SsmStatus::NotConnected => self.ec2_ssm_not_connected += 1,
                SsmStatus::NotInstalled => self.ec2_ssm_not_installed += 1,
            }
        } else if state == "stopped" {
            self.ec2_stopped += 1;
        }

        let health = histogram_key(record.get("healthStatus"), "Unknown");
        self.ec2_health.increment(&health);

        match PatchCompliance::classify(record.str_field("patchCompliance")) {
            PatchCompliance::Compliant => self.ec2_patch_compliant += 1,
            PatchCompliance::NonCompliant => self.ec2_patch_noncompliant += 1,
            PatchCompliance::Unknown => self.ec2_patch_unknown += 1,
        }
    }

    fn process_rds(&mut self, record: &ResourceRecord) {
        self.rds_total += 1;

        if record.normalized_state("status").as_deref() == Some("available") {
            self.rds_available += 1;
        }

        let engine = histogram_key(record.get("engine"), "unknown");
        self.rds_engines.increment(&engine);

        if record.truthy("multiAZ") {
            self.rds_multi_az += 1;
        }
        if record.truthy("performanceInsightsEnabled") {
            self.rds_performance_insights += 1;
        }
    }

    fn process_s3(&mut self, record: &ResourceRecord) {
        self.s3_total += 1;
        if record.truthy("hasLifecycleRules") {
            self.s3_with_lifecycle += 1;
        }
    }

    /// Unattached-volume detection. Counts only on strong evidence: an
    /// explicit `available` state, or no state at all combined with a
    /// known-empty attachment list. Conflicting signals never count.
    fn process_ebs(&mut self, record: &ResourceRecord) {
        let volume_id = nonempty_string(record.get("volumeId"))
            .or_else(|| nonempty_string(record.get("id")))
            .unwrap_or_else(|| "unknown".to_string());
        let account = nonempty_string(record.get("accountId"))
            .unwrap_or_else(|| "unknown".to_string());
        let region = nonempty_string(record.get("region"))
            .unwrap_or_else(|| "unknown".to_string());

        // Collectors in overlapping scopes can report the same volume twice.
        if !self.seen_ebs.insert((account, region, volume_id)) {
            return;
        }

        let state = ["status", "state", "volumeStatus", "volumeState"]
            .into_iter()
            .find_map(|key| record.normalized_state(key));

        match state.as_deref() {
            Some("available") => self.ebs_unattached += 1,
            Some("in-use" | "in_use") => {}
            Some(_) => {}
            None => {
                if attachments_list(record).is_some_and(|a| a.is_empty()) {
                    self.ebs_unattached += 1;
                }
            }
        }
    }

    fn process_eip(&mut self, record: &ResourceRecord) {
        if !record.truthy("instanceId") && !record.truthy("networkInterfaceId") {
            self.eip_unassociated += 1;
        }
    }

    fn process_sg(&mut self, record: &ResourceRecord) {
        self.sg_total += 1;
        if record.truthy("hasExposedIngressPorts") {
            self.sg_exposed += 1;
        }
    }

    fn process_snapshot(&mut self, _record: &ResourceRecord) {
        // Orphan detection would need cross-referencing against live volumes
        // and images; snapshots currently only count through resource_counts.
    }
}

// --- Field classification helpers ---

/// Histogram key for a free-form classification field: absent values take
/// `missing`, null becomes `"unknown"`, scalars are stringified verbatim.
fn histogram_key(value: Option<&Value>, missing: &str) -> String {
    match value {
        None => missing.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) => "unknown".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(_) | Value::Object(_)) => missing.to_string(),
    }
}

/// Attachment list from the first attachment-bearing field present on the
/// record, normalized through [`as_list_or_none`].
fn attachments_list(record: &ResourceRecord) -> Option<Vec<Value>> {
    for key in ["attachments", "attachedInstances", "attached_instances"] {
        match record.get(key) {
            None | Some(Value::Null) => continue,
            Some(value) => return as_list_or_none(value),
        }
    }
    None
}
