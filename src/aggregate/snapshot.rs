//! Point-in-time snapshot derived from accumulated state.
//!
//! The snapshot carries the exact field names the downstream dashboard
//! reads, so every serialized key here is part of the output contract.
//! Percentages are integer values computed with [`safe_pct`].

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::record::ResourceKind;

use super::accumulator::Accumulator;
use super::count::CountMap;
use super::network::HealthBuckets;

/// Integer percentage of `numerator` over `denominator`, 0 when the
/// denominator is 0. Ties round to the nearest even value.
pub fn safe_pct(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    ((numerator as f64 / denominator as f64) * 100.0).round_ties_even() as u64
}

/// Complete metrics snapshot for one run.
///
/// The `ec2` and `rds` sections are omitted from serialized output when no
/// such resources were seen; all other sections are always present.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub global: GlobalMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec2: Option<Ec2Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rds: Option<RdsMetrics>,
    pub storage: StorageMetrics,
    pub unattached: UnattachedMetrics,
    pub security: SecurityMetrics,
    pub network: NetworkHealthSummary,
}

/// Cross-type distribution metrics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMetrics {
    pub total_resources: u64,
    pub resource_counts: CountMap,
    pub account_distribution: Vec<AccountShare>,
    pub region_distribution: Vec<RegionShare>,
    pub regions_collected: u64,
    pub resource_regions_found: u64,
    pub network_health: NetworkHealthSummary,
}

/// One account's share of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountShare {
    pub account_id: String,
    pub account_name: String,
    pub count: u64,
}

/// One region's share of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionShare {
    pub region: String,
    pub count: u64,
}

/// EC2 fleet metrics, present when at least one instance was seen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2Metrics {
    pub total: u64,
    pub by_state: CountMap,
    pub health_status: CountMap,
    pub cloudwatch_agent: CloudwatchAgentMetrics,
    pub ssm_agent: SsmAgentMetrics,
    pub patch_compliance: PatchComplianceMetrics,
}

/// CloudWatch agent coverage over running instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudwatchAgentMetrics {
    pub memory_monitoring: u64,
    pub disk_monitoring: u64,
    pub both_enabled: u64,
    pub none_enabled: u64,
    pub percentage_with_memory: u64,
    pub percentage_with_disk: u64,
}

/// SSM agent connectivity over running instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsmAgentMetrics {
    pub connected: u64,
    pub not_connected: u64,
    pub not_installed: u64,
    pub percentage_connected: u64,
}

/// Patch compliance over the whole EC2 fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchComplianceMetrics {
    pub compliant: u64,
    pub non_compliant: u64,
    pub unknown: u64,
    pub percentage_compliant: u64,
}

/// RDS fleet metrics, present when at least one instance was seen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RdsMetrics {
    pub total: u64,
    pub available: u64,
    pub engines: CountMap,
    #[serde(rename = "multiAZ")]
    pub multi_az: u64,
    pub performance_insights: u64,
    #[serde(rename = "percentageMultiAZ")]
    pub percentage_multi_az: u64,
    pub percentage_with_perf_insights: u64,
}

/// Storage and backup inventory counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMetrics {
    pub s3_buckets: u64,
    pub s3_with_lifecycle: u64,
    pub s3_without_lifecycle: u64,
    pub ebs_volumes: u64,
    pub ebs_snapshots: u64,
    pub ami_snapshots: u64,
    pub efs_file_systems: u64,
    pub fsx_file_systems: u64,
    pub backup_plans: u64,
    pub backup_vaults: u64,
    pub backup_recovery_points: u64,
}

/// Waste indicators for resources billed while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnattachedMetrics {
    #[serde(rename = "unattachedEBSVolumes")]
    pub unattached_ebs_volumes: u64,
    #[serde(rename = "unassociatedElasticIPs")]
    pub unassociated_elastic_ips: u64,
}

/// Security group exposure metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetrics {
    pub security_groups: u64,
    pub exposed_security_groups: u64,
    pub percentage_exposed: u64,
}

/// Per-class network health with derived unhealthy counts and percentages,
/// in bucket order.
#[derive(Debug, Clone)]
pub struct NetworkHealthSummary {
    entries: Vec<(String, HealthSummary)>,
}

/// Derived health figures for one network resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub total: u64,
    pub healthy: u64,
    pub unhealthy: u64,
    pub healthy_percentage: u64,
}

impl NetworkHealthSummary {
    pub fn from_buckets(buckets: &HealthBuckets) -> Self {
        let entries = buckets
            .iter()
            .map(|(class, bucket)| {
                let summary = HealthSummary {
                    total: bucket.total,
                    healthy: bucket.healthy,
                    unhealthy: bucket.total.saturating_sub(bucket.healthy),
                    healthy_percentage: safe_pct(bucket.healthy, bucket.total),
                };
                (class.to_string(), summary)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, class: &str) -> Option<&HealthSummary> {
        self.entries
            .iter()
            .find(|(key, _)| key == class)
            .map(|(_, summary)| summary)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HealthSummary)> {
        self.entries.iter().map(|(key, summary)| (key.as_str(), summary))
    }
}

impl Serialize for NetworkHealthSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (class, summary) in &self.entries {
            map.serialize_entry(class, summary)?;
        }
        map.end()
    }
}

impl Accumulator {
    /// Derive the dashboard-facing snapshot from the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let network = NetworkHealthSummary::from_buckets(&self.network_health);

        let account_distribution = self
            .account_counts
            .sorted_desc()
            .into_iter()
            .map(|(account_id, count)| AccountShare {
                account_id: account_id.to_string(),
                account_name: self
                    .account_names
                    .get(account_id)
                    .cloned()
                    .unwrap_or_else(|| account_id.to_string()),
                count,
            })
            .collect();

        let region_distribution = self
            .region_counts
            .sorted_desc()
            .into_iter()
            .map(|(region, count)| RegionShare {
                region: region.to_string(),
                count,
            })
            .collect();

        let global = GlobalMetrics {
            total_resources: self.resource_counts.total(),
            resource_counts: self.resource_counts.clone(),
            account_distribution,
            region_distribution,
            regions_collected: self.regions_collected.len() as u64,
            resource_regions_found: self.region_counts.len() as u64,
            network_health: network.clone(),
        };

        let ec2 = (self.ec2_total > 0).then(|| Ec2Metrics {
            total: self.ec2_total,
            by_state: self.ec2_states.clone(),
            health_status: self.ec2_health.clone(),
            cloudwatch_agent: CloudwatchAgentMetrics {
                memory_monitoring: self.ec2_cw_memory,
                disk_monitoring: self.ec2_cw_disk,
                both_enabled: self.ec2_cw_both,
                none_enabled: self
                    .ec2_running
                    .saturating_sub(self.ec2_cw_memory.max(self.ec2_cw_disk)),
                percentage_with_memory: safe_pct(self.ec2_cw_memory, self.ec2_running),
                percentage_with_disk: safe_pct(self.ec2_cw_disk, self.ec2_running),
            },
            ssm_agent: SsmAgentMetrics {
                connected: self.ec2_ssm_connected,
                not_connected: self.ec2_ssm_not_connected,
                not_installed: self.ec2_ssm_not_installed,
                percentage_connected: safe_pct(self.ec2_ssm_connected, self.ec2_running),
            },
            patch_compliance: PatchComplianceMetrics {
                compliant: self.ec2_patch_compliant,
                non_compliant: self.ec2_patch_noncompliant,
                unknown: self.ec2_patch_unknown,
                percentage_compliant: safe_pct(self.ec2_patch_compliant, self.ec2_total),
            },
        });

        let rds = (self.rds_total > 0).then(|| RdsMetrics {
            total: self.rds_total,
            available: self.rds_available,
            engines: self.rds_engines.clone(),
            multi_az: self.rds_multi_az,
            performance_insights: self.rds_performance_insights,
            percentage_multi_az: safe_pct(self.rds_multi_az, self.rds_total),
            percentage_with_perf_insights: safe_pct(
                self.rds_performance_insights,
                self.rds_total,
            ),
        });

        let storage = StorageMetrics {
            s3_buckets: self.s3_total,
            s3_with_lifecycle: self.s3_with_lifecycle,
            s3_without_lifecycle: self.s3_total.saturating_sub(self.s3_with_lifecycle),
            ebs_volumes: self.resource_counts.get(ResourceKind::EbsVolume.as_str()),
            ebs_snapshots: self.resource_counts.get(ResourceKind::EbsSnapshot.as_str()),
            ami_snapshots: self.resource_counts.get(ResourceKind::Ami.as_str()),
            efs_file_systems: self.efs_total,
            fsx_file_systems: self.fsx_total,
            backup_plans: self.backup_plans,
            backup_vaults: self.backup_vaults,
            backup_recovery_points: self.backup_recovery_points,
        };

        let unattached = UnattachedMetrics {
            unattached_ebs_volumes: self.ebs_unattached,
            unassociated_elastic_ips: self.eip_unassociated,
        };

        let security = SecurityMetrics {
            security_groups: self.sg_total,
            exposed_security_groups: self.sg_exposed,
            percentage_exposed: safe_pct(self.sg_exposed, self.sg_total),
        };

        MetricsSnapshot {
            global,
            ec2,
            rds,
            storage,
            unattached,
            security,
            network,
        }
    }
}
