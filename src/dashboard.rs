//! Dashboard item assembly and persistence.
//!
//! Turns a [`MetricsSnapshot`] into the two flat items the dashboard reads:
//! a fixed-id current item that is overwritten every run, and a dated archive
//! copy keyed by run date. Both carry the same flattened metric keys.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::MetricsSnapshot;
use crate::flatten::{flatten_into, sanitize_flat_key};
use crate::store::{BatchWrite, Item};

/// Fixed id of the item holding the latest metrics.
pub const CURRENT_ITEM_ID: &str = "METRIC_DASHBOARD_CURRENT";

/// Resource type tag distinguishing dashboard items from inventory records.
pub const DASHBOARD_RESOURCE_TYPE: &str = "METRICS_DASHBOARD";

/// The item pair produced by one run.
#[derive(Debug, Clone)]
pub struct DashboardItems {
    pub current: Item,
    pub dated: Item,
}

/// Assemble the current and dated dashboard items from a snapshot.
///
/// Key insertion order is part of the output contract: identification and
/// bookkeeping fields first, then the raw distribution arrays, then the
/// flattened metric keys section by section.
pub fn build_items(
    snapshot: &MetricsSnapshot,
    now: DateTime<Utc>,
    processing_duration: Duration,
) -> Result<DashboardItems> {
    let date_iso = now.format("%Y-%m-%d").to_string();
    let date_key = now.format("%d_%m_%Y").to_string();
    let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

    let mut current = Item::new();
    current.insert("id".to_string(), CURRENT_ITEM_ID.into());
    current.insert("resourceType".to_string(), DASHBOARD_RESOURCE_TYPE.into());
    current.insert("accountId".to_string(), "GLOBAL".into());
    current.insert("accountName".to_string(), "Metrics Dashboard".into());
    current.insert("region".to_string(), "global".into());
    current.insert("metricDate".to_string(), date_iso.into());
    current.insert("metricDateKey".to_string(), date_key.clone().into());
    current.insert("isMetric".to_string(), true.into());
    current.insert("createdAt".to_string(), timestamp.clone().into());
    current.insert("updatedAt".to_string(), timestamp.into());
    current.insert(
        "processingDurationSeconds".to_string(),
        rounded_seconds(processing_duration).into(),
    );

    let global = section_map(&snapshot.global)?;

    // Distribution arrays stay nested; the dashboard renders them directly.
    for key in ["accountDistribution", "regionDistribution"] {
        let value = global.get(key).cloned().unwrap_or(Value::Array(Vec::new()));
        current.insert(key.to_string(), value);
    }

    let mut global_summary = Item::new();
    for key in [
        "totalResources",
        "resourceCounts",
        "regionsCollected",
        "resourceRegionsFound",
        "networkHealth",
    ] {
        if let Some(value) = global.get(key) {
            global_summary.insert(key.to_string(), value.clone());
        }
    }
    flatten_into(&mut current, &global_summary, "");

    if let Some(ec2) = &snapshot.ec2 {
        let section = section_map(ec2)?;

        // Raw histogram maps kept alongside the flattened keys for chart
        // consumers.
        for (item_key, section_key) in [("ec2_byState", "byState"), ("ec2_healthStatus", "healthStatus")]
        {
            let value = section
                .get(section_key)
                .cloned()
                .unwrap_or(Value::Object(Item::new()));
            current.insert(item_key.to_string(), value);
        }

        // The ssm_* names are legacy; the values come from patch compliance.
        current.insert(
            "ec2_ssm_compliant".to_string(),
            ec2.patch_compliance.compliant.into(),
        );
        current.insert(
            "ec2_ssm_not_compliant".to_string(),
            ec2.patch_compliance.non_compliant.into(),
        );
        current.insert(
            "ec2_ssm_unknown".to_string(),
            ec2.patch_compliance.unknown.into(),
        );

        flatten_into(&mut current, &section, "ec2");
    }

    if let Some(rds) = &snapshot.rds {
        let section = section_map(rds)?;
        let engines = section
            .get("engines")
            .cloned()
            .unwrap_or(Value::Object(Item::new()));
        current.insert("rds_engines".to_string(), engines);
        flatten_into(&mut current, &section, "rds");
    }

    flatten_into(&mut current, &section_map(&snapshot.storage)?, "storage");
    flatten_into(&mut current, &section_map(&snapshot.unattached)?, "unattached");
    flatten_into(&mut current, &section_map(&snapshot.security)?, "security");

    // Per-class health keys are written again from the source section; the
    // values match the global flatten, so existing keys keep their position.
    if let Some(Value::Object(classes)) = global.get("networkHealth") {
        for (class, values) in classes {
            let values = match values {
                Value::Object(map) => map,
                _ => continue,
            };
            let class_key = sanitize_flat_key(class);
            for (name, value) in values {
                let key = format!("networkHealth_{class_key}_{}", sanitize_flat_key(name));
                current.insert(key, value.clone());
            }
        }
    }

    let mut dated = current.clone();
    dated.insert(
        "id".to_string(),
        format!("METRICS_DASHBOARD_{date_key}").into(),
    );
    dated.insert("isLatest".to_string(), false.into());
    dated.insert("isArchive".to_string(), true.into());

    Ok(DashboardItems { current, dated })
}

/// Write both items to every configured table.
///
/// A failing table is logged and skipped so the remaining tables still
/// receive the batch. Returns the count reported by the most recent
/// successful table, zero when every table failed.
pub async fn save_items<S: BatchWrite>(
    store: &S,
    tables: &[String],
    items: &DashboardItems,
) -> usize {
    let batch = [items.current.clone(), items.dated.clone()];

    let mut total_saved = 0;
    for table in tables {
        match store.write_batch(table, &batch).await {
            Ok(count) => {
                total_saved = count;
                tracing::info!(table, items = batch.len(), "saved metric items");
            }
            Err(err) => {
                tracing::error!(table, error = ?err, "saving metric items failed");
            }
        }
    }

    total_saved
}

/// Duration in seconds, rounded to millisecond precision.
fn rounded_seconds(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round_ties_even() / 1000.0
}

fn section_map<T: Serialize>(section: &T) -> Result<Item> {
    match serde_json::to_value(section)? {
        Value::Object(map) => Ok(map),
        _ => bail!("metrics section did not serialize to an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Accumulator;
    use serde_json::json;
    use std::sync::Mutex;

    fn feed(acc: &mut Accumulator, value: Value) {
        let record = crate::record::ResourceRecord::from_value(value).expect("test record");
        acc.add_resource(&record);
    }

    fn test_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-25T14:30:05.250Z")
            .expect("test timestamp")
            .with_timezone(&Utc)
    }

    fn sample_snapshot() -> MetricsSnapshot {
        let mut acc = Accumulator::new();
        acc.add_collected_region("us-east-1");
        acc.add_collected_region("eu-west-1");
        feed(
            &mut acc,
            json!({
                "resourceType": "EC2Instance",
                "accountId": "111",
                "accountName": "production",
                "region": "us-east-1",
                "instanceState": "running",
                "cwAgentMemoryDetected": true,
                "ssmStatus": "connected",
                "patchCompliance": "compliant",
                "healthStatus": "ok"
            }),
        );
        feed(
            &mut acc,
            json!({
                "resourceType": "RDSInstance",
                "accountId": "111",
                "region": "us-east-1",
                "status": "available",
                "engine": "postgres",
                "multiAZ": true
            }),
        );
        feed(
            &mut acc,
            json!({
                "resourceType": "VPNConnection",
                "accountId": "222",
                "region": "eu-west-1",
                "state": "available"
            }),
        );
        feed(
            &mut acc,
            json!({
                "resourceType": "S3Bucket",
                "accountId": "222",
                "region": "us-east-1",
                "hasLifecycleRules": true
            }),
        );
        acc.snapshot()
    }

    fn build(snapshot: &MetricsSnapshot) -> DashboardItems {
        build_items(snapshot, test_now(), Duration::from_secs_f64(1.2345)).expect("build items")
    }

    #[test]
    fn test_current_item_header_fields() {
        let items = build(&sample_snapshot());
        let current = &items.current;

        assert_eq!(current.get("id"), Some(&json!("METRIC_DASHBOARD_CURRENT")));
        assert_eq!(current.get("resourceType"), Some(&json!("METRICS_DASHBOARD")));
        assert_eq!(current.get("accountId"), Some(&json!("GLOBAL")));
        assert_eq!(current.get("accountName"), Some(&json!("Metrics Dashboard")));
        assert_eq!(current.get("region"), Some(&json!("global")));
        assert_eq!(current.get("metricDate"), Some(&json!("2026-08-25")));
        assert_eq!(current.get("metricDateKey"), Some(&json!("25_08_2026")));
        assert_eq!(current.get("isMetric"), Some(&json!(true)));
        assert_eq!(
            current.get("createdAt"),
            Some(&json!("2026-08-25T14:30:05.250Z"))
        );
        assert_eq!(current.get("updatedAt"), current.get("createdAt"));
        assert_eq!(
            current.get("processingDurationSeconds"),
            Some(&json!(1.234))
        );
    }

    #[test]
    fn test_header_key_order() {
        let items = build(&sample_snapshot());
        let keys: Vec<&str> = items.current.keys().map(String::as_str).collect();

        assert_eq!(
            &keys[..14],
            &[
                "id",
                "resourceType",
                "accountId",
                "accountName",
                "region",
                "metricDate",
                "metricDateKey",
                "isMetric",
                "createdAt",
                "updatedAt",
                "processingDurationSeconds",
                "accountDistribution",
                "regionDistribution",
                "totalResources",
            ]
        );
    }

    #[test]
    fn test_global_keys_flattened() {
        let items = build(&sample_snapshot());
        let current = &items.current;

        assert_eq!(current.get("totalResources"), Some(&json!(4)));
        assert_eq!(current.get("resourceCounts_EC2Instance"), Some(&json!(1)));
        assert_eq!(current.get("resourceCounts_S3Bucket"), Some(&json!(1)));
        assert_eq!(current.get("regionsCollected"), Some(&json!(2)));
        assert_eq!(current.get("resourceRegionsFound"), Some(&json!(2)));
        assert_eq!(
            current.get("networkHealth_vpnConnections_total"),
            Some(&json!(1))
        );
        assert_eq!(
            current.get("networkHealth_vpnConnections_healthyPercentage"),
            Some(&json!(100))
        );

        let accounts = current
            .get("accountDistribution")
            .and_then(Value::as_array)
            .expect("account distribution array");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].get("accountId"), Some(&json!("111")));
        assert_eq!(accounts[0].get("accountName"), Some(&json!("production")));
        assert_eq!(accounts[0].get("count"), Some(&json!(2)));
    }

    #[test]
    fn test_ec2_raw_maps_and_flattened_keys() {
        let items = build(&sample_snapshot());
        let current = &items.current;

        assert_eq!(current.get("ec2_byState"), Some(&json!({"running": 1})));
        assert_eq!(current.get("ec2_healthStatus"), Some(&json!({"ok": 1})));

        assert_eq!(current.get("ec2_ssm_compliant"), Some(&json!(1)));
        assert_eq!(current.get("ec2_ssm_not_compliant"), Some(&json!(0)));
        assert_eq!(current.get("ec2_ssm_unknown"), Some(&json!(0)));

        assert_eq!(current.get("ec2_total"), Some(&json!(1)));
        assert_eq!(current.get("ec2_byState_running"), Some(&json!(1)));
        assert_eq!(
            current.get("ec2_cloudwatchAgent_memoryMonitoring"),
            Some(&json!(1))
        );
        assert_eq!(current.get("ec2_ssmAgent_connected"), Some(&json!(1)));
        assert_eq!(
            current.get("ec2_patchCompliance_percentageCompliant"),
            Some(&json!(100))
        );
    }

    #[test]
    fn test_rds_raw_engines_and_flattened_keys() {
        let items = build(&sample_snapshot());
        let current = &items.current;

        assert_eq!(current.get("rds_engines"), Some(&json!({"postgres": 1})));
        assert_eq!(current.get("rds_total"), Some(&json!(1)));
        assert_eq!(current.get("rds_engines_postgres"), Some(&json!(1)));
        assert_eq!(current.get("rds_multiAZ"), Some(&json!(1)));
        assert_eq!(current.get("rds_percentageMultiAZ"), Some(&json!(100)));
    }

    #[test]
    fn test_fleet_sections_absent_when_empty() {
        let mut acc = Accumulator::new();
        feed(
            &mut acc,
            json!({"resourceType": "S3Bucket", "accountId": "1", "region": "us-east-1"}),
        );
        let items = build(&acc.snapshot());
        let current = &items.current;

        assert!(current.get("ec2_total").is_none());
        assert!(current.get("ec2_byState").is_none());
        assert!(current.get("rds_total").is_none());
        assert!(current.get("rds_engines").is_none());

        assert_eq!(current.get("storage_s3Buckets"), Some(&json!(1)));
        assert_eq!(current.get("unattached_unattachedEBSVolumes"), Some(&json!(0)));
        assert_eq!(current.get("security_securityGroups"), Some(&json!(0)));
    }

    #[test]
    fn test_dated_item_mirrors_current() {
        let items = build(&sample_snapshot());
        let DashboardItems { current, dated } = items;

        assert_eq!(
            dated.get("id"),
            Some(&json!("METRICS_DASHBOARD_25_08_2026"))
        );
        assert_eq!(dated.get("isLatest"), Some(&json!(false)));
        assert_eq!(dated.get("isArchive"), Some(&json!(true)));
        assert_eq!(dated.len(), current.len() + 2);

        // The replacement id keeps its original slot.
        assert_eq!(dated.keys().next().map(String::as_str), Some("id"));
        let last_two: Vec<&str> = dated.keys().rev().take(2).map(String::as_str).collect();
        assert_eq!(last_two, ["isArchive", "isLatest"]);

        for (key, value) in &current {
            if key == "id" {
                continue;
            }
            assert_eq!(dated.get(key), Some(value), "key {key} diverged");
        }
    }

    struct RecordingStore {
        fail_table: Option<&'static str>,
        written: Mutex<Vec<(String, usize)>>,
    }

    impl RecordingStore {
        fn new(fail_table: Option<&'static str>) -> Self {
            Self {
                fail_table,
                written: Mutex::new(Vec::new()),
            }
        }
    }

    impl BatchWrite for RecordingStore {
        async fn write_batch(&self, table: &str, items: &[Item]) -> Result<usize> {
            if self.fail_table == Some(table) {
                bail!("table offline");
            }
            self.written
                .lock()
                .expect("lock")
                .push((table.to_string(), items.len()));
            Ok(items.len())
        }
    }

    #[tokio::test]
    async fn test_save_items_writes_every_table() {
        let items = build(&sample_snapshot());
        let store = RecordingStore::new(None);
        let tables = vec!["metrics".to_string(), "metrics_history".to_string()];

        let saved = save_items(&store, &tables, &items).await;

        assert_eq!(saved, 2);
        let written = store.written.lock().expect("lock");
        assert_eq!(
            *written,
            vec![("metrics".to_string(), 2), ("metrics_history".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_save_items_skips_failing_table() {
        let items = build(&sample_snapshot());
        let store = RecordingStore::new(Some("bad"));
        let tables = vec![
            "good".to_string(),
            "bad".to_string(),
            "also_good".to_string(),
        ];

        let saved = save_items(&store, &tables, &items).await;

        assert_eq!(saved, 2);
        let written = store.written.lock().expect("lock");
        assert_eq!(written.len(), 2);
    }

    #[tokio::test]
    async fn test_save_items_returns_zero_when_all_tables_fail() {
        let items = build(&sample_snapshot());
        let store = RecordingStore::new(Some("bad"));
        let tables = vec!["bad".to_string()];

        let saved = save_items(&store, &tables, &items).await;

        assert_eq!(saved, 0);
        assert!(store.written.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_rounded_seconds() {
        assert_eq!(rounded_seconds(Duration::from_millis(1500)), 1.5);
        assert_eq!(rounded_seconds(Duration::from_secs_f64(1.2345)), 1.234);
        assert_eq!(rounded_seconds(Duration::ZERO), 0.0);
    }
}
