//! Resource record access and input-boundary normalization.
//!
//! Collectors hand the engine pre-normalized JSON objects carrying a
//! `resourceType` discriminator. This module wraps those objects, maps the
//! discriminator onto a closed [`ResourceKind`], and hosts the value
//! coercion helpers shared by the classification code.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Identifies the kind of resource a record describes.
///
/// Values match the `resourceType` strings emitted by the collection layer.
/// Unrecognized strings are still valid input; they simply have no
/// type-specific processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Ec2Instance,
    RdsInstance,
    S3Bucket,
    EbsVolume,
    ElasticIp,
    SecurityGroup,
    EbsSnapshot,
    Ami,
    Vpc,
    Subnet,
    EfsFileSystem,
    FsxFileSystem,
    BackupPlan,
    BackupVault,
    BackupRecoveryPoint,
    DirectConnectConnection,
    DirectConnectVirtualInterface,
    VpnConnection,
    TransitGateway,
}

impl ResourceKind {
    /// Returns the canonical `resourceType` wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ec2Instance => "EC2Instance",
            Self::RdsInstance => "RDSInstance",
            Self::S3Bucket => "S3Bucket",
            Self::EbsVolume => "EBSVolume",
            Self::ElasticIp => "ElasticIP",
            Self::SecurityGroup => "SecurityGroup",
            Self::EbsSnapshot => "EBSSnapshot",
            Self::Ami => "AMI",
            Self::Vpc => "VPC",
            Self::Subnet => "Subnet",
            Self::EfsFileSystem => "EFSFileSystem",
            Self::FsxFileSystem => "FSxFileSystem",
            Self::BackupPlan => "BackupPlan",
            Self::BackupVault => "BackupVault",
            Self::BackupRecoveryPoint => "BackupRecoveryPoint",
            Self::DirectConnectConnection => "DirectConnectConnection",
            Self::DirectConnectVirtualInterface => "DirectConnectVirtualInterface",
            Self::VpnConnection => "VPNConnection",
            Self::TransitGateway => "TransitGateway",
        }
    }

    /// Convert from a `resourceType` wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EC2Instance" => Some(Self::Ec2Instance),
            "RDSInstance" => Some(Self::RdsInstance),
            "S3Bucket" => Some(Self::S3Bucket),
            "EBSVolume" => Some(Self::EbsVolume),
            "ElasticIP" => Some(Self::ElasticIp),
            "SecurityGroup" => Some(Self::SecurityGroup),
            "EBSSnapshot" => Some(Self::EbsSnapshot),
            "AMI" => Some(Self::Ami),
            "VPC" => Some(Self::Vpc),
            "Subnet" => Some(Self::Subnet),
            "EFSFileSystem" => Some(Self::EfsFileSystem),
            "FSxFileSystem" => Some(Self::FsxFileSystem),
            "BackupPlan" => Some(Self::BackupPlan),
            "BackupVault" => Some(Self::BackupVault),
            "BackupRecoveryPoint" => Some(Self::BackupRecoveryPoint),
            "DirectConnectConnection" => Some(Self::DirectConnectConnection),
            "DirectConnectVirtualInterface" => Some(Self::DirectConnectVirtualInterface),
            "VPNConnection" => Some(Self::VpnConnection),
            "TransitGateway" => Some(Self::TransitGateway),
            _ => None,
        }
    }

    /// Return all known kinds in dispatch order.
    pub fn all() -> &'static [Self] {
        &[
            Self::Ec2Instance,
            Self::RdsInstance,
            Self::S3Bucket,
            Self::EbsVolume,
            Self::ElasticIp,
            Self::SecurityGroup,
            Self::EbsSnapshot,
            Self::Ami,
            Self::Vpc,
            Self::Subnet,
            Self::EfsFileSystem,
            Self::FsxFileSystem,
            Self::BackupPlan,
            Self::BackupVault,
            Self::BackupRecoveryPoint,
            Self::DirectConnectConnection,
            Self::DirectConnectVirtualInterface,
            Self::VpnConnection,
            Self::TransitGateway,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur decoding a resource record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,
}

/// One pre-normalized resource record from the collection layer.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    fields: Map<String, Value>,
}

impl ResourceRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Decode a record from an arbitrary JSON value (must be an object).
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(RecordError::NotAnObject),
        }
    }

    /// Decode a record from one NDJSON line.
    pub fn from_json_line(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line)?;
        Self::from_value(value)
    }

    /// The `resourceType` discriminator, if present and non-empty.
    pub fn resource_type(&self) -> Option<&str> {
        self.fields
            .get("resourceType")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The closed-enum kind for this record's discriminator.
    pub fn kind(&self) -> Option<ResourceKind> {
        self.resource_type().and_then(ResourceKind::from_name)
    }

    /// Raw field access.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field access; only JSON strings qualify.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Normalized (trimmed, lowercased) state string for a field.
    pub fn normalized_state(&self, key: &str) -> Option<String> {
        normalize_state(self.fields.get(key))
    }

    /// Whether a field holds a truthy value (see [`value_truthy`]).
    pub fn truthy(&self, key: &str) -> bool {
        value_truthy(self.fields.get(key))
    }
}

// --- Value coercion helpers ---

/// Normalize a scalar for state/status comparisons: stringified, trimmed,
/// lowercased. Absent, null, empty, and container values yield `None`.
pub fn normalize_state(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Loose truthiness for boolean-ish collector fields: `true`, nonzero
/// numbers, and non-empty strings/arrays/objects count as set.
pub fn value_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Non-empty string form of an identifier-bearing scalar field.
pub fn nonempty_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize the attachment-list shapes collectors emit into a concrete
/// list, or `None` when the value is indeterminate.
///
/// Accepted shapes: a native list (as-is); the strings `""`, `"none"`,
/// `"null"`, `"[]"` (case-insensitive, trimmed) as an empty list; any other
/// string as embedded JSON (a parsed list passes through, a parsed non-list
/// collapses to empty, a parse failure is indeterminate); a single object
/// as a one-element list. Null is indeterminate.
pub fn as_list_or_none(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.to_lowercase().as_str() {
                "" | "none" | "null" | "[]" => Some(Vec::new()),
                _ => match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Array(items)) => Some(items),
                    Ok(_) => Some(Vec::new()),
                    Err(_) => None,
                },
            }
        }
        Value::Array(items) => Some(items.clone()),
        other => Some(vec![other.clone()]),
    }
}
