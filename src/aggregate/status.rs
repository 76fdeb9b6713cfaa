//! Closed status classifications with alias normalization.
//!
//! Collector payloads carry these as free-form strings; classification
//! happens once at the input boundary so the counting code never compares
//! raw strings.

use std::fmt;

/// SSM agent connectivity for a running EC2 instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SsmStatus {
    Connected,
    NotConnected,
    NotInstalled,
}

impl SsmStatus {
    /// Classify a raw `ssmStatus` value (lowercased, untrimmed).
    ///
    /// `connected` and `online` both mean a live agent; an absent or empty
    /// value means the agent never registered; anything else is a known
    /// agent that is not currently connected.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.unwrap_or("").to_lowercase().as_str() {
            "connected" | "online" => Self::Connected,
            "" | "notinstalled" => Self::NotInstalled,
            _ => Self::NotConnected,
        }
    }
}

/// Patch-baseline compliance for an EC2 instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchCompliance {
    Compliant,
    NonCompliant,
    Unknown,
}

impl PatchCompliance {
    /// Classify a raw `patchCompliance` value (trimmed, lowercased).
    ///
    /// Both `noncompliant` and `non_compliant` spellings appear in the
    /// wild; everything unrecognized (including absent) is unknown.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.unwrap_or("").trim().to_lowercase().as_str() {
            "compliant" => Self::Compliant,
            "noncompliant" | "non_compliant" => Self::NonCompliant,
            _ => Self::Unknown,
        }
    }
}

/// Canonical EBS volume type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeType {
    Gp3,
    Gp2,
    Io1,
    Io2,
    St1,
    Sc1,
    Standard,
}

impl VolumeType {
    /// Returns the canonical API code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gp3 => "gp3",
            Self::Gp2 => "gp2",
            Self::Io1 => "io1",
            Self::Io2 => "io2",
            Self::St1 => "st1",
            Self::Sc1 => "sc1",
            Self::Standard => "standard",
        }
    }

    /// Map a free-form volume-type string onto a canonical code.
    ///
    /// Canonical codes pass through; known marketing/console aliases are
    /// folded in; anything unrecognized defaults to gp3, the current
    /// general-purpose default.
    pub fn from_api_name(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "gp3" => Self::Gp3,
            "gp2" => Self::Gp2,
            "io1" => Self::Io1,
            "io2" => Self::Io2,
            "st1" => Self::St1,
            "sc1" => Self::Sc1,
            "standard" => Self::Standard,
            "gp-3" | "general_purpose_gp3" | "general-purpose-gp3" => Self::Gp3,
            "gp-2" | "general_purpose" | "general-purpose" => Self::Gp2,
            "throughput-optimized-hdd" | "throughput_optimized_hdd" => Self::St1,
            "cold-hdd" | "cold_hdd" => Self::Sc1,
            "magnetic" => Self::Standard,
            _ => Self::Gp3,
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssm_connected_aliases() {
        assert_eq!(SsmStatus::classify(Some("connected")), SsmStatus::Connected);
        assert_eq!(SsmStatus::classify(Some("Online")), SsmStatus::Connected);
        assert_eq!(SsmStatus::classify(Some("CONNECTED")), SsmStatus::Connected);
    }

    #[test]
    fn test_ssm_not_installed() {
        assert_eq!(SsmStatus::classify(None), SsmStatus::NotInstalled);
        assert_eq!(SsmStatus::classify(Some("")), SsmStatus::NotInstalled);
        assert_eq!(
            SsmStatus::classify(Some("NotInstalled")),
            SsmStatus::NotInstalled
        );
    }

    #[test]
    fn test_ssm_everything_else_is_not_connected() {
        assert_eq!(
            SsmStatus::classify(Some("ConnectionLost")),
            SsmStatus::NotConnected
        );
        assert_eq!(
            SsmStatus::classify(Some("inactive")),
            SsmStatus::NotConnected
        );
    }

    #[test]
    fn test_patch_compliance_classify() {
        assert_eq!(
            PatchCompliance::classify(Some("Compliant")),
            PatchCompliance::Compliant
        );
        assert_eq!(
            PatchCompliance::classify(Some(" compliant ")),
            PatchCompliance::Compliant
        );
        assert_eq!(
            PatchCompliance::classify(Some("NonCompliant")),
            PatchCompliance::NonCompliant
        );
        assert_eq!(
            PatchCompliance::classify(Some("NON_COMPLIANT")),
            PatchCompliance::NonCompliant
        );
    }

    #[test]
    fn test_patch_compliance_unknown_catchall() {
        assert_eq!(PatchCompliance::classify(None), PatchCompliance::Unknown);
        assert_eq!(
            PatchCompliance::classify(Some("")),
            PatchCompliance::Unknown
        );
        assert_eq!(
            PatchCompliance::classify(Some("pending")),
            PatchCompliance::Unknown
        );
    }

    #[test]
    fn test_volume_type_canonical_passthrough() {
        for code in ["gp3", "gp2", "io1", "io2", "st1", "sc1", "standard"] {
            assert_eq!(VolumeType::from_api_name(code).as_str(), code);
        }
        assert_eq!(VolumeType::from_api_name("GP3"), VolumeType::Gp3);
    }

    #[test]
    fn test_volume_type_aliases() {
        assert_eq!(VolumeType::from_api_name("gp-3"), VolumeType::Gp3);
        assert_eq!(
            VolumeType::from_api_name("general_purpose_gp3"),
            VolumeType::Gp3
        );
        assert_eq!(VolumeType::from_api_name("general-purpose"), VolumeType::Gp2);
        assert_eq!(
            VolumeType::from_api_name("throughput-optimized-hdd"),
            VolumeType::St1
        );
        assert_eq!(VolumeType::from_api_name("cold_hdd"), VolumeType::Sc1);
        assert_eq!(VolumeType::from_api_name("magnetic"), VolumeType::Standard);
    }

    #[test]
    fn test_volume_type_unrecognized_defaults_to_gp3() {
        assert_eq!(VolumeType::from_api_name(""), VolumeType::Gp3);
        assert_eq!(VolumeType::from_api_name("provisioned"), VolumeType::Gp3);
    }
}
