//! Vehicle detections and the persistent vehicle registry.

use super::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object classes the pipeline keeps from the detector.
///
/// `Other` covers everything else a general-purpose detector may return
/// (people, traffic lights, ...); the detection adapter drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleClass {
    /// Passenger car.
    Car,
    /// Motorcycle.
    Motorcycle,
    /// Bus.
    Bus,
    /// Truck.
    Truck,
    /// Any non-vehicle class; filtered out.
    Other,
}

impl VehicleClass {
    /// Whether this class participates in plate recognition.
    #[must_use]
    pub const fn is_vehicle(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// One detected object box within a single sampled frame.
///
/// Ephemeral: discarded after plate-region extraction.
#[derive(Debug, Clone, Copy)]
pub struct VehicleCandidate {
    /// Bounding rectangle, in the coordinates of the frame handed to the
    /// detector (the adapter rescales to original-frame coordinates).
    pub bbox: BoundingBox,
    /// Detected class.
    pub class: VehicleClass,
    /// Detector confidence in `(0, 1]`.
    pub confidence: f32,
}

/// Category of a registered vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleCategory {
    /// Institution-owned vehicle.
    Official,
    /// Privately owned vehicle.
    Private,
    /// Auto-enrolled or short-term visitor.
    Visitor,
}

impl VehicleCategory {
    /// Stable string form used in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Official => "OFFICIAL",
            Self::Private => "PRIVATE",
            Self::Visitor => "VISITOR",
        }
    }

    /// Parses the database string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "OFFICIAL" => Ok(Self::Official),
            "PRIVATE" => Ok(Self::Private),
            "VISITOR" => Ok(Self::Visitor),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown vehicle category '{other}'"
            ))),
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access status of a registered vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    /// Cleared for campus access.
    Authorized,
    /// Not cleared; confirmed sightings raise a security alert.
    Unauthorized,
    /// Flagged after an incident; confirmed sightings raise a security
    /// alert.
    Incident,
}

impl AccessStatus {
    /// Stable string form used in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorized => "AUTHORIZED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Incident => "INCIDENT",
        }
    }

    /// Parses the database string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "AUTHORIZED" => Ok(Self::Authorized),
            "UNAUTHORIZED" => Ok(Self::Unauthorized),
            "INCIDENT" => Ok(Self::Incident),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown access status '{other}'"
            ))),
        }
    }

    /// Whether a confirmed sighting of a vehicle with this status must
    /// raise a security alert.
    #[must_use]
    pub const fn is_alerting(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Incident)
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent registry record for one plate.
///
/// Created through registry management, or auto-enrolled by the ledger the
/// first time an unknown plate is confirmed (Visitor/Unauthorized). Only
/// explicit registry edits mutate it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRegistryRecord {
    /// Normalized plate, the primary key.
    pub plate: String,
    /// Vehicle category.
    pub category: VehicleCategory,
    /// Access status.
    pub status: AccessStatus,
    /// Owner name or sector label.
    pub owner: Option<String>,
    /// Free-text note.
    pub note: Option<String>,
}

impl VehicleRegistryRecord {
    /// The record the ledger creates for a plate it has never seen.
    #[must_use]
    pub fn auto_enrolled(plate: &str) -> Self {
        Self {
            plate: plate.to_string(),
            category: VehicleCategory::Visitor,
            status: AccessStatus::Unauthorized,
            owner: None,
            note: Some("auto-detected".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AccessStatus::Authorized,
            AccessStatus::Unauthorized,
            AccessStatus::Incident,
        ] {
            assert_eq!(AccessStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(AccessStatus::parse("BANNED").is_err());
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            VehicleCategory::Official,
            VehicleCategory::Private,
            VehicleCategory::Visitor,
        ] {
            assert_eq!(VehicleCategory::parse(category.as_str()).unwrap(), category);
        }
    }

    #[test]
    fn test_alerting_statuses() {
        assert!(!AccessStatus::Authorized.is_alerting());
        assert!(AccessStatus::Unauthorized.is_alerting());
        assert!(AccessStatus::Incident.is_alerting());
    }

    #[test]
    fn test_auto_enrolled_defaults() {
        let record = VehicleRegistryRecord::auto_enrolled("ABC1D23");
        assert_eq!(record.category, VehicleCategory::Visitor);
        assert_eq!(record.status, AccessStatus::Unauthorized);
        assert_eq!(record.note.as_deref(), Some("auto-detected"));
    }
}
