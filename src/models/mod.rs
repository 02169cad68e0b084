//! Domain types for the recognition pipeline and the access ledger.

mod geometry;
mod ledger;
mod media;
mod vehicle;

pub use geometry::BoundingBox;
pub use ledger::{AccessSession, AlertEvent, ConfirmedReading, PlateReading};
pub use media::{MediaKind, MediaUnit, DEFAULT_FRAME_RATE};
pub use vehicle::{
    AccessStatus, VehicleCandidate, VehicleCategory, VehicleClass, VehicleRegistryRecord,
};
