mod backend;
mod coordinates;
mod entity;
mod location;

pub use backend::Backend;
pub use coordinates::{BoundingBox, Coordinates, Distance, DistanceUnit, GeoPoint, SRID_WGS84};
pub use entity::{EntityId, EntityKind, GeoEntity, NewEntity};
pub use location::GeoLocation;
