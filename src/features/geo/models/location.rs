use crate::features::geo::models::{Distance, EntityId, GeoPoint};

/// A named point returned by a geo-index search. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    /// Index member, i.e. the entity id
    pub member: EntityId,
    /// Display name, resolved from the entity title when available
    pub name: String,
    pub point: GeoPoint,
    /// Distance from the query point, when requested
    pub distance: Option<Distance>,
    /// Base32 geohash of the stored position, when requested
    pub geohash: Option<String>,
}
