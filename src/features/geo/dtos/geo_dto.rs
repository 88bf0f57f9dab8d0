use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::geo::models::{
    BoundingBox, DistanceUnit, EntityKind, GeoEntity, GeoLocation, GeoPoint,
};

/// Query parameters for creating a city or district
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CreateEntityQuery {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    #[param(example = 39.9208333)]
    pub lat: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    #[param(example = 33.2308333)]
    pub lng: f64,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    #[param(example = "ELMADAĞ")]
    pub title: String,

    /// Parent city id, required for districts
    #[serde(alias = "city_id")]
    pub city_id: Option<String>,
}

/// GeoJSON point, coordinates in `[longitude, latitude]` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoJsonPointDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJsonPointDto {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: point.coordinates(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundsDto {
    #[schema(value_type = String, example = "40.0")]
    pub northeast_lat: Decimal,
    #[schema(value_type = String)]
    pub northeast_lng: Decimal,
    #[schema(value_type = String)]
    pub southwest_lat: Decimal,
    #[schema(value_type = String)]
    pub southwest_lng: Decimal,
}

impl From<BoundingBox> for BoundsDto {
    fn from(bounds: BoundingBox) -> Self {
        Self {
            northeast_lat: bounds.northeast.lat(),
            northeast_lng: bounds.northeast.lng(),
            southwest_lat: bounds.southwest.lat(),
            southwest_lng: bounds.southwest.lng(),
        }
    }
}

/// Response DTO for a city or district
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityResponseDto {
    pub id: String,
    pub kind: EntityKind,
    pub title: String,
    /// Decimal degrees, serialized as a string to keep all 8 digits
    #[schema(value_type = String, example = "39.92083330")]
    pub lat: Decimal,
    #[schema(value_type = String, example = "33.23083330")]
    pub lng: Decimal,
    pub location: GeoJsonPointDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundsDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<GeoEntity> for EntityResponseDto {
    fn from(entity: GeoEntity) -> Self {
        Self {
            location: entity.location().into(),
            id: entity.id.into_inner(),
            kind: entity.kind,
            title: entity.title,
            lat: entity.coordinates.lat(),
            lng: entity.coordinates.lng(),
            bounds: entity.bounds.map(Into::into),
            city_id: entity.city_id.map(|id| id.into_inner()),
            created_at: entity.created_at,
        }
    }
}

/// Annotated hit from the Redis nearest-district search
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocationDto {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Distance from the query point in kilometers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl From<GeoLocation> for GeoLocationDto {
    fn from(location: GeoLocation) -> Self {
        Self {
            id: location.member.into_inner(),
            name: location.name,
            latitude: location.point.latitude(),
            longitude: location.point.longitude(),
            distance: location
                .distance
                .map(|d| d.in_unit(DistanceUnit::Kilometers)),
            hash: location.geohash,
        }
    }
}
