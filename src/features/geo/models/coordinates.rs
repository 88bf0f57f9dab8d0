use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, Result};

/// Spatial reference id for WGS84 longitude/latitude
pub const SRID_WGS84: i32 = 4326;

/// Fractional digits kept for stored coordinates (about 1.1mm)
pub const COORDINATE_SCALE: u32 = 8;

/// Mean Earth radius in meters (for Haversine formula)
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Latitude/longitude pair stored at fixed decimal precision.
///
/// This is the source of truth for an entity's position; the point geometry
/// used by spatial queries is always derived from it with [`Coordinates::to_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    lat: Decimal,
    lng: Decimal,
}

impl Coordinates {
    /// Build coordinates from floating point degrees, validating ranges
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let lat_dec = Decimal::from_f64(lat)
            .ok_or_else(|| AppError::Validation(format!("Latitude {} is not a number", lat)))?;
        let lng_dec = Decimal::from_f64(lng)
            .ok_or_else(|| AppError::Validation(format!("Longitude {} is not a number", lng)))?;

        Self::from_decimal(lat_dec, lng_dec)
    }

    /// Build coordinates from decimal degrees, validating ranges
    pub fn from_decimal(lat: Decimal, lng: Decimal) -> Result<Self> {
        if lat < Decimal::from(-90) || lat > Decimal::from(90) {
            return Err(AppError::Validation(format!(
                "Latitude {} must be between -90 and 90",
                lat
            )));
        }
        if lng < Decimal::from(-180) || lng > Decimal::from(180) {
            return Err(AppError::Validation(format!(
                "Longitude {} must be between -180 and 180",
                lng
            )));
        }

        Ok(Self {
            lat: lat.round_dp(COORDINATE_SCALE),
            lng: lng.round_dp(COORDINATE_SCALE),
        })
    }

    pub fn lat(&self) -> Decimal {
        self.lat
    }

    pub fn lng(&self) -> Decimal {
        self.lng
    }

    /// Derive the WGS84 point: x is longitude, y is latitude
    pub fn to_point(&self) -> GeoPoint {
        GeoPoint {
            x: self.lng.to_f64().unwrap_or_default(),
            y: self.lat.to_f64().unwrap_or_default(),
        }
    }
}

/// Northeast/southwest corners of an entity's extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub northeast: Coordinates,
    pub southwest: Coordinates,
}

impl BoundingBox {
    /// Builds a box only when all four corner values are present
    pub fn from_corners(
        northeast_lat: Option<Decimal>,
        northeast_lng: Option<Decimal>,
        southwest_lat: Option<Decimal>,
        southwest_lng: Option<Decimal>,
    ) -> Result<Option<Self>> {
        match (northeast_lat, northeast_lng, southwest_lat, southwest_lng) {
            (Some(ne_lat), Some(ne_lng), Some(sw_lat), Some(sw_lng)) => Ok(Some(Self {
                northeast: Coordinates::from_decimal(ne_lat, ne_lng)?,
                southwest: Coordinates::from_decimal(sw_lat, sw_lng)?,
            })),
            _ => Ok(None),
        }
    }
}

/// WGS84 point geometry (SRID 4326) in `(x, y)` = `(longitude, latitude)` order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    x: f64,
    y: f64,
}

impl GeoPoint {
    /// Point from a position already known to be valid, e.g. one read back from an index
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            x: longitude,
            y: latitude,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn longitude(&self) -> f64 {
        self.x
    }

    pub fn latitude(&self) -> f64 {
        self.y
    }

    /// GeoJSON coordinate array, `[longitude, latitude]`
    pub fn coordinates(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Great-circle (Haversine) distance to another point
    pub fn distance_to(&self, other: &GeoPoint) -> Distance {
        let lat1_rad = self.y.to_radians();
        let lat2_rad = other.y.to_radians();
        let delta_lat = (other.y - self.y).to_radians();
        let delta_lon = (other.x - self.x).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        Distance::from_meters(EARTH_RADIUS_METERS * c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
}

impl DistanceUnit {
    fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
        }
    }

    /// Unit argument understood by Redis geo commands
    pub fn redis_arg(self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
        }
    }
}

impl std::fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.redis_arg())
    }
}

/// Non-negative search radius, held in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance {
    meters: f64,
}

impl Distance {
    pub fn new(value: f64, unit: DistanceUnit) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::Validation(format!(
                "Distance must be a non-negative number, got {}",
                value
            )));
        }
        Ok(Self::from_meters(value * unit.meters_per_unit()))
    }

    fn from_meters(meters: f64) -> Self {
        Self { meters }
    }

    pub fn as_meters(&self) -> f64 {
        self.meters
    }

    pub fn in_unit(&self, unit: DistanceUnit) -> f64 {
        self.meters / unit.meters_per_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_point_is_longitude_latitude() {
        let coords = Coordinates::new(39.9208333, 33.2308333).unwrap();
        let point = coords.to_point();

        assert!((point.x() - 33.2308333).abs() < 1e-9);
        assert!((point.y() - 39.9208333).abs() < 1e-9);
        assert_eq!(point.coordinates()[0], point.longitude());
        assert_eq!(point.coordinates()[1], point.latitude());
    }

    #[test]
    fn test_coordinates_rounded_to_eight_digits() {
        let coords = Coordinates::from_decimal(
            Decimal::from_str("41.0082376123").unwrap(),
            Decimal::from_str("28.97835").unwrap(),
        )
        .unwrap();

        assert_eq!(coords.lat(), Decimal::from_str("41.00823761").unwrap());
        assert_eq!(coords.lng(), Decimal::from_str("28.97835").unwrap());
    }

    #[test]
    fn test_coordinates_reject_out_of_range() {
        assert!(matches!(
            Coordinates::new(90.5, 10.0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Coordinates::new(10.0, -180.01),
            Err(AppError::Validation(_))
        ));
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_bounding_box_requires_all_corners() {
        let partial = BoundingBox::from_corners(
            Some(Decimal::from(40)),
            Some(Decimal::from(33)),
            None,
            Some(Decimal::from(32)),
        )
        .unwrap();
        assert!(partial.is_none());

        let full = BoundingBox::from_corners(
            Some(Decimal::from(40)),
            Some(Decimal::from(33)),
            Some(Decimal::from(39)),
            Some(Decimal::from(32)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(full.southwest.lat(), Decimal::from(39));
    }

    #[test]
    fn test_distance_units() {
        let d = Distance::new(5.0, DistanceUnit::Kilometers).unwrap();
        assert_eq!(d.as_meters(), 5000.0);
        assert_eq!(d.in_unit(DistanceUnit::Kilometers), 5.0);

        assert!(Distance::new(-1.0, DistanceUnit::Meters).is_err());
        assert!(Distance::new(f64::INFINITY, DistanceUnit::Meters).is_err());
        assert_eq!(DistanceUnit::Kilometers.to_string(), "km");
    }

    #[test]
    fn test_haversine_distance() {
        // Ankara to Istanbul is roughly 350km great-circle
        let ankara = Coordinates::new(39.9334, 32.8597).unwrap().to_point();
        let istanbul = Coordinates::new(41.0082, 28.9784).unwrap().to_point();

        let km = ankara.distance_to(&istanbul).in_unit(DistanceUnit::Kilometers);
        assert!(km > 340.0 && km < 360.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinates::new(39.9208333, 33.2308333).unwrap().to_point();
        assert!(point.distance_to(&point).as_meters() < 1e-6);
    }
}
