use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::core::extractor::AppPath;
use crate::features::geo::dtos::GeoLocationDto;
use crate::features::geo::models::{Coordinates, Distance, DistanceUnit, EntityKind};
use crate::modules::stores::RedisStore;
use crate::shared::types::{ApiResponse, Meta};

/// Titles of every member of a kind's geo set
#[utoipa::path(
    get,
    path = "/api/v1/redis/members/{kind}",
    params(("kind" = EntityKind, Path, description = "city or district")),
    responses(
        (status = 200, description = "Member titles in set order", body = ApiResponse<Vec<String>>)
    ),
    tag = "redis"
)]
pub async fn list_members(
    State(store): State<Arc<RedisStore>>,
    AppPath(kind): AppPath<EntityKind>,
) -> Result<Json<ApiResponse<Vec<String>>>> {
    let titles = store.member_titles(kind).await?;
    let total = titles.len();
    Ok(Json(ApiResponse::success(
        Some(titles),
        None,
        Some(Meta::total(total)),
    )))
}

/// Up to 10 nearest districts with distance (km) and geohash
#[utoipa::path(
    get,
    path = "/api/v1/redis/nearest/{lat}/{lng}/{distance}",
    params(
        ("lat" = f64, Path, description = "Latitude of the query point", example = 39.92),
        ("lng" = f64, Path, description = "Longitude of the query point", example = 33.23),
        ("distance" = f64, Path, description = "Radius in kilometers", example = 50.0)
    ),
    responses(
        (status = 200, description = "Nearest districts first", body = ApiResponse<Vec<GeoLocationDto>>),
        (status = 400, description = "Invalid coordinates or negative distance")
    ),
    tag = "redis"
)]
pub async fn nearest_districts(
    State(store): State<Arc<RedisStore>>,
    AppPath((lat, lng, distance)): AppPath<(f64, f64, f64)>,
) -> Result<Json<ApiResponse<Vec<GeoLocationDto>>>> {
    let point = Coordinates::new(lat, lng)?.to_point();
    let radius = Distance::new(distance, DistanceUnit::Kilometers)?;

    let locations = store.nearest_annotated(point, radius).await?;
    let total = locations.len();
    let dtos: Vec<GeoLocationDto> = locations.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta::total(total)),
    )))
}
