use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppPath, AppQuery};
use crate::features::geo::dtos::{CreateEntityQuery, EntityResponseDto};
use crate::features::geo::models::{EntityKind, GeoEntity};
use crate::features::geo::services::ProximityService;
use crate::shared::types::{ApiResponse, Meta};

fn entity_list(entities: Vec<GeoEntity>) -> Json<ApiResponse<Vec<EntityResponseDto>>> {
    let total = entities.len();
    let dtos: Vec<EntityResponseDto> = entities.into_iter().map(Into::into).collect();
    Json(ApiResponse::success(Some(dtos), None, Some(Meta::total(total))))
}

/// Create a city or a district
#[utoipa::path(
    post,
    path = "/api/v1/{backend}/{kind}",
    params(
        ("backend" = String, Path, description = "postgis, mongo or redis"),
        ("kind" = EntityKind, Path, description = "city or district"),
        CreateEntityQuery
    ),
    responses(
        (status = 200, description = "Created entity", body = ApiResponse<EntityResponseDto>),
        (status = 400, description = "Invalid coordinates, title or missing city id"),
        (status = 404, description = "Referenced city not found")
    ),
    tag = "geo"
)]
pub async fn create_entity(
    State(service): State<Arc<ProximityService>>,
    AppPath(kind): AppPath<EntityKind>,
    AppQuery(query): AppQuery<CreateEntityQuery>,
) -> Result<Json<ApiResponse<EntityResponseDto>>> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let entity = service
        .create(
            kind,
            &query.title,
            query.lat,
            query.lng,
            query.city_id.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(entity.into()),
        Some(format!("{} created", kind.label())),
        None,
    )))
}

/// List all cities
#[utoipa::path(
    get,
    path = "/api/v1/{backend}/cities",
    params(("backend" = String, Path, description = "postgis, mongo or redis")),
    responses(
        (status = 200, description = "All cities", body = ApiResponse<Vec<EntityResponseDto>>)
    ),
    tag = "geo"
)]
pub async fn list_cities(
    State(service): State<Arc<ProximityService>>,
) -> Result<Json<ApiResponse<Vec<EntityResponseDto>>>> {
    Ok(entity_list(service.list(EntityKind::City).await?))
}

/// List all districts
#[utoipa::path(
    get,
    path = "/api/v1/{backend}/districts",
    params(("backend" = String, Path, description = "postgis, mongo or redis")),
    responses(
        (status = 200, description = "All districts", body = ApiResponse<Vec<EntityResponseDto>>)
    ),
    tag = "geo"
)]
pub async fn list_districts(
    State(service): State<Arc<ProximityService>>,
) -> Result<Json<ApiResponse<Vec<EntityResponseDto>>>> {
    Ok(entity_list(service.list(EntityKind::District).await?))
}

/// Entities within `distance` of a point.
///
/// `distance` is meters on postgis and kilometers on mongo and redis.
#[utoipa::path(
    get,
    path = "/api/v1/{backend}/{kind}/{lat}/{lng}/{distance}",
    params(
        ("backend" = String, Path, description = "postgis, mongo or redis"),
        ("kind" = EntityKind, Path, description = "city or district"),
        ("lat" = f64, Path, description = "Latitude of the query point", example = 39.92),
        ("lng" = f64, Path, description = "Longitude of the query point", example = 33.23),
        ("distance" = f64, Path, description = "Radius in the backend's unit", example = 5.0)
    ),
    responses(
        (status = 200, description = "Entities within the radius", body = ApiResponse<Vec<EntityResponseDto>>),
        (status = 400, description = "Invalid coordinates or negative distance")
    ),
    tag = "geo"
)]
pub async fn find_nearest(
    State(service): State<Arc<ProximityService>>,
    AppPath((kind, lat, lng, distance)): AppPath<(EntityKind, f64, f64, f64)>,
) -> Result<Json<ApiResponse<Vec<EntityResponseDto>>>> {
    let entities = service.find_nearest(kind, lat, lng, distance).await?;
    Ok(entity_list(entities))
}

/// Entities within `distance` of an existing entity
#[utoipa::path(
    get,
    path = "/api/v1/{backend}/{kind}/{id}/{distance}",
    params(
        ("backend" = String, Path, description = "postgis, mongo or redis"),
        ("kind" = EntityKind, Path, description = "city or district"),
        ("id" = String, Path, description = "Id of the reference entity"),
        ("distance" = f64, Path, description = "Radius in the backend's unit")
    ),
    responses(
        (status = 200, description = "Entities within the radius", body = ApiResponse<Vec<EntityResponseDto>>),
        (status = 400, description = "Negative distance"),
        (status = 404, description = "Reference entity not found")
    ),
    tag = "geo"
)]
pub async fn find_nearest_by_id(
    State(service): State<Arc<ProximityService>>,
    AppPath((kind, id, distance)): AppPath<(EntityKind, String, f64)>,
) -> Result<Json<ApiResponse<Vec<EntityResponseDto>>>> {
    let entities = service
        .find_nearest_by_entity_id(kind, &id, distance)
        .await?;
    Ok(entity_list(entities))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::Router;
    use axum_test::TestServer;
    use fake::faker::address::en::CityName;
    use fake::Fake;
    use serde_json::Value;

    use crate::features::geo::models::Backend;
    use crate::features::geo::routes;
    use crate::features::geo::services::ProximityService;
    use crate::shared::test_helpers::InMemoryStore;

    fn server(backend: Backend) -> TestServer {
        let service = Arc::new(ProximityService::new(InMemoryStore::shared(backend)));
        let app = Router::new().nest(&backend.prefix(), routes::routes(service));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_query_at_zero_distance() {
        let server = server(Backend::Postgis);

        let created = server
            .post("/api/v1/postgis/city")
            .add_query_param("lat", 39.9208333)
            .add_query_param("lng", 33.2308333)
            .add_query_param("title", "ELMADAĞ")
            .await;
        created.assert_status_ok();
        let body: Value = created.json();
        assert_eq!(body["success"], true);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let found: Value = server
            .get("/api/v1/postgis/city/39.9208333/33.2308333/0")
            .await
            .json();
        assert_eq!(found["meta"]["total"], 1);
        assert_eq!(found["data"][0]["id"], id.as_str());

        let by_id: Value = server
            .get(&format!("/api/v1/postgis/city/{}/0", id))
            .await
            .json();
        assert_eq!(by_id["data"][0]["title"], "ELMADAĞ");
    }

    #[tokio::test]
    async fn test_nearest_by_id_sits_next_to_point_route() {
        let server = server(Backend::Mongo);

        let ankara: Value = server
            .post("/api/v1/mongo/city")
            .add_query_param("lat", 39.9334)
            .add_query_param("lng", 32.8597)
            .add_query_param("title", "ANKARA")
            .await
            .json();
        let id = ankara["data"]["id"].as_str().unwrap().to_string();
        server
            .post("/api/v1/mongo/city")
            .add_query_param("lat", 41.0082)
            .add_query_param("lng", 28.9784)
            .add_query_param("title", "İSTANBUL")
            .await
            .assert_status_ok();

        let near = server.get(&format!("/api/v1/mongo/city/{}/10", id)).await;
        near.assert_status_ok();
        let near: Value = near.json();
        assert_eq!(near["meta"]["total"], 1);
        assert_eq!(near["data"][0]["title"], "ANKARA");

        let wide: Value = server
            .get(&format!("/api/v1/mongo/city/{}/500", id))
            .await
            .json();
        assert_eq!(wide["meta"]["total"], 2);

        let by_point: Value = server
            .get("/api/v1/mongo/city/39.9334/32.8597/10")
            .await
            .json();
        assert_eq!(by_point["data"][0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_list_endpoints_split_by_kind() {
        let server = server(Backend::Mongo);
        let title: String = CityName().fake();

        let city: Value = server
            .post("/api/v1/mongo/city")
            .add_query_param("lat", 39.9334)
            .add_query_param("lng", 32.8597)
            .add_query_param("title", &title)
            .await
            .json();
        let city_id = city["data"]["id"].as_str().unwrap().to_string();

        server
            .post("/api/v1/mongo/district")
            .add_query_param("lat", 39.9179)
            .add_query_param("lng", 32.8627)
            .add_query_param("title", "ÇANKAYA")
            .add_query_param("city_id", &city_id)
            .await
            .assert_status_ok();

        let cities: Value = server.get("/api/v1/mongo/cities").await.json();
        assert_eq!(cities["meta"]["total"], 1);
        assert_eq!(cities["data"][0]["title"], title.as_str());

        let districts: Value = server.get("/api/v1/mongo/districts").await.json();
        assert_eq!(districts["data"][0]["cityId"], city_id.as_str());
    }

    #[tokio::test]
    async fn test_nearby_in_kilometers_and_far_point() {
        let server = server(Backend::Redis);
        server
            .post("/api/v1/redis/district")
            .add_query_param("lat", 39.9208333)
            .add_query_param("lng", 33.2308333)
            .add_query_param("title", "ELMADAĞ")
            .add_query_param("city_id", "6")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post("/api/v1/redis/city")
            .add_query_param("lat", 39.9208333)
            .add_query_param("lng", 33.2308333)
            .add_query_param("title", "ELMADAĞ")
            .await
            .assert_status_ok();

        let near: Value = server.get("/api/v1/redis/city/39.92/33.23/5").await.json();
        assert_eq!(near["data"][0]["title"], "ELMADAĞ");

        let far: Value = server
            .get("/api/v1/redis/city/39.92/27.40/0.001")
            .await
            .json();
        assert_eq!(far["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = server(Backend::Postgis);

        server
            .get("/api/v1/postgis/city/missing/10")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/api/v1/postgis/city/39.92/33.23/-1")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/v1/postgis/city/north/33.23/5")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/api/v1/postgis/town/39.92/33.23/5")
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let invalid = server
            .post("/api/v1/postgis/city")
            .add_query_param("lat", 120)
            .add_query_param("lng", 33.23)
            .add_query_param("title", "X")
            .await;
        invalid.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = invalid.json();
        assert_eq!(body["success"], false);
    }
}
