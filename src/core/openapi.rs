use utoipa::{Modify, OpenApi};

use crate::features::geo::dtos::{
    BoundsDto, EntityResponseDto, GeoJsonPointDto, GeoLocationDto,
};
use crate::features::geo::handlers;
use crate::features::geo::models::EntityKind;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Proximity (every backend)
        handlers::create_entity,
        handlers::list_cities,
        handlers::list_districts,
        handlers::find_nearest,
        handlers::find_nearest_by_id,
        // Redis index
        handlers::list_members,
        handlers::nearest_districts,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Geo
            EntityKind,
            GeoJsonPointDto,
            BoundsDto,
            EntityResponseDto,
            GeoLocationDto,
            ApiResponse<EntityResponseDto>,
            ApiResponse<Vec<EntityResponseDto>>,
            ApiResponse<Vec<GeoLocationDto>>,
            ApiResponse<Vec<String>>,
        )
    ),
    tags(
        (name = "geo", description = "Cities and districts near a point, per storage backend"),
        (name = "redis", description = "Redis geo index listings and annotated search"),
    ),
    info(
        title = "geoprox API",
        version = "0.1.0",
        description = "Proximity search over cities and districts backed by PostGIS, MongoDB and Redis",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_geo_paths() {
        let mut openapi = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Test".to_string(),
            version: "9.9.9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut openapi);

        assert_eq!(openapi.info.title, "Test");
        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/api/v1/{backend}/{kind}/{lat}/{lng}/{distance}"));
        assert!(paths.contains_key("/api/v1/{backend}/{kind}/{id}/{distance}"));
        assert!(paths.contains_key("/api/v1/redis/nearest/{lat}/{lng}/{distance}"));
    }

    #[test]
    fn test_create_entity_fields_are_query_params() {
        use utoipa::openapi::path::ParameterIn;

        let openapi = ApiDoc::openapi();
        let create = openapi.paths.paths["/api/v1/{backend}/{kind}"]
            .post
            .as_ref()
            .unwrap();
        let params = create.parameters.as_ref().unwrap();

        for name in ["lat", "lng", "title", "cityId"] {
            let param = params.iter().find(|p| p.name == name).unwrap();
            assert!(param.parameter_in == ParameterIn::Query, "{} is not a query param", name);
        }
        let kind = params.iter().find(|p| p.name == "kind").unwrap();
        assert!(kind.parameter_in == ParameterIn::Path);
    }
}
