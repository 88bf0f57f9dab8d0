/// Redis geo sorted set holding city positions
pub const REDIS_CITY_GEO_KEY: &str = "redis_location_city";

/// Redis geo sorted set holding district positions
pub const REDIS_DISTRICT_GEO_KEY: &str = "redis_location_district";

/// Redis hash mapping city ids to their serialized entity
pub const REDIS_CITY_ENTITY_KEY: &str = "redis_entity_city";

/// Redis hash mapping district ids to their serialized entity
pub const REDIS_DISTRICT_ENTITY_KEY: &str = "redis_entity_district";

/// Maximum hits returned by the annotated nearest-district search
pub const ANNOTATED_SEARCH_LIMIT: usize = 10;

/// MongoDB collection names
pub const MONGO_CITY_COLLECTION: &str = "city";
pub const MONGO_DISTRICT_COLLECTION: &str = "district";
