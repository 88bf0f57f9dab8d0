//! Proximity search over cities and districts.
//!
//! The same routes are mounted once per configured backend under
//! `/api/v1/{backend}`, and the primary backend is mounted again at `/api/v1`.
//! Radii are meters on PostGIS and kilometers on MongoDB and Redis.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/{kind}?lat&lng&title[&city_id]` | Create a city or district |
//! | GET | `/cities` | List all cities |
//! | GET | `/districts` | List all districts |
//! | GET | `/{kind}/{lat}/{lng}/{distance}` | Entities near a point |
//! | GET | `/{kind}/{id}/{distance}` | Entities near an existing entity |
//! | GET | `/members/{kind}` | Redis only: member titles |
//! | GET | `/nearest/{lat}/{lng}/{distance}` | Redis only: 10 nearest districts with distance and geohash |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

pub use services::ProximityService;
