pub mod geo_handler;
pub mod redis_handler;

pub use geo_handler::*;
pub use redis_handler::*;
