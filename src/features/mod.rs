pub mod geo;
pub mod seed;
