//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the per-backend store adapters (PostGIS, MongoDB, Redis).

pub mod stores;
