//! Loading the bundled city/district dataset into a store.
//!
//! Run from the CLI (`geoprox seed`, `geoprox backfill`), never at server start.

pub mod dataset;
pub mod services;

pub use dataset::SeedDataset;
pub use services::SeedService;
