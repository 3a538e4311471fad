//! Configuration module
//!
//! Settings for the attribute search API, the search box, the list view
//! and where view options are persisted.

pub mod config;
