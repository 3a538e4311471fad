//! List view options for a log/trace explorer.
//!
//! The [`options_menu::OptionsMenu`] controller keeps the selected columns,
//! row format and row height of a log list in the page URL and in persistent
//! storage, and resolves columns through an attribute search API.

pub mod api_client;
pub mod config;
pub mod debouncer;
pub mod location;
pub mod logging;
pub mod options;
pub mod options_menu;
pub mod raw_log_view;
pub mod store;
pub mod utils;
