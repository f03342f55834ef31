// Library exports for fb
// The binary and the integration tests both build on these modules

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forms;
pub mod routes;
pub mod state;
pub mod time;
pub mod uploads;
