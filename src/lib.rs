pub mod aggregate;
pub mod api;
pub mod checkin;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod geo;
pub mod identity;
pub mod reliability;
pub mod store;
