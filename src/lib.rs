pub mod api;
pub mod client;
pub mod config;
pub mod csv_export;
pub mod data_models;
pub mod error;
pub mod lifecycle;
