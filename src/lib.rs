pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod stores;
