pub mod api;
pub mod clients;
pub mod config;
pub mod contracts;
pub mod error;
pub mod events;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;
