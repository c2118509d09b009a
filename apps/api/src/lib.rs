pub mod auth;
pub mod config;
pub mod db;
pub mod editor;
pub mod errors;
pub mod export;
pub mod models;
pub mod preferences;
pub mod repository;
pub mod resume;
pub mod routes;
pub mod state;
pub mod users;
pub mod validation;
