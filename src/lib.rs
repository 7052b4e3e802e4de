pub mod app;
pub mod catalog;
pub mod config;
pub mod models;
pub mod prefs;
pub mod tmdb;
pub mod transform;
