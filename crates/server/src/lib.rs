pub mod app;
pub mod auth;
pub mod clients;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod locks;
pub mod model;
pub mod routes;
pub mod service;
pub mod tasks;
