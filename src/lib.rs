//! Vehicle listing HTTP service backed by Postgres

pub mod config;
pub mod database;
pub mod errors;
pub mod server;
pub mod strings;
pub mod vehicles;
