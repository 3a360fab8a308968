//! User registration, token authentication and profile management over HTTP,
//! plus the recipe records owned by users.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod recipes;
pub mod state;
pub mod tokens;
pub mod users;
