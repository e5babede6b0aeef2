pub mod api;
pub mod config;
pub mod curriculum;
pub mod db;
pub mod error;
pub mod progress;
pub mod user;
pub mod utils;
