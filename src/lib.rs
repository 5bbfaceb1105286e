pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod intake;
pub mod mailer;
pub mod models;
pub mod storage;
pub mod templates_structs;
