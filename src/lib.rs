pub mod app;
pub mod config;
pub mod error;
pub mod favorites;
pub mod featured;
pub mod models;
pub mod omdb;
pub mod omdb_fallback;
pub mod search;
pub mod session;
pub mod storage;
