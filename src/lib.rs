pub mod access;
pub mod aggregation;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod global;
pub mod membership;
pub mod platform;
pub mod transcript;
