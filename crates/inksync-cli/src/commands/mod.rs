pub mod common;
pub mod config;
pub mod export;
pub mod import;
pub mod pull;
pub mod push;
pub mod show;
pub mod status;
