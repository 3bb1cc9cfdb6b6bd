pub mod broadcaster;
pub mod config;
pub mod constants;
pub mod engine;
pub mod entity;
pub mod level;
pub mod matchmaking;
pub mod rng;
pub mod runner;
pub mod server_protocol;
pub mod types;
