pub mod api;
pub mod billing;
pub mod cli;
pub mod config;
pub mod guard;
pub mod session;
pub mod update;
pub mod utils;
pub mod version;
