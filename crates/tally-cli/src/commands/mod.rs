pub mod add;
pub mod common;
pub mod config;
pub mod delete;
pub mod edit;
pub mod list;
pub mod pending;
pub mod pull;
pub mod reset;
pub mod sync;
