pub mod auth;
pub mod command;
