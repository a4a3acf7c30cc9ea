pub mod bank;
pub mod command;
pub mod config;
pub mod lobby;

pub use lobby::Lobby;
