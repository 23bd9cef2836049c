pub mod backends;
pub mod catalog;
pub mod command;
pub mod config_loader;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod studio;
pub mod voices;
