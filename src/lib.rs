pub mod backend;
pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod provider;
pub mod wallet;
