pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod services;
