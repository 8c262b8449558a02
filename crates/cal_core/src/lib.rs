pub mod analytics;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod parser;
pub mod reminder;
pub mod remote;
pub mod ringtones;
pub mod schedule_api;
pub mod storage;
pub mod transcript;
