// Adscope - Library root for testing

pub mod accounts;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ideas;
pub mod report;
