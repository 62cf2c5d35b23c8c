pub mod common;
pub mod config;
pub mod confluence;
pub mod error;
pub mod report;
