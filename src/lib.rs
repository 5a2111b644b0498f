pub mod api;
pub mod config;
pub mod export;
pub mod humanize;
pub mod modbus;
pub mod observability;
pub mod registers;
pub mod sample;
pub mod store;
