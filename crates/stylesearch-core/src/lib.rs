#![deny(dead_code)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod product_text;
pub mod traits;
pub mod types;
