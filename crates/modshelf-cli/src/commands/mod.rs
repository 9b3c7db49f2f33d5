//! Command handlers

pub mod config;
pub mod module;
pub mod status;
