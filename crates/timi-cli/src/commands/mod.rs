//! Command handlers

pub mod batch;
pub mod config;
pub mod entry;
pub mod index;
pub mod session;
pub mod undo;
