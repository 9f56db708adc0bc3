//! Data models for the NetLens capture engine

pub mod record;

pub use record::*;
