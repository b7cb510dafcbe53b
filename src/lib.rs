//! SMS Triage — financial message classification and extraction pipeline.

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod store;
