//! Composite Air Quality Index derivation from raw pollutant readings.
//!
//! [`engine::AqiEngine`] maps each pollutant's concentration through its
//! breakpoint table and keeps the worst sub-index. [`pipeline`] applies it
//! to time-ordered batches and adds the rate of change.

pub mod breakpoints;
pub mod category;
pub mod change_rate;
pub mod engine;
pub mod error;
pub mod features;
pub mod fetch;
pub mod observation;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod pollutant;
pub mod summary;
