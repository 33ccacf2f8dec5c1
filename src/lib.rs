//! Load generator for the text-storage HTTP API.
//!
//! Virtual users store corpus lines, read them back, search them for words
//! and counter-examples, and delete them, failing an iteration on the first
//! response that deviates from what the service must return.

pub mod cache;
pub mod client;
pub mod config;
pub mod corpus;
pub mod driver;
pub mod error;
pub mod harness;
pub mod report;
pub mod selection;
pub mod telemetry;

pub use client::{HttpTextStore, TextStore};
pub use config::Config;
pub use corpus::Corpus;
pub use driver::{Outcome, WorkloadDriver};
pub use error::DriverError;
