//! Schema-driven mapping of build/test result files and their condensation
//! across build history.
//!
//! A [`schema::Schema`] selects a [`mapper::ResultMapper`] that turns each
//! result document into a [`model::ResultTree`]. The [`store::BenchmarkStore`]
//! keeps the newest tree per file and feeds every tree into the
//! [`condense::Aggregator`], which holds min/max/mean/std-dev and pass/fail
//! counts per metric. [`scanner::HistoryScanner`] drives the store over a
//! range of historical builds with parallel workers.

pub mod cli;
pub mod condense;
pub mod config;
pub mod error;
pub mod history;
pub mod mapper;
pub mod model;
pub mod paths;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod schema;
pub mod store;
pub mod ui;

pub use error::{MapError, MapResult};
