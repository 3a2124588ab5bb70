//! # callscope-core
//!
//! Core library for callscope - call analytics for AI-driven call centers.
//!
//! This library provides:
//! - Domain types for calls, evaluations, and adherence reviews
//! - Statistical analyzers for model performance, trends, quality, failures, and cost
//! - Call sources: a local SQLite store and a hosted PostgREST backend
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! An analytics request flows in one direction:
//! - **Fetch:** a [`CallSource`] returns the calls in the requested range
//! - **Analyze:** pure analyzers in [`analytics`] aggregate them
//! - **Report:** [`AnalyticsService`] assembles one serializable report
//!
//! ## Example
//!
//! ```rust,no_run
//! use callscope_core::{AnalyticsRequest, AnalyticsService, Config, Database};
//!
//! # async fn run() -> callscope_core::Result<()> {
//! let config = Config::load()?;
//!
//! let db = Database::open(&config.source.resolved_database_path())?;
//! db.migrate()?;
//!
//! let service = AnalyticsService::with_config(db, config.analytics);
//! let request = AnalyticsRequest::parse("2024-01-01", "2024-01-31")?;
//! let report = service.generate_report(&request).await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{AnalyticsReport, AnalyticsService};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use source::{CallFilter, CallSource, MemorySource, RestSource};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod source;
pub mod types;
