//! wheelpack core
//!
//! Downloads Python wheels and their transitive dependencies for offline
//! installation by driving `pip download` across a matrix of
//! platform/interpreter/ABI constraints.
//!
//! # Pipeline
//!
//! ```text
//! requirements.txt --[requirement::load]--> Vec<RequirementSpec>
//!                                               |
//!             StrategyMatrix --[strategy::generate]--> Vec<StrategyConstraint>
//!                                               |
//!                      aggregate::run --> Driver::attempt (per requirement)
//!                                               |
//!                                 Fetcher::fetch (per strategy)
//!                                               |
//!                                           RunReport
//! ```

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod error;
pub mod fetch;
pub mod paths;
pub mod promote;
pub mod report;
pub mod requirement;
pub mod script;
pub mod strategy;

pub use aggregate::run;
pub use config::{Config, FetchPolicy};
pub use driver::{Driver, PackageAttempts};
pub use error::{ConfigError, RequirementsError, SetupError};
pub use fetch::{FetchError, FetchRequest, Fetcher, PipFetcher};
pub use report::{AttemptOutcome, PackageResult, RunReport, TimingStats};
pub use requirement::RequirementSpec;
pub use script::{InstructionSink, ScriptFlavor, ScriptWriter};
pub use strategy::{StrategyConstraint, StrategyMatrix};

/// Version string reported in generated scripts and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
