//! Test harness for the planar kernel.
//!
//! Provides scenario builders, verification oracles and diagnostic reports
//! for exercising the operators end to end.
//!
//! # Key Components
//!
//! - [`oracle`]: Verification functions returning pass/fail verdicts
//! - [`report`]: Structured text and JSON result descriptions
//! - [`helpers`]: Geometry builders, cursor plumbing, deterministic sampling
//! - [`assertions`]: Assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::GeometryReport;
