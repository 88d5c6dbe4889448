//! BlastShield harness - optional edge-case testing
//!
//! Synthesises boundary inputs per function signature and runs each case
//! in a subordinate Python process with a hard timeout. Advisory and
//! fail-closed: a harness error never fails the scan, it just withholds
//! the test-failure scoring factor.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::TestHarness;
pub use domain::{TestCase, TestResult};
