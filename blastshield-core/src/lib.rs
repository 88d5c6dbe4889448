//! BlastShield core - shared configuration and audit infrastructure

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::Config;
