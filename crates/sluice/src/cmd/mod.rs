//! Command implementations for the sluice CLI

pub mod run;
pub mod validate;
