//! Pass operations. Each takes the shared [`crate::PassContext`] and either
//! succeeds or returns the error that fails the pass.

pub mod build;
pub mod e2e;
pub mod fmt;
pub mod unit;
