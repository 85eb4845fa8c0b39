//! Integration test crate for LKTrack.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the estimators and the tracker with frames built from
//! lktrack-core types, the way a downstream user would.


#[cfg(test)]
mod flow;

#[cfg(test)]
mod tracking;
