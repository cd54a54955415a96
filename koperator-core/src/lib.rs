//! `koperator-core`: the persisted cluster record and the store it lives in.
//!
//! The record model (`cluster`) is plain data with field-level merge helpers.
//! The `store` module defines the collaborator traits the state engine talks
//! to, the error taxonomy those collaborators report, and an in-memory
//! implementation used by tests.

pub mod cluster;
pub mod store;
