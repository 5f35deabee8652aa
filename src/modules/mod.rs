//! Modules layer - infrastructure for external integrations
//!
//! Local and remote file storage used by the upload feature.

pub mod storage;
