//! Storage abstractions for service layer
//!
//! Contains the reusable file-backed JSON document store that the survey
//! response store is built on.

pub mod json_doc_store;
