//! Identifier handling for catalog entries.
//!
//! Only DOIs are recognised for now; they are the key the registry is queried by.

pub mod doi;
