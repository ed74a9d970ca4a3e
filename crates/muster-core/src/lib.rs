//! Core types and trait definitions for the Muster records service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

#![allow(async_fn_in_trait)]

pub mod address;
pub mod error;
pub mod form;
pub mod fuzzy_date;
pub mod merge;
pub mod namespace;
pub mod organisation;
pub mod permission;
pub mod person;
pub mod record;
pub mod store;
pub mod story;

pub use error::{Error, Result};
