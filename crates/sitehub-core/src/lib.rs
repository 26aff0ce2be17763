//! # Sitehub Core
//!
//! The domain layer of the Sitehub platform.
//! This crate contains the request-independent model (cache keys, MIME tables,
//! origin routing, the site registry) and the ports that infrastructure implements.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{CacheKeyError, SiteConfigError};
