//! Resolves manifests, type names and selectors into a traversable set of
//! Kubernetes objects.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod logging;

#[cfg(test)]
mod test_support;

pub use crate::config::ResolverConfig;
pub use crate::domain::resource::builder::{Builder, FilenameOptions};
pub use crate::domain::resource::info::Info;
pub use crate::domain::resource::result::ResourceResult;
pub use crate::domain::resource::visitor::{Visitor, VisitorFn};
pub use crate::errors::ResourceError;
