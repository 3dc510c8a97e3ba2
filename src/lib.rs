//! cartwheel - Carthage dependencies from cache
//!
//! Installs a project's Carthage dependencies as xcframeworks. Each
//! dependency is taken from the installed build tree, a local archive
//! cache or a package registry before falling back to a source build,
//! whose output is then published back to both caches.

pub mod archive;
pub mod build;
pub mod cache;
pub mod changes;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod error;
pub mod factory;
pub mod fsutil;
pub mod install;
pub mod ledger;
pub mod manifest;
pub mod pipeline;
pub mod publish;
pub mod registry;
pub mod repackage;
pub mod resolver;
pub mod shell;
pub mod toolchain;
pub mod ui;

pub use error::{CartwheelError, CartwheelResult};
