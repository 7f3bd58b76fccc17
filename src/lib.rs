//! Versioned home-directory and machine provisioning.
//!
//! Each configured update script is an ordered list of numbered update
//! steps. The runner remembers, per script, the last step that was applied
//! and on every invocation runs only the steps after it, so a machine can be
//! brought up to date repeatedly and safely.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: the TOML configuration (settings, machines, scripts)
//! - **[`store`]**: the per-script version file
//! - **[`runner`]**: the update state machine, gates and runner context
//! - **[`resources`]**: idempotent `check + apply` primitives (links, packages, ...)
//! - **[`scripts`]**: the built-in update scripts
//! - **[`commands`]**: top-level subcommand orchestration (`run`, `machines`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod resources;
pub mod runner;
pub mod scripts;
pub mod store;
