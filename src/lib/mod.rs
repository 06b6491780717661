//! Fail-fast loading of `.env` files.
//!
//! This library reads a main environment file (`.env`) into the process
//! environment after checking it against a template (`.env.sample` or
//! `.env.example`) that declares which keys must be present. It can also check,
//! at any later point, that the live environment still provides every key the
//! template declares.
//!
//! # Features
//!
//! - **Strict parsing**: `KEY=VALUE` lines, `#` comments and blank lines; any
//!   other line rejects the whole file
//! - **Template reconciliation**: exact or superset key matching, with optional
//!   rejection of empty values
//! - **Injectable environment**: the [`env::Environment`] trait lets tests use
//!   [`env::MemoryEnv`] instead of the process environment
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! // Load ./.env, validated against ./.env.sample or ./.env.example.
//! env_guard::configure(None::<&str>, true).unwrap();
//!
//! // Later: make sure every declared variable is set and non-empty.
//! env_guard::verify(None::<&str>, false).unwrap();
//! ```

pub mod apply;
pub mod env;
pub mod guard;
pub mod parse;
pub mod reconcile;
pub mod resolve;

pub use guard::{EnvGuard, EnvGuardError, configure, verify};
