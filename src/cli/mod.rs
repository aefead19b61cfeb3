//! # CLI Module
//!
//! Command-line tooling for route tables, shipped as the
//! `brrtrouter-dispatch` binary.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Load a table, register every route and print the result. Pattern errors
//! and unknown methods fail with the offending row:
//!
//! ```bash
//! brrtrouter-dispatch check --table routes.yaml
//! ```
//!
//! ### `resolve`
//!
//! Show which pattern a request would hit and what it binds:
//!
//! ```bash
//! brrtrouter-dispatch resolve --table routes.yaml GET /users/42
//! ```
//!
//! ### `dispatch`
//!
//! Run a request through the matched chain. Handler names without a
//! registered implementation are served by the echo handler, so the output
//! shows exactly what the chain saw:
//!
//! ```bash
//! brrtrouter-dispatch dispatch --table routes.yaml GET '/files/a/b?x=1' \
//!     -H 'x-request-id: 01ARZ3NDEKTSV4RRFFQ69G5FAV'
//! ```
//!
//! Handler names `recovery`, `tracing` and `request_id` resolve to the
//! built-in middleware.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{cli_registry, run, run_cli, Cli, Commands};
