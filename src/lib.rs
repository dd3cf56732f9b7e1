//! jobhost runs one of several named operations, either once in the
//! foreground or continuously under a service lifecycle driven by the
//! operating system (signals on Unix).
//!
//! The pieces, leaves first:
//! - [`commands`] - the `Command` trait, the closed `Operation` set, and the
//!   startup-time registry mapping one to the other.
//! - [`lifecycle`] - the adapter that translates external start/stop signals
//!   into command invocations, optionally on a recurring period.
//! - [`config`] / [`errors`] - settings loading and the error taxonomy.

pub mod commands;
pub mod config;
pub mod errors;
pub mod lifecycle;
