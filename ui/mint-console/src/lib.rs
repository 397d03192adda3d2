//! Terminal front end for the MintPad sale.
//!
//! `MintApp` owns all state; `console` maps input lines onto it and renders
//! plain text. The binary drives it from a current-thread runtime.

pub mod app;
pub mod config;
pub mod console;
pub mod gallery;
pub mod state;
pub mod sync;

pub use app::{AppDeps, ConnectTarget, MintApp};
pub use config::Config;
