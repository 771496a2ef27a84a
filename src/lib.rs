//! Ambiente - Terminal backoffice for the municipal environmental department
//!
//! This library crate exposes internal modules for integration testing.

pub mod backend;
pub mod config;
pub mod data;
pub mod poller;
pub mod session;
pub mod tui;
pub mod util;
pub mod view;
