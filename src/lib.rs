//! Work order ledger
//!
//! Business core for repair and production work orders: sequential display
//! ids, size-bucket quantity totals and the create / update / complete /
//! delete lifecycle, persisted through sea-orm.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod models;
pub mod repositories;
pub mod retry;
pub mod services;

pub use errors::ServiceError;
pub use services::WorkOrderService;
