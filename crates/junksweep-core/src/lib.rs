/// Junksweep Core — scanning, classification, persistence and cleanup.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (CLI, TUI, GUI).
///
/// # Modules
///
/// - [`model`] — Discovered entries, patterns, snapshots and formatting.
/// - [`scanner`] — Background multi-root scanning with progress reporting.
/// - [`analysis`] — Rule-based grouping, safety tiers and simple queries.
/// - [`store`] — Atomic on-disk snapshot of the last scan.
/// - [`cleanup`] — Moving pattern members to the trash.
/// - [`session`] — The orchestrator a frontend holds.
/// - [`activity`] — In-memory activity log, exportable as CSV or text.
/// - [`config`] — TOML configuration.
/// - [`error`] — Error types per failure domain.
pub mod activity;
pub mod analysis;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod model;
pub mod scanner;
pub mod session;
pub mod store;

pub use activity::ActivityLog;
pub use config::Config;
pub use session::CleanupSession;
