//! Calendar availability engine for the U-Engine ecosystem.
//!
//! Expands calendar definitions (static intervals, recurrence rules,
//! inherited parent calendars, project time zones) into a lazily filled
//! interval cache, and answers working-time questions from it.
//!
//! # Modules
//!
//! - **`models`**: Definition types — `CalendarDefinition`, `CalendarInterval`,
//!   `RecurrenceRule`, `EndSchedule`, `TimeZone`, `TimeWindow`
//! - **`cache`**: `IntervalCache` (merged, non-overlapping segments) and
//!   `CalendarCache` (recurrence expansion, parent inheritance)
//! - **`availability`**: Working-time queries on a `CalendarCache`
//! - **`validation`**: Definition integrity checks (missing unspecified time,
//!   duplicate IDs, inverted intervals)
//! - **`config`**: `CacheConfig` and `ProjectSettings`
//! - **`error`**: `CalendarError`
//!
//! # Architecture
//!
//! This crate sits at Layer 3 (Frameworks) in the U-Engine ecosystem, next
//! to `u-schedule`. It holds calendar logic only — no task or resource
//! concepts — and is single-threaded: callers own the cache and drive fills.
//!
//! # References
//!
//! - RFC 5545, "Internet Calendaring and Scheduling Core Object Specification"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

pub mod availability;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod validation;

pub use error::{CalendarError, Result};
