//! # fire-eats
//!
//! A restaurant directory whose list is kept in sync with a live document
//! query. Users narrow the list with category, city and price filters plus a
//! sort field; each change rebuilds the query and replaces the store
//! listener, and every pushed snapshot replaces the displayed rows.
//!
//! The crate is split in two:
//!
//! - [`store`]: the document store contract (queries, listeners, deletes)
//!   and [`store::MemoryStore`], a process-local implementation.
//! - [`restaurants`]: the query builder, live subscription, list
//!   synchronizer, filter state and the [`restaurants::RestaurantList`]
//!   screen that wires them together.
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade; install
//! any logger implementation to see them.

pub mod restaurants;
pub mod store;
