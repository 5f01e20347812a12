//! Demo domain tools for the Courtside agents.
//!
//! The orchestrator only knows the [`courtside_agent::AgentAction`] seam;
//! this crate supplies the concrete implementation backed by an in-memory
//! basketball equipment catalog, customer book, and order pipeline.
//!
//! # Layout
//!
//! - [`store`] owns the shared demo data behind an `Arc<Mutex<_>>`.
//! - [`inventory`], [`pricing`], [`customer`], and [`sales`] are pure
//!   formatting functions over the store.
//! - [`action`] wires the four agents to those functions and enforces that
//!   each operation is covered by the scopes the token exchange granted.

pub mod action;
pub mod customer;
pub mod inventory;
pub mod pricing;
pub mod sales;
pub mod store;

pub use action::DomainAgentAction;
pub use store::{DemoStore, StoreError};
