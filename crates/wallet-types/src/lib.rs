//! # Shared Wallet Types
//!
//! Domain entities shared across the hw-wallet workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-crate wallet types are defined here.
//! - **Transport Agnostic**: nothing in this crate knows how bytes reach a
//!   device or a node; it only describes accounts and transactions.

pub mod entities;

pub use entities::*;
