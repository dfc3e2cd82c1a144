//! Entitlement Sync - client-side subscription entitlement reconciliation
//!
//! This crate keeps a client's belief about "is this installation entitled to
//! premium features" consistent with a remote subscription backend, across a
//! checkout that completes in an external browser the client cannot observe.
//!
//! The backend is the single source of truth: local state is only ever a
//! cache of backend-confirmed snapshots, and access fails closed.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
