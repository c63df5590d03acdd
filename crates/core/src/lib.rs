//! Core business logic for Gatepass.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Token types, approval policy, the transition function and the service that
//! commits transitions through a storage seam all live here.
//!
//! # Modules
//!
//! - `token` - Token authorization workflow

pub mod token;
