//! Shared configuration and authentication types for Gatepass.
//!
//! This crate provides common types used across all other crates:
//! - Layered application configuration
//! - JWT claims carrying the actor's permissions
//! - JWT signing and verification

pub mod auth;
pub mod config;
pub mod jwt;


pub use auth::Claims;
pub use config::AppConfig;
pub use jwt::{JwtConfig, JwtError, JwtService};
