//! Repository abstractions for data access.
//!
//! Repositories implement the persistence seams declared in `gatepass-core`,
//! hiding the `SeaORM` details from the rest of the application.

pub mod token;

pub use token::TokenRepository;
