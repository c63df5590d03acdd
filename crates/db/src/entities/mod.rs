//! `SeaORM` entity definitions.

pub mod tokens;
