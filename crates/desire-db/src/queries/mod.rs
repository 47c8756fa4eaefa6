//! Query functions, one module per table.

pub mod pantry;
pub mod profiles;
