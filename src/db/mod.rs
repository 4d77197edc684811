//! Database module: row mapping and SQL repositories.
//!
//! - `model`: row-to-domain mapping helpers.
//! - `repo`: SQL-only functions (subscriber store + append-only logs).
//!
//! External modules import from `musebot::db`; the repository API is
//! re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;
