//! CLI argument types and parsing helpers.
mod cli;
mod convert;
pub(crate) mod parsers;
mod types;


pub use cli::{Cli, Command, LoadArgs, ServerArgs};
pub use types::{PositiveU64, PositiveUsize};
