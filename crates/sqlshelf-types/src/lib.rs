//! Shared types for the sqlshelf database registry.

mod command;
mod database;
mod message;
mod query;
mod user;

pub use command::*;
pub use database::*;
pub use message::*;
pub use query::*;
pub use user::*;
