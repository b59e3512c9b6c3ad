//! Commerce bot handlers

mod callbacks;
mod commands;
mod inline;
mod messages;
pub mod schema;
mod screens;
pub mod types;

pub use schema::schema;
pub use types::{catch_boundary, HandlerDeps, HandlerError};
