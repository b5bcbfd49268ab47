//! Trait definitions for Upwind operations.
//!
//! Each resource type implements the traits its endpoints support,
//! encapsulating path, pagination and status differences in the
//! implementations.

mod create;
mod delete;
mod get;
mod list;
mod update;

pub use create::Create;
pub use delete::Delete;
pub use get::Get;
pub use list::List;
pub use update::Update;
