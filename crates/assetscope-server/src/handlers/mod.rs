//! Request handlers.
//!
//! - `list` - collection reads, single-object reads, nested and owned
//!   resources, assigned permissions and attachment reports

pub mod list;

pub use list::{ListHandler, RawParams};
