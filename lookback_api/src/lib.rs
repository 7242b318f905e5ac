//! Client for the Rally Lookback API.
//!
//! Build a snapshot query with the [`Query`] builder methods, run it through a
//! [`Client`], and page through the [`LookbackResult`]s it returns.

mod client;
mod errors;
mod query;
pub mod transport;
pub mod types;
pub use self::client::{Client, ClientConfig, LookbackQuery};
pub use self::errors::Error;
pub use self::query::{Query, QueryDocument, SortDirection, DEFAULT_PAGE_SIZE};
pub use self::types::{LookbackResult, Snapshot};
