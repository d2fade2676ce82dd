//! Gallery feed records and their XML mapping.
//!
//! The collection feed lists a user's albums as [`Collection`]s; each
//! collection links to an item feed listing its photos as [`Item`]s.

mod error;
mod model;
mod parse;

pub use error::FeedError;
pub use model::{Collection, Item};
pub use parse::{ITEM_FEED_REL, parse_collections, parse_items};
