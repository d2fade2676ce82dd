//! Static site output: file layout and page rendering.

mod layout;
mod render;

pub use layout::{STYLESHEET_FILE, SiteError, SiteLayout, safe_segment};
pub use render::{render_collection, render_index, render_redirect};
