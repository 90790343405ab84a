//! Movie browsing state: popular listings, search results, loading and errors.

mod browser;
mod types;

pub use browser::MovieBrowser;
pub use types::*;
