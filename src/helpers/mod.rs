//! Helper functions for templates
//!
//! URL generation, date formatting and HTML escaping shared by the
//! generator, the server and the rich-text renderer.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
