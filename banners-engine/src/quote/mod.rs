//! Quote-of-the-day widget: pick a random tagged block and turn it into HTML.

pub mod extractor;
pub mod sanitize;

pub use extractor::{block_deep_link, font_size_for, Quote, QuoteExtractor};
pub use sanitize::{QuoteSanitizer, SanitizeStep};
