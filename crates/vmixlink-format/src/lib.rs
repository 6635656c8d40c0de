//! # vmixlink format
//!
//! Stateless rendering of profile payloads for polling consumers.
//!
//! ```
//! use vmixlink_format::{render, Format, KeyFilter};
//! use vmixlink_store::Items;
//!
//! let mut items = Items::new();
//! items.insert("score", "3");
//! let filtered = KeyFilter::default().apply_payload(&[items]);
//! let text = render(&filtered, Format::parse("plain")).unwrap();
//! assert_eq!(text, b"score: 3");
//! ```

pub mod error;
pub mod filter;
pub mod format;
pub mod render;
pub mod validate;

pub use error::{FormatError, Result};
pub use filter::KeyFilter;
pub use format::{content_type, Format};
pub use render::render;
pub use validate::{items_from_json, payload_from_json};
