//! Output format selection

use std::fmt;

/// Wire format of a rendered profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
    Text,
}

impl Format {
    /// Parse a `format` query value
    ///
    /// Matching is case-insensitive and total: anything unrecognized is JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "xml" => Format::Xml,
            "text" | "plain" | "plaintext" => Format::Text,
            _ => Format::Json,
        }
    }

    /// Canonical name, used in cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Text => "text",
        }
    }

    pub fn content_type(&self) -> &'static str {
        content_type(*self)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Content-Type` header value for a format
pub fn content_type(format: Format) -> &'static str {
    match format {
        Format::Json => "application/json; charset=utf-8",
        Format::Xml => "application/xml; charset=utf-8",
        Format::Text => "text/plain; charset=utf-8",
    }
}
