//! Attachment key normalization.
//!
//! Reference keys arrive percent-encoded zero or more times. They are decoded
//! to a fixpoint, validated as absolute URLs, then encoded exactly once for
//! storage on the destination.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Canonical, singly percent-encoded absolute URL.
///
/// Serves as both the destination reference's identity and its payload; the
/// only way to build one outside this module is [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceKey(String);

impl ReferenceKey {
    /// The encoded form, as stored on the destination.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The decoded absolute URL this key stands for.
    pub fn url(&self) -> String {
        urlencoding::decode(&self.0)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| self.0.clone())
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of decoding a raw key to its fixpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub value: String,
    /// Number of decode passes that changed the value.
    pub passes: usize,
    /// Decoding failed or produced an empty string; `value` is the original.
    pub fell_back: bool,
}

/// A successfully normalized key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub key: ReferenceKey,
    pub passes: usize,
}

/// Why an attachment was rejected.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The decoded value is not an absolute URL.
    #[error("attachment '{alias}' is not an absolute URL: {value}")]
    NotAbsolute {
        alias: String,
        value: String,
        fell_back: bool,
        #[source]
        source: url::ParseError,
    },
}

/// Percent-decode `raw` until a pass makes no change.
///
/// If a pass fails (invalid UTF-8 after decoding) or yields an empty string,
/// the original value is returned with `fell_back` set.
pub fn decode_fully(raw: &str) -> Decoded {
    let mut current = raw.to_owned();
    let mut passes = 0;
    loop {
        let next = match urlencoding::decode(&current) {
            Ok(next) => next.into_owned(),
            Err(_) => return fallback(raw, passes),
        };
        if next.is_empty() {
            return fallback(raw, passes);
        }
        if next == current {
            return Decoded {
                value: current,
                passes,
                fell_back: false,
            };
        }
        current = next;
        passes += 1;
    }
}

/// Decode fully, validate as an absolute URL, and encode once.
///
/// `alias` only feeds the error message.
pub fn normalize(raw: &str, alias: &str) -> Result<Normalized, NormalizeError> {
    let decoded = decode_fully(raw);
    if let Err(source) = Url::parse(&decoded.value) {
        return Err(NormalizeError::NotAbsolute {
            alias: alias.to_owned(),
            value: decoded.value,
            fell_back: decoded.fell_back,
            source,
        });
    }
    Ok(Normalized {
        key: ReferenceKey(urlencoding::encode(&decoded.value).into_owned()),
        passes: decoded.passes,
    })
}

fn fallback(raw: &str, passes: usize) -> Decoded {
    Decoded {
        value: raw.to_owned(),
        passes,
        fell_back: true,
    }
}
