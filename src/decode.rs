//! Byte-to-text decoding.
//!
//! Candidate order:
//! 1. BOM (Byte Order Mark) - most reliable
//! 2. Caller-supplied labels (response charset first, then preferred labels)
//! 3. chardetng statistical detection, when deep discovery is enabled
//! 4. Fallback chain (UTF-8, then Windows-1252)
//!
//! Every candidate is tried strictly: malformed input moves on to the next
//! candidate instead of producing replacement characters.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// How a Document's fetched bytes are turned into text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodingStrategy {
    /// Encoding labels tried before detection and fallbacks (e.g. `latin1`).
    #[serde(default)]
    pub preferred: Vec<String>,
    /// Enable statistical detection before the fallback chain.
    #[serde(default)]
    pub deep_discovery: bool,
}

/// Decoding failures.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// No candidate encoding decoded the input without errors.
    #[error("could not decode {len} bytes with any candidate encoding (tried: {tried})")]
    NoCandidate {
        /// Input length in bytes.
        len: usize,
        /// Names of the encodings that were tried.
        tried: String,
    },
}

/// Decoding collaborator.
#[derive(Debug, Clone)]
pub struct Decoder {
    fallbacks: Vec<&'static Encoding>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            fallbacks: vec![UTF_8, WINDOWS_1252],
        }
    }
}

impl Decoder {
    /// Creates a decoder with a custom fallback chain.
    #[must_use]
    pub fn with_fallbacks(fallbacks: Vec<&'static Encoding>) -> Self {
        Self { fallbacks }
    }

    /// Decodes `bytes`, trying `tried_first` labels before anything else.
    ///
    /// Unknown labels are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NoCandidate`] if every candidate fails.
    pub fn decode(
        &self,
        bytes: &[u8],
        tried_first: &[String],
        deep_discovery: bool,
    ) -> Result<String, DecodeError> {
        if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
            trace!(encoding = encoding.name(), "decoding by BOM");
            if let Some(text) =
                encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            {
                return Ok(text.into_owned());
            }
        }

        let mut tried: Vec<&'static str> = Vec::new();

        for label in tried_first {
            let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) else {
                debug!(label = %label, "unknown encoding label, skipping");
                continue;
            };
            if let Some(text) = try_strict(encoding, bytes, &mut tried) {
                return Ok(text);
            }
        }

        if deep_discovery {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            let encoding = detector.guess(None, true);
            debug!(encoding = encoding.name(), "statistical detection guess");
            if let Some(text) = try_strict(encoding, bytes, &mut tried) {
                return Ok(text);
            }
        }

        for encoding in &self.fallbacks {
            if let Some(text) = try_strict(*encoding, bytes, &mut tried) {
                return Ok(text);
            }
        }

        Err(DecodeError::NoCandidate {
            len: bytes.len(),
            tried: tried.join(", "),
        })
    }
}

fn try_strict(
    encoding: &'static Encoding,
    bytes: &[u8],
    tried: &mut Vec<&'static str>,
) -> Option<String> {
    tried.push(encoding.name());
    let decoded = encoding.decode_without_bom_handling_and_without_replacement(bytes);
    if decoded.is_none() {
        trace!(encoding = encoding.name(), "strict decode failed");
    }
    decoded.map(std::borrow::Cow::into_owned)
}
