//! Record-boundary matching.
//!
//! The tokenizer treats matching as an opaque capability: find the
//! earliest match at or after an offset, with a flag saying whether
//! end-of-input anchoring may fire. Engines are shared across streams via
//! `Arc<dyn Pattern>`.

use memchr::memmem;
use regex::bytes::Regex;

use crate::errors::ShuffleError;

/// Half-open span of a boundary match within a haystack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start of the matched delimiter.
    pub start: usize,
    /// End of the matched delimiter (and of the record containing it).
    pub end: usize,
}

impl PatternMatch {
    /// Length of the matched delimiter span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` for a zero-width match.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Boundary-matching engine.
pub trait Pattern: Send + Sync {
    /// Find the earliest match in `haystack` starting at or after `start`.
    ///
    /// `end_anchoring_allowed` is `false` while more input may arrive:
    /// constructs that only make sense at true end-of-input must not fire
    /// at a buffer-refill boundary. `Ok(None)` means no match; `Err` is an
    /// engine failure, which callers treat as fatal rather than retrying.
    fn find_at(
        &self,
        haystack: &[u8],
        start: usize,
        end_anchoring_allowed: bool,
    ) -> Result<Option<PatternMatch>, ShuffleError>;
}

/// Fixed byte-string delimiter, matched with a SIMD substring searcher.
///
/// A literal cannot depend on end-of-input, so the anchoring flag is
/// ignored and matches at the buffer end are accepted mid-stream.
#[derive(Clone, Debug)]
pub struct LiteralPattern {
    finder: memmem::Finder<'static>,
    needle_len: usize,
}

impl LiteralPattern {
    /// Build a matcher for the exact byte sequence `needle`.
    pub fn new(needle: &[u8]) -> Self {
        Self {
            finder: memmem::Finder::new(needle).into_owned(),
            needle_len: needle.len(),
        }
    }
}

impl Pattern for LiteralPattern {
    fn find_at(
        &self,
        haystack: &[u8],
        start: usize,
        _end_anchoring_allowed: bool,
    ) -> Result<Option<PatternMatch>, ShuffleError> {
        Ok(self.finder.find(&haystack[start..]).map(|pos| PatternMatch {
            start: start + pos,
            end: start + pos + self.needle_len,
        }))
    }
}

/// Regex delimiter over raw bytes.
///
/// The regex engine has no per-call "not end of line" flag, so suppressed
/// end-anchoring is realized by refusing any match that ends exactly at
/// the haystack end while more input may arrive. Such a match is found
/// again after the next refill, or at end-of-input with anchoring
/// allowed, so the refusal costs at most one extra read and never splits
/// a record incorrectly.
#[derive(Clone, Debug)]
pub struct RegexPattern {
    regex: Regex,
}

impl RegexPattern {
    /// Wrap an already-compiled regex.
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }

    /// Compile `pattern` as a byte-oriented regex.
    pub fn compile(pattern: &str) -> Result<Self, ShuffleError> {
        let regex = Regex::new(pattern)
            .map_err(|error| ShuffleError::PatternEngine(error.to_string()))?;
        Ok(Self { regex })
    }
}

impl Pattern for RegexPattern {
    fn find_at(
        &self,
        haystack: &[u8],
        start: usize,
        end_anchoring_allowed: bool,
    ) -> Result<Option<PatternMatch>, ShuffleError> {
        match self.regex.find_at(haystack, start) {
            Some(found) if !end_anchoring_allowed && found.end() == haystack.len() => Ok(None),
            Some(found) => Ok(Some(PatternMatch {
                start: found.start(),
                end: found.end(),
            })),
            None => Ok(None),
        }
    }
}
