/*!
The public matching interface.
*/

use core::fmt;

use crate::compile;
use crate::error::Error;
use crate::exec;
use crate::parse::{Parser, DEFAULT_MAX_REPEAT};
use crate::prog::{Program, Slot};

/// A compiled regular expression.
///
/// Matching is byte-oriented: patterns describe bytes, not characters, and
/// haystacks are byte slices. The searches take `&mut self` because a
/// compiled regex owns the capture slot buffer its searches write into; to
/// search from several threads at once, give each thread its own `Regex`.
///
/// # Example
///
/// ```
/// use zre::Regex;
///
/// let mut re = Regex::new(r"ab(\d+)").unwrap();
/// assert!(re.partial_match(b"xxxxab0123a"));
///
/// let caps = re.captures(b"xxxxab0123a").unwrap();
/// assert_eq!(caps.slice_at(0), Some(&b"ab0123"[..]));
/// assert_eq!(caps.slice_at(1), Some(&b"0123"[..]));
/// ```
#[derive(Clone)]
pub struct Regex {
    program: Program,
    slots: Vec<Slot>,
    pattern: String,
}

impl Regex {
    /// Compile a pattern with the default configuration.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        RegexBuilder::new().build(pattern)
    }

    /// Return a builder for setting non-default options.
    pub fn builder() -> RegexBuilder {
        RegexBuilder::new()
    }

    /// Returns true if the pattern matches a prefix of `haystack`,
    /// beginning at the first byte.
    pub fn is_match(&mut self, haystack: &[u8]) -> bool {
        self.clear_slots();
        let Regex { ref program, ref mut slots, .. } = *self;
        exec::exec_anchored(program, haystack, slots)
    }

    /// Returns true if the pattern matches anywhere in `haystack`.
    pub fn partial_match(&mut self, haystack: &[u8]) -> bool {
        self.clear_slots();
        let Regex { ref program, ref mut slots, .. } = *self;
        exec::exec_unanchored(program, haystack, slots)
    }

    /// Search `haystack` like [`Regex::partial_match`] and, on a match,
    /// return the capture groups. Group 0 is the whole match.
    pub fn captures<'h>(&mut self, haystack: &'h [u8]) -> Option<Captures<'h>> {
        self.clear_slots();
        let Regex { ref program, ref mut slots, .. } = *self;
        if !exec::exec_unanchored(program, haystack, slots) {
            return None;
        }
        Some(Captures { haystack, slots: self.slots.clone() })
    }

    /// The pattern this regex was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn clear_slots(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Regex").field("pattern", &self.pattern).finish()
    }
}

/// A builder for a [`Regex`].
#[derive(Clone, Debug)]
pub struct RegexBuilder {
    max_repeat: usize,
}

impl RegexBuilder {
    pub fn new() -> RegexBuilder {
        RegexBuilder { max_repeat: DEFAULT_MAX_REPEAT }
    }

    /// Set the maximum permitted count in `{m}`, `{m,}` and `{m,n}`
    /// repetitions. Counted repetitions are unrolled at compile time, so
    /// this bounds compile-time memory use. Defaults to
    /// [`DEFAULT_MAX_REPEAT`].
    pub fn max_repeat(mut self, max_repeat: usize) -> RegexBuilder {
        self.max_repeat = max_repeat;
        self
    }

    pub fn build(&self, pattern: &str) -> Result<Regex, Error> {
        let ast = Parser::new()
            .max_repeat(self.max_repeat)
            .parse(pattern.as_bytes())
            .map_err(Error::parse)?;
        let program = compile::compile(ast);
        Ok(Regex {
            slots: vec![None; program.slot_count()],
            program,
            pattern: pattern.to_owned(),
        })
    }
}

impl Default for RegexBuilder {
    fn default() -> RegexBuilder {
        RegexBuilder::new()
    }
}

/// The half-open byte range of one capture group's match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Span {
    pub lower: usize,
    pub upper: usize,
}

/// The capture groups of a successful search.
///
/// A `Captures` borrows the haystack it was produced from, so the slices
/// it hands out stay valid for as long as the haystack does.
#[derive(Clone, Debug)]
pub struct Captures<'h> {
    haystack: &'h [u8],
    slots: Vec<Slot>,
}

impl<'h> Captures<'h> {
    /// The number of capture groups, counting the whole-match group 0.
    /// This is a property of the pattern, not of the match: groups that
    /// did not participate are still counted.
    pub fn len(&self) -> usize {
        self.slots.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The bounds of group `index`, or `None` if the group did not
    /// participate in the match.
    pub fn bounds_at(&self, index: usize) -> Option<Span> {
        let lower = self.slots.get(index * 2).copied().flatten()?;
        let upper = self.slots.get(index * 2 + 1).copied().flatten()?;
        Some(Span { lower, upper })
    }

    /// The matched bytes of group `index`, or `None` if the group did not
    /// participate in the match.
    pub fn slice_at(&self, index: usize) -> Option<&'h [u8]> {
        let span = self.bounds_at(index)?;
        Some(&self.haystack[span.lower..span.upper])
    }

    pub(crate) fn into_raw_parts(self) -> (*const u8, Vec<Slot>) {
        (self.haystack.as_ptr(), self.slots)
    }
}
