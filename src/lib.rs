/*!
A small byte-oriented regular expression engine.

A pattern is parsed into an expression tree, compiled into a flat NFA
bytecode program, and executed by one of two engines:

- a **bounded backtracker**, a depth first interpreter with a visited
  bitset that caps its work at `program length * input length`, used for
  small searches where its low constant factors win;
- a **Pike VM**, a breadth first simulation with the same worst case bound
  but no size limit, used for everything else.

The engine is chosen per search and the choice is never observable: both
produce the same match results and the same capture positions.

Everything is bytes. Patterns describe bytes, inputs are `&[u8]`, and
capture groups report byte offsets. There is no Unicode awareness of any
kind: `.` matches any byte except `\n`, and `\w`, `\b` and friends use
ASCII rules.

# Example

```
use zre::Regex;

let mut re = Regex::new(r"(\w+)@(\w+)\.com").unwrap();
let caps = re.captures(b"mail me at user@example.com").unwrap();
assert_eq!(caps.slice_at(1), Some(&b"user"[..]));
assert_eq!(caps.slice_at(2), Some(&b"example"[..]));
```

# Supported syntax

- `.` any byte except `\n`; literals; `^` `$` text anchors
- `[a-z]`, `[^a-z]` byte classes
- `\d \D \s \S \w \W` class escapes, `\b \B` ASCII word boundaries
- `\n \r \t \a \f \v`, `\x41`, `\x{7f}`, `\101` byte escapes
- `(...)` capturing and `(?:...)` non-capturing groups
- `*` `+` `?` `{m}` `{m,}` `{m,n}` repetition, with `?` for non-greedy
- `|` alternation

[`Regex::is_match`] is anchored at the start of the input;
[`Regex::partial_match`] and [`Regex::captures`] search anywhere. A C ABI
for the same surface lives in [`capi`].
*/

mod ast;
mod backtrack;
pub mod capi;
mod compile;
mod error;
mod exec;
mod input;
mod interval;
mod parse;
mod pikevm;
mod prog;
mod regex;
mod sparse;

pub use crate::{
    error::{Error, ErrorKind},
    parse::{ParseError, ParseErrorKind, DEFAULT_MAX_REPEAT},
    regex::{Captures, Regex, RegexBuilder, Span},
};
