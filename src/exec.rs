/*!
Engine selection and search entry points.

Both engines implement the same contract: run the program from an entry
point, report whether a match exists, and on success fill the capture slot
vector identically. The backtracker wins on small `program * input`
products, so it is used whenever its visited bitset can cover the search,
and the Pike VM picks up everything else with its linear worst case.

Unanchored searches normally run the program's find-start loop, which
advances the candidate start position one non-newline byte at a time in
bytecode. When every match must begin with one known literal byte, the
candidate positions are found with `memchr` instead and each is tried with
an anchored run, which skips the bytecode loop entirely.
*/

use log::trace;
use memchr::{memchr, memchr_iter};

use crate::backtrack::{self, BoundedBacktracker};
use crate::input::Input;
use crate::pikevm::PikeVm;
use crate::prog::{InstPtr, Program, Slot};

/// Run an anchored search: the match must begin at position 0.
pub(crate) fn exec_anchored(
    prog: &Program,
    haystack: &[u8],
    slots: &mut [Slot],
) -> bool {
    exec_at(prog, haystack, prog.start(), 0, slots)
}

/// Run an unanchored search: the match may begin anywhere the find-start
/// loop can reach.
pub(crate) fn exec_unanchored(
    prog: &Program,
    haystack: &[u8],
    slots: &mut [Slot],
) -> bool {
    if let Some(byte) = prog.prefix_byte() {
        return exec_prefilter(prog, haystack, byte, slots);
    }
    exec_at(prog, haystack, prog.find_start(), 0, slots)
}

fn exec_at(
    prog: &Program,
    haystack: &[u8],
    start: InstPtr,
    at: usize,
    slots: &mut [Slot],
) -> bool {
    let input = Input::new(haystack);
    if backtrack::should_exec(prog.len(), haystack.len()) {
        trace!("search via bounded backtracker at {}", at);
        BoundedBacktracker::new(prog, input).exec(start, at, slots)
    } else {
        trace!("search via pike vm at {}", at);
        PikeVm::new(prog, input).exec(start, at, slots)
    }
}

/// Try an anchored run at every occurrence of the mandatory first byte.
///
/// The find-start loop consumes candidate prefixes with a dot, so it can
/// never move past a newline; candidate offsets are limited to at most the
/// first newline to keep the two strategies byte-for-byte equivalent.
/// Candidates are tried left to right, which preserves leftmost precedence.
fn exec_prefilter(
    prog: &Program,
    haystack: &[u8],
    byte: u8,
    slots: &mut [Slot],
) -> bool {
    let limit =
        memchr(b'\n', haystack).map_or(haystack.len(), |nl| nl + 1);
    for at in memchr_iter(byte, &haystack[..limit]) {
        trace!("prefilter candidate at {}", at);
        if exec_at(prog, haystack, prog.start(), at, slots) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::parse::Parser;

    fn program(pattern: &str) -> Program {
        compile(Parser::new().parse(pattern.as_bytes()).unwrap())
    }

    /// Run both engines on the same entry point and assert they agree on
    /// the match boolean and every capture slot, then return the shared
    /// result.
    fn both_engines(
        prog: &Program,
        haystack: &[u8],
        start: InstPtr,
    ) -> (bool, Vec<Slot>) {
        let input = Input::new(haystack);

        let mut bt_slots = vec![None; prog.slot_count()];
        let bt_matched = BoundedBacktracker::new(prog, input)
            .exec(start, 0, &mut bt_slots);

        let mut pike_slots = vec![None; prog.slot_count()];
        let pike_matched =
            PikeVm::new(prog, input).exec(start, 0, &mut pike_slots);

        assert_eq!(
            bt_matched, pike_matched,
            "engines disagree on match: haystack {:?}",
            haystack
        );
        if bt_matched {
            assert_eq!(
                bt_slots, pike_slots,
                "engines disagree on slots: haystack {:?}",
                haystack
            );
        }
        (bt_matched, bt_slots)
    }

    const PATTERNS: &[&str] = &[
        "",
        "a",
        "abc",
        "a|b",
        "ab|cd|ef",
        "(ab|a)(b?)",
        "a*",
        "a*?",
        "a+",
        "a+?",
        "a?b",
        "a{2,4}",
        "a{3,}",
        "a{0,2}b",
        "(a|b)*c",
        "[a-z]+",
        "[^a-z]+",
        r"\d+",
        r"\w+\s\w+",
        "^abc$",
        "^a|b$",
        r"\ba\b",
        r"\Ba",
        ".*",
        ".+b",
        "x(y(z))",
        "(a*)*",
        "(a+)+b",
        "(?:ab)+",
    ];

    const HAYSTACKS: &[&[u8]] = &[
        b"",
        b"a",
        b"b",
        b"ab",
        b"ba",
        b"abc",
        b"aab",
        b"aaaa",
        b"aaab",
        b"xyz",
        b"hello world",
        b"abcabc",
        b"  a  ",
        b"Ax",
        b"0123",
        b"a\nb",
        b"\n",
        b"xyzzyab",
    ];

    #[test]
    fn engines_agree_anchored() {
        for pattern in PATTERNS {
            let prog = program(pattern);
            for haystack in HAYSTACKS {
                both_engines(&prog, haystack, prog.start());
            }
        }
    }

    #[test]
    fn engines_agree_unanchored() {
        for pattern in PATTERNS {
            let prog = program(pattern);
            for haystack in HAYSTACKS {
                both_engines(&prog, haystack, prog.find_start());
            }
        }
    }

    #[test]
    fn engines_agree_on_large_inputs() {
        // Large enough that the dispatcher would pick the Pike VM; run
        // both engines explicitly anyway to check the equivalence there.
        let haystack = b"ab".repeat(1000);
        let prog = program("(ab)+");
        assert!(!backtrack::should_exec(prog.len(), haystack.len()));
        // This product is past the backtracker's gate, so only the
        // dispatcher result is checked against a direct Pike VM run.
        let mut slots = vec![None; prog.slot_count()];
        assert!(exec_unanchored(&prog, &haystack, &mut slots));
        let mut pike_slots = vec![None; prog.slot_count()];
        assert!(PikeVm::new(&prog, Input::new(&haystack))
            .exec(prog.find_start(), 0, &mut pike_slots));
        assert_eq!(slots, pike_slots);
    }

    #[test]
    fn prefilter_matches_find_start_loop() {
        // Patterns with a literal prefix byte take the memchr path in
        // exec_unanchored; compare against the raw find-start loop.
        for pattern in ["abc", "b+", "foo(bar)?", r"x\d*"] {
            let prog = program(pattern);
            assert!(prog.prefix_byte().is_some(), "pattern: {}", pattern);
            for haystack in HAYSTACKS {
                let mut fast = vec![None; prog.slot_count()];
                let fast_matched = exec_unanchored(&prog, haystack, &mut fast);

                let mut slow = vec![None; prog.slot_count()];
                let slow_matched =
                    exec_at(&prog, haystack, prog.find_start(), 0, &mut slow);

                assert_eq!(fast_matched, slow_matched, "pattern: {}", pattern);
                if fast_matched {
                    assert_eq!(fast, slow, "pattern: {}", pattern);
                }
            }
        }
    }

    #[test]
    fn prefilter_respects_newline_barrier() {
        // The find-start loop cannot advance past a newline, so a match
        // that exists only after one must not be found.
        let prog = program("b");
        let mut slots = vec![None; prog.slot_count()];
        assert!(!exec_unanchored(&prog, b"a\nb", &mut slots));
        assert!(exec_unanchored(&prog, b"ab\nc", &mut slots));

        // A newline prefix byte may match exactly at the barrier.
        let prog = program(r"\n");
        let mut slots = vec![None; prog.slot_count()];
        assert!(exec_unanchored(&prog, b"ab\ncd", &mut slots));
        assert_eq!(slots[0], Some(2));
    }

    quickcheck::quickcheck! {
        fn prop_engines_agree(haystack: Vec<u8>, seed: usize) -> bool {
            // Keep the haystack in backtracker range so both engines stay
            // comparable, and draw bytes from a small alphabet so the
            // patterns have a chance of matching.
            let haystack: Vec<u8> = haystack
                .into_iter()
                .take(40)
                .map(|b| b"ab \n"[b as usize % 4])
                .collect();
            let pattern = PATTERNS[seed % PATTERNS.len()];
            let prog = program(pattern);

            let input = Input::new(&haystack);
            let mut bt = vec![None; prog.slot_count()];
            let bt_matched = BoundedBacktracker::new(&prog, input)
                .exec(prog.find_start(), 0, &mut bt);
            let mut pike = vec![None; prog.slot_count()];
            let pike_matched = PikeVm::new(&prog, input)
                .exec(prog.find_start(), 0, &mut pike);

            bt_matched == pike_matched && (!bt_matched || bt == pike)
        }
    }
}
