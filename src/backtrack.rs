/*!
A bounded backtracking engine.

Backtracking explores the program depth first, which makes it fast on small
programs: there is no per-position bookkeeping beyond a visited bitset, and
the common case runs straight through the bytecode. The bitset records every
`(pc, position)` pair ever entered, so no pair is explored twice and total
work is bounded by `program length * input length` even for pathological
patterns.

The bitset has a fixed capacity, which is what bounds this engine to small
`program * input` products. The dispatcher checks [`should_exec`] and routes
anything larger to the Pike VM.
*/

use crate::input::Input;
use crate::prog::{Inst, InstPtr, Program, Slot};

/// Number of 32-bit words in the visited bitset.
const VISITED_WORDS: usize = 512;

/// Capacity of the visited bitset in bits, one per `(pc, position)` pair.
const VISITED_BITS: usize = 32 * VISITED_WORDS;

/// Returns true when the visited bitset can cover the full cross product
/// of program counters and input positions, including the past-the-end
/// position.
pub(crate) fn should_exec(prog_len: usize, input_len: usize) -> bool {
    (prog_len + 1) * (input_len + 1) < VISITED_BITS
}

/// A unit of pending work.
///
/// `SaveRestore` entries undo capture slot writes when the search
/// backtracks past them, so that an abandoned path leaves no trace in the
/// slot vector.
#[derive(Clone, Copy, Debug)]
enum Job {
    Thread { pc: InstPtr, at: usize },
    SaveRestore { slot: usize, old: Slot },
}

#[derive(Debug)]
pub(crate) struct BoundedBacktracker<'r, 'h> {
    prog: &'r Program,
    input: Input<'h>,
    jobs: Vec<Job>,
    visited: [u32; VISITED_WORDS],
}

impl<'r, 'h> BoundedBacktracker<'r, 'h> {
    pub(crate) fn new(
        prog: &'r Program,
        input: Input<'h>,
    ) -> BoundedBacktracker<'r, 'h> {
        debug_assert!(should_exec(prog.len(), input.len()));
        BoundedBacktracker {
            prog,
            input,
            jobs: vec![],
            visited: [0; VISITED_WORDS],
        }
    }

    /// Run the program from `start` with the cursor at `at`. On success,
    /// `slots` holds the capture positions of the matching path. On
    /// failure every slot write has been undone, so `slots` is returned
    /// exactly as given.
    pub(crate) fn exec(
        &mut self,
        start: InstPtr,
        at: usize,
        slots: &mut [Slot],
    ) -> bool {
        self.jobs.clear();
        self.visited = [0; VISITED_WORDS];
        self.jobs.push(Job::Thread { pc: start, at });
        while let Some(job) = self.jobs.pop() {
            match job {
                Job::Thread { pc, at } => {
                    if self.step(pc, at, slots) {
                        return true;
                    }
                }
                Job::SaveRestore { slot, old } => slots[slot] = old,
            }
        }
        false
    }

    /// Run one thread as far as it goes. Splits push their low priority
    /// side and continue down the high priority side, which gives the
    /// depth first order that encodes match precedence.
    fn step(&mut self, mut pc: InstPtr, mut at: usize, slots: &mut [Slot]) -> bool {
        let prog = self.prog;
        let input = self.input;
        loop {
            if !self.visit(pc, at) {
                return false;
            }
            match prog[pc] {
                Inst::Byte { out, byte } => {
                    if input.get(at) != Some(byte) {
                        return false;
                    }
                    pc = out;
                    at += 1;
                }
                Inst::Ranges { out, ref set } => {
                    match input.get(at) {
                        Some(b) if set.contains(b) => {}
                        _ => return false,
                    }
                    pc = out;
                    at += 1;
                }
                Inst::Dot { out } => {
                    match input.get(at) {
                        Some(b) if b != b'\n' => {}
                        _ => return false,
                    }
                    pc = out;
                    at += 1;
                }
                Inst::Assert { out, look } => {
                    if !look.matches(input.haystack(), at) {
                        return false;
                    }
                    pc = out;
                }
                Inst::Jump { out } => pc = out,
                Inst::Split { out, other } => {
                    self.jobs.push(Job::Thread { pc: other, at });
                    pc = out;
                }
                Inst::Save { out, slot } => {
                    self.jobs.push(Job::SaveRestore { slot, old: slots[slot] });
                    slots[slot] = Some(at);
                    pc = out;
                }
                Inst::Match => return true,
            }
        }
    }

    /// Mark `(pc, at)` as visited, returning false if it already was.
    fn visit(&mut self, pc: InstPtr, at: usize) -> bool {
        let index = pc * (self.input.len() + 1) + at;
        let word = index / 32;
        let bit = 1 << (index % 32);
        if self.visited[word] & bit != 0 {
            return false;
        }
        self.visited[word] |= bit;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::parse::Parser;

    fn program(pattern: &str) -> Program {
        compile(Parser::new().parse(pattern.as_bytes()).unwrap())
    }

    fn run(pattern: &str, haystack: &[u8], anchored: bool) -> (bool, Vec<Slot>) {
        let prog = program(pattern);
        let mut slots = vec![None; prog.slot_count()];
        let start = if anchored { prog.start() } else { prog.find_start() };
        let mut vm = BoundedBacktracker::new(&prog, Input::new(haystack));
        let matched = vm.exec(start, 0, &mut slots);
        (matched, slots)
    }

    #[test]
    fn anchored_literal() {
        assert!(run("abc", b"abc", true).0);
        assert!(run("abc", b"abcd", true).0);
        assert!(!run("abc", b"zabc", true).0);
        assert!(!run("abc", b"ab", true).0);
    }

    #[test]
    fn unanchored_scan() {
        let (matched, slots) = run("bc", b"abcd", false);
        assert!(matched);
        assert_eq!(slots[0], Some(1));
        assert_eq!(slots[1], Some(3));
    }

    #[test]
    fn greedy_star_takes_longest() {
        let (matched, slots) = run("a*", b"aaa", true);
        assert!(matched);
        assert_eq!((slots[0], slots[1]), (Some(0), Some(3)));
    }

    #[test]
    fn lazy_star_takes_shortest() {
        let (matched, slots) = run("a*?", b"aaa", true);
        assert!(matched);
        assert_eq!((slots[0], slots[1]), (Some(0), Some(0)));
    }

    #[test]
    fn alternation_prefers_left() {
        let (matched, slots) = run("(ab|a)", b"ab", true);
        assert!(matched);
        assert_eq!((slots[2], slots[3]), (Some(0), Some(2)));
    }

    #[test]
    fn failed_search_restores_slots() {
        let prog = program("(a)b");
        let mut slots = vec![None; prog.slot_count()];
        let mut vm = BoundedBacktracker::new(&prog, Input::new(b"ac"));
        assert!(!vm.exec(prog.start(), 0, &mut slots));
        assert!(slots.iter().all(|s| s.is_none()));
    }

    #[test]
    fn pathological_alternation_terminates() {
        // Without the visited bitset this would take exponential time.
        let pattern = "(a|a)(a|a)(a|a)(a|a)(a|a)(a|a)(a|a)b";
        assert!(!run(pattern, b"aaaaaaac", false).0);
    }

    #[test]
    fn eligibility_gate() {
        assert!(should_exec(10, 10));
        assert!(should_exec(100, 100));
        assert!(!should_exec(512, 32));
        assert!(!should_exec(16384, 0));
        // The bound is strict: 128 * 128 is exactly the bitset capacity.
        assert!(!should_exec(127, 127));
    }
}
