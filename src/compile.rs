/*!
Compilation from an expression tree to a program.

Compilation is a single left-to-right emission pass. Forward references are
represented as holes: an emitted instruction whose successor is not yet
known stays in an uncompiled state until a later `fill` rewrites it with a
concrete target. Each sub-expression compiles to a `Patch` carrying its
entry point and the holes for its unresolved exits, and the parent stitches
patches together.
*/

use log::debug;

use crate::ast::{Ast, Expr, ExprId};
use crate::input::Look;
use crate::interval::ByteClass;
use crate::prog::{Inst, InstPtr, Program};

/// Compile a parsed pattern into a program.
pub(crate) fn compile(ast: Ast) -> Program {
    Compiler::new(ast).compile()
}

/// Metadata about a compiled fragment: where it starts and which of its
/// instructions still need their exits patched.
#[derive(Debug)]
struct Patch {
    hole: Hole,
    entry: InstPtr,
}

/// Zero or more instruction exits awaiting a target.
#[derive(Debug)]
enum Hole {
    None,
    One(InstPtr),
    Many(Vec<Hole>),
}

struct Compiler {
    ast: Ast,
    insts: Vec<MaybeInst>,
    next_slot: usize,
}

impl Compiler {
    fn new(ast: Ast) -> Compiler {
        Compiler { ast, insts: vec![], next_slot: 0 }
    }

    /// The program layout is fixed: a whole-match capture pair around the
    /// root expression, a single `Match`, then a two-instruction
    /// split/dot loop that implements unanchored entry by advancing the
    /// start position one non-newline byte at a time.
    fn compile(mut self) -> Program {
        let save0 = self.push_hole(InstHole::Save { slot: 0 });
        self.next_slot = 2;
        let root = self.ast.root();
        let patch = self.c(root);
        self.fill(save0, patch.entry);
        self.fill_to_next(patch.hole);
        let save1 = self.push_hole(InstHole::Save { slot: 1 });
        self.fill_to_next(save1);
        self.push_compiled(Inst::Match);

        let find_start = self.insts.len();
        self.push_compiled(Inst::Split { out: 0, other: find_start + 1 });
        self.push_compiled(Inst::Dot { out: find_start });

        let insts: Vec<Inst> =
            self.insts.into_iter().map(|inst| inst.unwrap()).collect();
        let prefix_byte = prefix_byte(&insts);
        debug!(
            "compiled program: {} instructions, {} slots, prefix byte {:?}",
            insts.len(),
            self.next_slot,
            prefix_byte,
        );
        Program::new(insts, 0, find_start, self.next_slot, prefix_byte)
    }

    fn c(&mut self, id: ExprId) -> Patch {
        match *self.ast.get(id) {
            Expr::Empty => self.c_empty(),
            Expr::Literal(byte) => self.c_byte(byte),
            Expr::Dot => self.c_dot(),
            // Classes are cloned out of the arena rather than moved:
            // counted repetitions compile the same subtree once per copy.
            Expr::Class(ref set) => {
                let set = set.clone();
                self.c_class(set)
            }
            Expr::Assert(look) => self.c_assert(look),
            Expr::Group { expr, capturing } => self.c_group(expr, capturing),
            Expr::Repeat { expr, min, max, greedy } => {
                self.c_repeat(expr, min, max, greedy)
            }
            Expr::Concat(ref children) => {
                let children = children.clone();
                self.c_concat(&children)
            }
            Expr::Alternate(ref children) => {
                let children = children.clone();
                self.c_alternate(&children)
            }
            Expr::OpenGroup { .. } => {
                unreachable!("open-group marker survived parsing")
            }
        }
    }

    /// The empty expression consumes nothing. A jump gives it an entry
    /// point without affecting execution.
    fn c_empty(&mut self) -> Patch {
        let hole = self.push_hole(InstHole::Jump);
        Patch { hole, entry: self.insts.len() - 1 }
    }

    fn c_byte(&mut self, byte: u8) -> Patch {
        let hole = self.push_hole(InstHole::Byte { byte });
        Patch { hole, entry: self.insts.len() - 1 }
    }

    fn c_dot(&mut self) -> Patch {
        let hole = self.push_hole(InstHole::Dot);
        Patch { hole, entry: self.insts.len() - 1 }
    }

    fn c_class(&mut self, set: ByteClass) -> Patch {
        let hole = self.push_hole(InstHole::Ranges { set });
        Patch { hole, entry: self.insts.len() - 1 }
    }

    fn c_assert(&mut self, look: Look) -> Patch {
        let hole = self.push_hole(InstHole::Assert { look });
        Patch { hole, entry: self.insts.len() - 1 }
    }

    /// Capturing groups claim the next slot pair in descent order, which
    /// makes the whole-match group index 0 and numbers the rest by the
    /// position of their `(` in the pattern.
    fn c_group(&mut self, expr: ExprId, capturing: bool) -> Patch {
        if !capturing {
            return self.c(expr);
        }
        let slot = self.next_slot;
        self.next_slot += 2;
        let entry = self.insts.len();
        let open = self.push_hole(InstHole::Save { slot });
        let p = self.c(expr);
        self.fill(open, p.entry);
        self.fill_to_next(p.hole);
        let close = self.push_hole(InstHole::Save { slot: slot + 1 });
        Patch { hole: close, entry }
    }

    fn c_concat(&mut self, children: &[ExprId]) -> Patch {
        let first = self.c(children[0]);
        let entry = first.entry;
        let mut hole = first.hole;
        for &child in &children[1..] {
            let p = self.c(child);
            self.fill(hole, p.entry);
            hole = p.hole;
        }
        Patch { hole, entry }
    }

    /// Alternatives compile to a chain of splits. Each split tries its
    /// branch body first and defers to the next split at lower priority;
    /// the final alternative is compiled inline with no split of its own.
    fn c_alternate(&mut self, children: &[ExprId]) -> Patch {
        let entry = self.insts.len();
        let mut holes = vec![];
        let mut prev_split: Option<Hole> = None;
        for &child in &children[..children.len() - 1] {
            if let Some(split) = prev_split.take() {
                // The previous split is already half filled, so a plain
                // fill resolves its remaining low priority edge.
                self.fill_to_next(split);
            }
            let split = self.push_split_hole();
            let p = self.c(child);
            holes.push(p.hole);
            prev_split = Some(self.fill_split(split, Some(p.entry), None));
        }
        if let Some(split) = prev_split.take() {
            self.fill_to_next(split);
        }
        let p = self.c(children[children.len() - 1]);
        holes.push(p.hole);
        Patch { hole: Hole::Many(holes), entry }
    }

    fn c_repeat(
        &mut self,
        expr: ExprId,
        min: usize,
        max: Option<usize>,
        greedy: bool,
    ) -> Patch {
        match (min, max) {
            (0, Some(0)) => self.c_empty(),
            (0, None) => self.c_star(expr, greedy),
            (1, None) => self.c_plus(expr, greedy),
            (0, Some(1)) => self.c_question(expr, greedy),
            (min, None) => {
                let p = self.c_chain(expr, min);
                self.fill_to_next(p.hole);
                let star = self.c_star(expr, greedy);
                Patch { hole: star.hole, entry: p.entry }
            }
            (min, Some(max)) if min == max => self.c_chain(expr, min),
            (min, Some(max)) => self.c_repeat_range(expr, min, max, greedy),
        }
    }

    /// `e*`: a split that either enters the body or skips it, with the
    /// body jumping back to the split after each iteration. Greediness
    /// decides which side of the split is tried first.
    fn c_star(&mut self, expr: ExprId, greedy: bool) -> Patch {
        let entry = self.insts.len();
        let split = self.push_split_hole();
        let p = self.c(expr);
        self.fill_to_next(p.hole);
        self.push_compiled(Inst::Jump { out: entry });
        let hole = if greedy {
            self.fill_split(split, Some(p.entry), None)
        } else {
            self.fill_split(split, None, Some(p.entry))
        };
        Patch { hole, entry }
    }

    /// `e+`: the body followed by a split that loops back to it.
    fn c_plus(&mut self, expr: ExprId, greedy: bool) -> Patch {
        let p = self.c(expr);
        self.fill_to_next(p.hole);
        let split = self.push_split_hole();
        let hole = if greedy {
            self.fill_split(split, Some(p.entry), None)
        } else {
            self.fill_split(split, None, Some(p.entry))
        };
        Patch { hole, entry: p.entry }
    }

    /// `e?`: a split into the body or past it. Both the split's skip edge
    /// and the body's exit flow to the same place.
    fn c_question(&mut self, expr: ExprId, greedy: bool) -> Patch {
        let entry = self.insts.len();
        let split = self.push_split_hole();
        let p = self.c(expr);
        let split_hole = if greedy {
            self.fill_split(split, Some(p.entry), None)
        } else {
            self.fill_split(split, None, Some(p.entry))
        };
        Patch { hole: Hole::Many(vec![split_hole, p.hole]), entry }
    }

    /// `count` mandatory copies of `expr` compiled back to back.
    fn c_chain(&mut self, expr: ExprId, count: usize) -> Patch {
        debug_assert!(count >= 1);
        let first = self.c(expr);
        let entry = first.entry;
        let mut hole = first.hole;
        for _ in 1..count {
            let p = self.c(expr);
            self.fill(hole, p.entry);
            hole = p.hole;
        }
        Patch { hole, entry }
    }

    /// `e{min,max}` with `min < max`: the mandatory copies followed by
    /// `max - min` optional ones. Every optional copy's skip edge exits
    /// the whole repetition, so the collected holes all flow to the same
    /// target.
    fn c_repeat_range(
        &mut self,
        expr: ExprId,
        min: usize,
        max: usize,
        greedy: bool,
    ) -> Patch {
        let mut holes = vec![];
        let (entry, mut prev_hole) = if min > 0 {
            let p = self.c_chain(expr, min);
            (p.entry, p.hole)
        } else {
            (self.insts.len(), Hole::None)
        };
        for _ in min..max {
            self.fill_to_next(prev_hole);
            let split = self.push_split_hole();
            let p = self.c(expr);
            prev_hole = p.hole;
            let skip = if greedy {
                self.fill_split(split, Some(p.entry), None)
            } else {
                self.fill_split(split, None, Some(p.entry))
            };
            holes.push(skip);
        }
        holes.push(prev_hole);
        Patch { hole: Hole::Many(holes), entry }
    }

    fn fill(&mut self, hole: Hole, goto: InstPtr) {
        match hole {
            Hole::None => {}
            Hole::One(pc) => self.insts[pc].fill(goto),
            Hole::Many(holes) => {
                for hole in holes {
                    self.fill(hole, goto);
                }
            }
        }
    }

    fn fill_to_next(&mut self, hole: Hole) {
        let next = self.insts.len();
        self.fill(hole, next);
    }

    /// Resolve one or both edges of a pending split, returning a hole for
    /// whichever edge remains open.
    fn fill_split(
        &mut self,
        hole: Hole,
        goto1: Option<InstPtr>,
        goto2: Option<InstPtr>,
    ) -> Hole {
        match hole {
            Hole::None => Hole::None,
            Hole::One(pc) => match (goto1, goto2) {
                (Some(goto1), Some(goto2)) => {
                    self.insts[pc].fill_split(goto1, goto2);
                    Hole::None
                }
                (Some(goto1), None) => {
                    self.insts[pc].half_fill_split_goto1(goto1);
                    Hole::One(pc)
                }
                (None, Some(goto2)) => {
                    self.insts[pc].half_fill_split_goto2(goto2);
                    Hole::One(pc)
                }
                (None, None) => {
                    unreachable!("at least one split edge must be filled")
                }
            },
            Hole::Many(holes) => {
                let mut new_holes = vec![];
                for hole in holes {
                    new_holes.push(self.fill_split(hole, goto1, goto2));
                }
                if new_holes.is_empty() {
                    Hole::None
                } else if new_holes.len() == 1 {
                    new_holes.pop().unwrap()
                } else {
                    Hole::Many(new_holes)
                }
            }
        }
    }

    fn push_compiled(&mut self, inst: Inst) {
        self.insts.push(MaybeInst::Compiled(inst));
    }

    fn push_hole(&mut self, inst: InstHole) -> Hole {
        let hole = self.insts.len();
        self.insts.push(MaybeInst::Uncompiled(inst));
        Hole::One(hole)
    }

    fn push_split_hole(&mut self) -> Hole {
        let hole = self.insts.len();
        self.insts.push(MaybeInst::Split);
        Hole::One(hole)
    }
}

/// An instruction that may still be waiting for its successors.
#[derive(Clone, Debug)]
enum MaybeInst {
    Compiled(Inst),
    Uncompiled(InstHole),
    Split,
    Split1(InstPtr),
    Split2(InstPtr),
}

impl MaybeInst {
    fn fill(&mut self, goto: InstPtr) {
        let filled = match *self {
            MaybeInst::Uncompiled(ref inst) => {
                MaybeInst::Compiled(inst.fill(goto))
            }
            MaybeInst::Split => MaybeInst::Split1(goto),
            MaybeInst::Split1(goto1) => {
                MaybeInst::Compiled(Inst::Split { out: goto1, other: goto })
            }
            MaybeInst::Split2(goto2) => {
                MaybeInst::Compiled(Inst::Split { out: goto, other: goto2 })
            }
            ref inst => unreachable!(
                "cannot fill already compiled instruction: {:?}",
                inst
            ),
        };
        *self = filled;
    }

    fn fill_split(&mut self, goto1: InstPtr, goto2: InstPtr) {
        let filled = match *self {
            MaybeInst::Split => Inst::Split { out: goto1, other: goto2 },
            ref inst => unreachable!(
                "must be called on an unfilled split: {:?}",
                inst
            ),
        };
        *self = MaybeInst::Compiled(filled);
    }

    fn half_fill_split_goto1(&mut self, goto1: InstPtr) {
        let filled = match *self {
            MaybeInst::Split => MaybeInst::Split1(goto1),
            ref inst => unreachable!(
                "must be called on an unfilled split: {:?}",
                inst
            ),
        };
        *self = filled;
    }

    fn half_fill_split_goto2(&mut self, goto2: InstPtr) {
        let filled = match *self {
            MaybeInst::Split => MaybeInst::Split2(goto2),
            ref inst => unreachable!(
                "must be called on an unfilled split: {:?}",
                inst
            ),
        };
        *self = filled;
    }

    fn unwrap(self) -> Inst {
        match self {
            MaybeInst::Compiled(inst) => inst,
            inst => unreachable!(
                "all instructions should be compiled: {:?}",
                inst
            ),
        }
    }
}

/// A partially known instruction waiting for its `out` edge.
#[derive(Clone, Debug)]
enum InstHole {
    Byte { byte: u8 },
    Ranges { set: ByteClass },
    Dot,
    Assert { look: Look },
    Save { slot: usize },
    Jump,
}

impl InstHole {
    fn fill(&self, goto: InstPtr) -> Inst {
        match *self {
            InstHole::Byte { byte } => Inst::Byte { out: goto, byte },
            InstHole::Ranges { ref set } => {
                Inst::Ranges { out: goto, set: set.clone() }
            }
            InstHole::Dot => Inst::Dot { out: goto },
            InstHole::Assert { look } => Inst::Assert { out: goto, look },
            InstHole::Save { slot } => Inst::Save { out: goto, slot },
            InstHole::Jump => Inst::Jump { out: goto },
        }
    }
}

/// A byte every match must begin with, discovered by following zero-width
/// instructions from the anchored entry point.
fn prefix_byte(insts: &[Inst]) -> Option<u8> {
    let mut pc = 0;
    for _ in 0..insts.len() {
        match insts[pc] {
            Inst::Save { out, .. } | Inst::Jump { out } => pc = out,
            Inst::Byte { byte, .. } => return Some(byte),
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parser;

    fn program(pattern: &str) -> Program {
        compile(Parser::new().parse(pattern.as_bytes()).unwrap())
    }

    fn assert_targets_in_bounds(prog: &Program) {
        for (pc, inst) in prog.insts().iter().enumerate() {
            match *inst {
                Inst::Byte { out, .. }
                | Inst::Ranges { out, .. }
                | Inst::Dot { out }
                | Inst::Assert { out, .. }
                | Inst::Save { out, .. }
                | Inst::Jump { out } => {
                    assert!(out < prog.len(), "pc {} escapes program", pc);
                }
                Inst::Split { out, other } => {
                    assert!(out < prog.len(), "pc {} escapes program", pc);
                    assert!(other < prog.len(), "pc {} escapes program", pc);
                }
                Inst::Match => {}
            }
        }
        assert!(prog.start() < prog.len());
        assert!(prog.find_start() < prog.len());
    }

    #[test]
    fn literal_layout() {
        let prog = program("a");
        assert_eq!(prog.len(), 6);
        assert!(matches!(prog[0], Inst::Save { out: 1, slot: 0 }));
        assert!(matches!(prog[1], Inst::Byte { out: 2, byte: b'a' }));
        assert!(matches!(prog[2], Inst::Save { out: 3, slot: 1 }));
        assert!(matches!(prog[3], Inst::Match));
        assert!(matches!(prog[4], Inst::Split { out: 0, other: 5 }));
        assert!(matches!(prog[5], Inst::Dot { out: 4 }));
        assert_eq!(prog.start(), 0);
        assert_eq!(prog.find_start(), 4);
    }

    #[test]
    fn star_priority() {
        // Greedy: the split prefers the body.
        let prog = program("a*");
        assert!(matches!(prog[1], Inst::Split { out: 2, other: 4 }));
        assert!(matches!(prog[2], Inst::Byte { out: 3, byte: b'a' }));
        assert!(matches!(prog[3], Inst::Jump { out: 1 }));

        // Non-greedy: the split prefers the skip.
        let prog = program("a*?");
        assert!(matches!(prog[1], Inst::Split { out: 4, other: 2 }));
    }

    #[test]
    fn plus_loops_back() {
        let prog = program("a+");
        assert!(matches!(prog[1], Inst::Byte { out: 2, byte: b'a' }));
        assert!(matches!(prog[2], Inst::Split { out: 1, other: 3 }));

        let prog = program("a+?");
        assert!(matches!(prog[2], Inst::Split { out: 3, other: 1 }));
    }

    #[test]
    fn exactly_one_match_inst() {
        for pattern in ["a", "a|b|c", "(a*)(b{2,4})", "x{3,}"] {
            let prog = program(pattern);
            let matches = prog
                .insts()
                .iter()
                .filter(|inst| matches!(inst, Inst::Match))
                .count();
            assert_eq!(matches, 1, "pattern: {}", pattern);
        }
    }

    #[test]
    fn slots_assigned_left_to_right() {
        let prog = program("(a)(b)");
        assert_eq!(prog.slot_count(), 6);
        let saves: Vec<usize> = prog
            .insts()
            .iter()
            .filter_map(|inst| match *inst {
                Inst::Save { slot, .. } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(saves, vec![0, 2, 3, 4, 5, 1]);
    }

    #[test]
    fn nested_groups_number_outside_in() {
        let prog = program("(a(b))");
        assert_eq!(prog.slot_count(), 6);
        let saves: Vec<usize> = prog
            .insts()
            .iter()
            .filter_map(|inst| match *inst {
                Inst::Save { slot, .. } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(saves, vec![0, 2, 4, 5, 3, 1]);
    }

    #[test]
    fn non_capturing_group_emits_no_saves() {
        let prog = program("(?:ab)");
        assert_eq!(prog.slot_count(), 2);
        let saves = prog
            .insts()
            .iter()
            .filter(|inst| matches!(inst, Inst::Save { .. }))
            .count();
        assert_eq!(saves, 2);
    }

    #[test]
    fn counted_repeats_unroll() {
        let prog = program("a{3}");
        let bytes = prog
            .insts()
            .iter()
            .filter(|inst| matches!(inst, Inst::Byte { .. }))
            .count();
        assert_eq!(bytes, 3);

        let prog = program("a{2,4}");
        let bytes = prog
            .insts()
            .iter()
            .filter(|inst| matches!(inst, Inst::Byte { .. }))
            .count();
        assert_eq!(bytes, 4);
        let splits = prog
            .insts()
            .iter()
            .filter(|inst| matches!(inst, Inst::Split { .. }))
            .count();
        // Two optional copies plus the unanchored prologue.
        assert_eq!(splits, 3);
    }

    #[test]
    fn prefix_byte_through_saves() {
        assert_eq!(program("abc").prefix_byte(), Some(b'a'));
        assert_eq!(program("(ab)c").prefix_byte(), Some(b'a'));
        assert_eq!(program("a|b").prefix_byte(), None);
        assert_eq!(program(".a").prefix_byte(), None);
        assert_eq!(program("[ab]").prefix_byte(), None);
        assert_eq!(program("^a").prefix_byte(), None);
        assert_eq!(program("a*").prefix_byte(), None);
    }

    #[test]
    fn targets_always_in_bounds() {
        for pattern in [
            "", "a", "abc", "a|b", "a|b|c", "(a|b)*c", "[a-z]+", r"\d{2,4}",
            "(?:ab)+?", "a.b|c.d", "^hello world$", r"\bx\b", "x{3,}",
            "a{0,3}", "a{0}", "((a)(b(c)))*", "a+?b*?c??",
        ] {
            assert_targets_in_bounds(&program(pattern));
        }
    }
}
