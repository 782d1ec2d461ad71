/*!
The compiled form of a pattern: a flat vector of instructions.

Instruction operands refer to other instructions by index, so a program is
a plain owned value with no interior pointers. Each instruction has one
primary successor `out`; a split carries a second, lower priority successor.
*/

use core::fmt;
use core::ops::Index;

use crate::input::Look;
use crate::interval::ByteClass;

/// An index into a program's instruction vector.
pub(crate) type InstPtr = usize;

/// A capture slot value: the input position recorded by a `Save`, if the
/// instruction has executed on the current path.
pub(crate) type Slot = Option<usize>;

/// A single bytecode instruction.
#[derive(Clone, Debug)]
pub(crate) enum Inst {
    /// Consume one byte equal to `byte`.
    Byte { out: InstPtr, byte: u8 },
    /// Consume one byte contained in the class.
    Ranges { out: InstPtr, set: ByteClass },
    /// Consume any one byte except `\n`.
    Dot { out: InstPtr },
    /// Consume nothing; continue only if the assertion holds here.
    Assert { out: InstPtr, look: Look },
    /// Consume nothing; record the current position in a capture slot.
    Save { out: InstPtr, slot: usize },
    /// Unconditional transfer.
    Jump { out: InstPtr },
    /// Fork: `out` is tried first, `other` on backtrack or in parallel at
    /// lower priority.
    Split { out: InstPtr, other: InstPtr },
    /// Terminal success.
    Match,
}

/// A compiled program together with its two entry points.
#[derive(Clone)]
pub(crate) struct Program {
    insts: Vec<Inst>,
    /// The anchored entry point: matching begins at the current position.
    start: InstPtr,
    /// The unanchored entry point: a split/dot loop that advances the
    /// starting position one byte at a time before entering `start`.
    find_start: InstPtr,
    /// Total number of capture slots, including the whole-match pair.
    slot_count: usize,
    /// A byte every match must begin with, when one exists. Used to drive
    /// a prefilter during unanchored search.
    prefix_byte: Option<u8>,
}

impl Program {
    pub(crate) fn new(
        insts: Vec<Inst>,
        start: InstPtr,
        find_start: InstPtr,
        slot_count: usize,
        prefix_byte: Option<u8>,
    ) -> Program {
        Program { insts, start, find_start, slot_count, prefix_byte }
    }

    pub(crate) fn len(&self) -> usize {
        self.insts.len()
    }

    pub(crate) fn insts(&self) -> &[Inst] {
        &self.insts
    }

    pub(crate) fn start(&self) -> InstPtr {
        self.start
    }

    pub(crate) fn find_start(&self) -> InstPtr {
        self.find_start
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub(crate) fn prefix_byte(&self) -> Option<u8> {
        self.prefix_byte
    }
}

impl Index<InstPtr> for Program {
    type Output = Inst;

    fn index(&self, pc: InstPtr) -> &Inst {
        &self.insts[pc]
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (pc, inst) in self.insts().iter().enumerate() {
            write!(f, "{:04}: ", pc)?;
            match *inst {
                Inst::Byte { out, byte } => {
                    write!(f, "byte {:?} => {}", byte as char, out)?
                }
                Inst::Ranges { out, ref set } => {
                    write!(f, "ranges ")?;
                    for r in set.ranges() {
                        write!(f, "{:02x}-{:02x} ", r.min, r.max)?;
                    }
                    write!(f, "=> {}", out)?
                }
                Inst::Dot { out } => write!(f, "dot => {}", out)?,
                Inst::Assert { out, look } => {
                    write!(f, "assert {:?} => {}", look, out)?
                }
                Inst::Save { out, slot } => {
                    write!(f, "save {} => {}", slot, out)?
                }
                Inst::Jump { out } => write!(f, "jump => {}", out)?,
                Inst::Split { out, other } => {
                    write!(f, "split({}, {})", out, other)?
                }
                Inst::Match => write!(f, "match")?,
            }
            if pc == self.start {
                write!(f, " (start)")?;
            }
            if pc == self.find_start {
                write!(f, " (find-start)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
