/*!
A Pike VM: breadth first simulation of the program over the input.

The VM advances every live thread in lock step, one input position at a
time, using two thread lists that swap roles each step. Zero-width
instructions are resolved eagerly when a thread is added, so the lists only
ever hold threads parked on a consuming instruction or on `Match`. A sparse
set dedupes additions per generation; together with the fact that each
generation consumes exactly one byte, this bounds total work by
`program length * input length` regardless of the pattern.

Thread priority is list order. The epsilon closure explores the high
priority side of every split first, and a match encountered while draining
a generation discards all lower priority threads of that generation. A
match thus reported can only be displaced by a longer match from a higher
priority thread still alive in the next generation, which is exactly the
backtracker's precedence order.
*/

use crate::input::Input;
use crate::prog::{Inst, InstPtr, Program, Slot};
use crate::sparse::SparseSet;

/// A pending item while computing an epsilon closure: either a program
/// counter still to explore, or a capture slot to put back when unwinding
/// past its `Save`.
#[derive(Clone, Debug)]
enum FollowEpsilon {
    Pc(InstPtr),
    Capture { slot: usize, old: Slot },
}

/// One generation of threads. Capture slots are stored per program
/// counter: a pc can only be occupied by one thread per generation, the
/// highest priority one to reach it.
#[derive(Clone, Debug)]
struct Threads {
    set: SparseSet,
    list: Vec<InstPtr>,
    caps: Vec<Box<[Slot]>>,
}

impl Threads {
    fn new(prog: &Program) -> Threads {
        let caps =
            vec![vec![None; prog.slot_count()].into_boxed_slice(); prog.len()];
        Threads {
            set: SparseSet::new(prog.len()),
            list: Vec::with_capacity(prog.len()),
            caps,
        }
    }

    fn clear(&mut self) {
        self.set.clear();
        self.list.clear();
    }
}

#[derive(Debug)]
pub(crate) struct PikeVm<'r, 'h> {
    prog: &'r Program,
    input: Input<'h>,
    stack: Vec<FollowEpsilon>,
    scratch: Box<[Slot]>,
    clist: Threads,
    nlist: Threads,
}

impl<'r, 'h> PikeVm<'r, 'h> {
    pub(crate) fn new(prog: &'r Program, input: Input<'h>) -> PikeVm<'r, 'h> {
        PikeVm {
            prog,
            input,
            stack: vec![],
            scratch: vec![None; prog.slot_count()].into_boxed_slice(),
            clist: Threads::new(prog),
            nlist: Threads::new(prog),
        }
    }

    /// Run the program from `start` with the cursor at `at`. On success,
    /// `slots` receives the capture positions of the winning thread; on
    /// failure it is left untouched.
    pub(crate) fn exec(
        &mut self,
        start: InstPtr,
        at: usize,
        slots: &mut [Slot],
    ) -> bool {
        let PikeVm {
            prog,
            input,
            ref mut stack,
            ref mut scratch,
            ref mut clist,
            ref mut nlist,
        } = *self;
        clist.clear();
        nlist.clear();
        stack.clear();
        for slot in scratch.iter_mut() {
            *slot = None;
        }

        let mut matched = false;
        let mut at = at;
        epsilon_closure(prog, input, stack, clist, start, at, scratch);
        while !clist.list.is_empty() {
            for i in 0..clist.list.len() {
                let pc = clist.list[i];
                match prog[pc] {
                    Inst::Byte { out, byte } => {
                        if input.get(at) == Some(byte) {
                            epsilon_closure(
                                prog,
                                input,
                                stack,
                                nlist,
                                out,
                                at + 1,
                                &mut clist.caps[pc],
                            );
                        }
                    }
                    Inst::Ranges { out, ref set } => {
                        if input.get(at).map_or(false, |b| set.contains(b)) {
                            epsilon_closure(
                                prog,
                                input,
                                stack,
                                nlist,
                                out,
                                at + 1,
                                &mut clist.caps[pc],
                            );
                        }
                    }
                    Inst::Dot { out } => {
                        if input.get(at).map_or(false, |b| b != b'\n') {
                            epsilon_closure(
                                prog,
                                input,
                                stack,
                                nlist,
                                out,
                                at + 1,
                                &mut clist.caps[pc],
                            );
                        }
                    }
                    Inst::Match => {
                        slots.copy_from_slice(&clist.caps[pc]);
                        matched = true;
                        break;
                    }
                    ref inst => {
                        unreachable!(
                            "zero-width instruction in thread list: {:?}",
                            inst
                        )
                    }
                }
            }
            core::mem::swap(clist, nlist);
            nlist.clear();
            at += 1;
        }
        matched
    }
}

/// Add the closure of `pc` under zero-width instructions to `list`,
/// evaluating assertions at `at`. Threads are appended in priority order.
///
/// `thread_caps` is the spawning thread's slot array. `Save` instructions
/// write into it while exploring and push restore frames, so when the
/// closure completes the array is back to its initial state; each thread
/// that parks in `list` snapshots the array as it was on its path.
fn epsilon_closure(
    prog: &Program,
    input: Input,
    stack: &mut Vec<FollowEpsilon>,
    list: &mut Threads,
    pc: InstPtr,
    at: usize,
    thread_caps: &mut [Slot],
) {
    stack.push(FollowEpsilon::Pc(pc));
    while let Some(frame) = stack.pop() {
        match frame {
            FollowEpsilon::Pc(pc) => {
                epsilon_closure_step(
                    prog,
                    input,
                    stack,
                    list,
                    pc,
                    at,
                    thread_caps,
                );
            }
            FollowEpsilon::Capture { slot, old } => thread_caps[slot] = old,
        }
    }
}

fn epsilon_closure_step(
    prog: &Program,
    input: Input,
    stack: &mut Vec<FollowEpsilon>,
    list: &mut Threads,
    mut pc: InstPtr,
    at: usize,
    thread_caps: &mut [Slot],
) {
    loop {
        if !list.set.insert(pc) {
            return;
        }
        match prog[pc] {
            Inst::Byte { .. }
            | Inst::Ranges { .. }
            | Inst::Dot { .. }
            | Inst::Match => {
                list.caps[pc].copy_from_slice(thread_caps);
                list.list.push(pc);
                return;
            }
            Inst::Assert { out, look } => {
                if !look.matches(input.haystack(), at) {
                    return;
                }
                pc = out;
            }
            Inst::Jump { out } => pc = out,
            Inst::Split { out, other } => {
                stack.push(FollowEpsilon::Pc(other));
                pc = out;
            }
            Inst::Save { out, slot } => {
                stack.push(FollowEpsilon::Capture {
                    slot,
                    old: thread_caps[slot],
                });
                thread_caps[slot] = Some(at);
                pc = out;
            }
        }
    }
}
