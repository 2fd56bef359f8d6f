//! This module implements the control-transfer engine that compiled
//! Hilt programs run on.
//!
//! The operation of the engine is facilitated by the [`Control`]
//! type: every computation that could suspend returns either a final
//! value, an in-flight [`Suspension`] travelling towards its handler,
//! or a trampoline [`Step`]. Handlers are introduced with
//! [`Runtime::handle`] against a fresh prompt; [`suspend`] starts an
//! unwind towards a prompt, and [`push`] extends the unwind with the
//! pure frames the compiler lifted out around each suspension point.
//!
//! When a suspension reaches the handler for its prompt, the frames
//! collected on the way out are packaged into a [`Resumption`]
//! together with a snapshot of the current region, and the handler
//! body decides whether (and how often) to resume it. Resuming
//! rewinds the captured chain: each segment re-enters its region,
//! restores the cell values from capture time, and re-applies its
//! frames in order. A frame that suspends again during the rewind is
//! dispatched exactly like a suspension arriving at a fresh handler.

mod cont;

use std::fmt::Display;
use std::rc::Rc;

use crate::errors::{ErrorKind, RuntimeResult};
use crate::observer::{NoOpObserver, RuntimeObserver};
use crate::region::{Arena, Cell, RegionStack};
use crate::value::Value;

pub use cont::Resumption;
use cont::{Cont, Segment};

/// Identifies one live handler instance; the target of a suspend.
/// Prompts only support equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PromptId(u64);

impl Display for PromptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "prompt[{}]", self.0)
    }
}

/// Prompts below this value are reserved for the compiler's built-in
/// handlers; [`Runtime::fresh_prompt`] starts counting here.
const FIRST_USER_PROMPT: u64 = 2;

/// A pure frame: deferred continuation work between a suspension
/// point and its handler, produced by the compiler.
pub type Frame = Rc<dyn Fn(&mut Runtime<'_>, Value) -> Control>;

/// A handler body, invoked with the continuation captured up to the
/// matching handler.
pub type Body = Rc<dyn Fn(&mut Runtime<'_>, Resumption) -> Control>;

/// The result of every computation that could suspend.
pub enum Control {
    /// The computation ran to completion.
    Done(Value),

    /// The computation suspended; the suspension is travelling
    /// towards the handler for its prompt.
    Suspended(Suspension),

    /// A tail call, to be bounced off [`Runtime::trampoline`].
    Step(Step),
}

/// A deferred tail call: the trampoline applies `computation` to
/// `argument` without growing the native stack. Produced by the
/// compiler at tail positions it cannot otherwise shrink.
pub struct Step {
    computation: Frame,
    argument: Value,
}

impl Control {
    pub fn step(computation: Frame, argument: Value) -> Control {
        Control::Step(Step {
            computation,
            argument,
        })
    }

    /// Extend a computation with the surrounding direct-style context
    /// `frame`. This is the composition rule the compiler emits above
    /// every suspension point: apply the frame if the computation
    /// finished, otherwise record it on the suspension so the
    /// captured continuation includes it.
    pub fn then(self, rt: &mut Runtime<'_>, frame: Frame) -> Control {
        match self {
            Control::Done(value) => (*frame)(rt, value),
            Control::Suspended(suspension) => Control::Suspended(push(suspension, frame)),
            Control::Step(_) => {
                let settled = rt.trampoline(self);
                settled.then(rt, frame)
            }
        }
    }
}

/// The packet thrown towards a handler while an unwind is in flight.
/// Transient: consumed either by the matching handler or by the next
/// handler out repackaging it.
pub struct Suspension {
    prompt: PromptId,
    body: Body,

    /// Pure frames collected so far, in push order. Pushing appends,
    /// so the vector is already in application order.
    frames: Vec<Frame>,

    /// The continuation already captured by handlers further in.
    tail: Cont,
}

impl Suspension {
    pub fn prompt(&self) -> PromptId {
        self.prompt
    }
}

/// Begin an unwind targeting `prompt`. The body receives the
/// continuation captured up to the matching handler once the unwind
/// arrives there; no frames have been collected at the suspend site
/// itself.
pub fn suspend(
    prompt: PromptId,
    body: impl Fn(&mut Runtime<'_>, Resumption) -> Control + 'static,
) -> Control {
    Control::Suspended(Suspension {
        prompt,
        body: Rc::new(body),
        frames: Vec::new(),
        tail: Cont::Empty,
    })
}

/// Attach an enclosing pure frame to an in-flight suspension.
pub fn push(mut suspension: Suspension, frame: Frame) -> Suspension {
    suspension.frames.push(frame);
    suspension
}

/// Shorthand for building a [`Frame`] from a closure.
pub fn frame(f: impl Fn(&mut Runtime<'_>, Value) -> Control + 'static) -> Frame {
    Rc::new(f)
}

/// A control value with the trampoline already driven to quiescence.
enum Settled {
    Done(Value),
    Suspended(Suspension),
}

/// The execution context of one compiled program: the region stack,
/// the prompt counter, and the observer. All runtime state is owned
/// here and mutated only by the single executing thread.
pub struct Runtime<'o> {
    regions: RegionStack,
    next_prompt: u64,
    observer: &'o mut dyn RuntimeObserver,
}

impl<'o> Runtime<'o> {
    pub fn new(observer: &'o mut dyn RuntimeObserver) -> Self {
        Runtime {
            regions: RegionStack::new(),
            next_prompt: FIRST_USER_PROMPT,
            observer,
        }
    }

    /// Allocate a new globally unique prompt.
    pub fn fresh_prompt(&mut self) -> PromptId {
        let prompt = PromptId(self.next_prompt);
        self.next_prompt += 1;
        self.observer.observe_fresh_prompt(prompt);
        prompt
    }

    /// Allocate a cell in the current region.
    pub fn fresh(&mut self, init: Value) -> Rc<Cell> {
        self.regions.fresh_in_current(init)
    }

    /// Handle to the global arena.
    pub fn global(&self) -> Rc<Arena> {
        Rc::clone(self.regions.global())
    }

    /// Create a new arena and make it current.
    pub fn fresh_region(&mut self) -> Rc<Arena> {
        let region = Arena::new();
        self.enter_region(Rc::clone(&region));
        region
    }

    fn enter_region(&mut self, region: Rc<Arena>) {
        self.observer.observe_enter_region(region.len());
        self.regions.enter(region);
    }

    /// Pop the region stack, returning the arena that was left.
    pub fn leave_region(&mut self) -> Rc<Arena> {
        let left = self.regions.leave();
        self.observer.observe_leave_region(left.len());
        left
    }

    /// Run `thunk` delimited by `prompt`. A normal return is the
    /// result; a suspension terminating the thunk is dispatched
    /// against `prompt`.
    pub fn handle(&mut self, prompt: PromptId, thunk: impl FnOnce(&mut Self) -> Control) -> Control {
        self.observer.observe_enter_handler(prompt);
        let control = thunk(self);
        match self.settle(control) {
            Settled::Done(value) => Control::Done(value),
            Settled::Suspended(suspension) => self.dispatch(prompt, suspension, &[]),
        }
    }

    /// Drive a computation until it stops producing trampoline steps.
    pub fn trampoline(&mut self, mut control: Control) -> Control {
        loop {
            match control {
                Control::Step(step) => control = (*step.computation)(self, step.argument),
                settled => return settled,
            }
        }
    }

    fn settle(&mut self, control: Control) -> Settled {
        match self.trampoline(control) {
            Control::Done(value) => Settled::Done(value),
            Control::Suspended(suspension) => Settled::Suspended(suspension),
            Control::Step(_) => unreachable!("hilt-rt bug: trampoline returned a step"),
        }
    }

    /// The shared handler boundary, used both when a suspension
    /// terminates a handler's thunk and when a frame suspends during
    /// a rewind. `rest` holds the boundary's own pure frames that
    /// have not been applied yet.
    ///
    /// The segment assembled here extends the suspension's captured
    /// continuation with everything this boundary contributes: the
    /// accumulated frames ahead of `rest`, the boundary's prompt, and
    /// the current region with its contents at this moment. On a
    /// prompt match the completed chain is handed to the suspension's
    /// body; otherwise the suspension is re-raised with the segment
    /// as its new tail, for the next handler out to inspect.
    fn dispatch(&mut self, prompt: PromptId, suspension: Suspension, rest: &[Frame]) -> Control {
        let Suspension {
            prompt: target,
            body,
            mut frames,
            tail,
        } = suspension;

        frames.extend(rest.iter().cloned());
        let region = Rc::clone(self.regions.current());
        let backup = region.snapshot();
        let segment = Rc::new(Segment {
            frames,
            prompt,
            region,
            backup,
            tail,
        });

        if target == prompt {
            self.observer.observe_capture(prompt, segment.frames.len());
            (*body)(self, Resumption::new(segment))
        } else {
            self.observer.observe_rethrow(target, prompt);
            Control::Suspended(Suspension {
                prompt: target,
                body,
                frames: Vec::new(),
                tail: Cont::Segment(segment),
            })
        }
    }

    /// Resume a captured continuation with `value`.
    ///
    /// Rewinding a segment re-enters its region, restores the cell
    /// contents from the capture-time snapshot, rewinds the tail, and
    /// then re-applies the segment's frames in order. Each frame may
    /// itself suspend, in which case the remaining frames and the
    /// segment's prompt form a new handler boundary. The region is
    /// left again on every path out of the segment.
    pub(crate) fn rewind(&mut self, cont: Cont, value: Value) -> Control {
        let segment = match cont {
            Cont::Empty => return Control::Done(value),
            Cont::Segment(segment) => segment,
        };

        self.observer
            .observe_rewind(segment.prompt, segment.frames.len());
        self.enter_region(Rc::clone(&segment.region));
        segment.region.restore(&segment.backup);

        let mut control = self.rewind(segment.tail.clone(), value);
        let mut applied = 0;
        let out = loop {
            match self.settle(control) {
                Settled::Done(value) => match segment.frames.get(applied) {
                    None => break Control::Done(value),
                    Some(frame) => {
                        applied += 1;
                        control = (**frame)(self, value);
                    }
                },
                Settled::Suspended(suspension) => {
                    break self.dispatch(segment.prompt, suspension, &segment.frames[applied..]);
                }
            }
        };

        self.leave_region();
        out
    }
}

/// Run a compiled program to completion with the given observer. A
/// suspension escaping the top level is reported as an unhandled
/// prompt.
pub fn run_with_observer(
    observer: &mut dyn RuntimeObserver,
    program: impl FnOnce(&mut Runtime<'_>) -> Control,
) -> RuntimeResult<Value> {
    let mut rt = Runtime::new(observer);
    let control = program(&mut rt);
    match rt.trampoline(control) {
        Control::Done(value) => Ok(value),
        Control::Suspended(suspension) => {
            rt.observer.observe_unhandled_prompt(suspension.prompt);
            Err(ErrorKind::UnhandledPrompt(suspension.prompt).into())
        }
        Control::Step(_) => unreachable!("hilt-rt bug: trampoline returned a step"),
    }
}

/// Run a compiled program to completion without observation.
pub fn run(program: impl FnOnce(&mut Runtime<'_>) -> Control) -> RuntimeResult<Value> {
    let mut observer = NoOpObserver::default();
    run_with_observer(&mut observer, program)
}
