//! The representation of captured continuations.
//!
//! A captured continuation is a chain of segments, innermost first.
//! Each segment records the pure frames between one suspension point
//! and its handler, the prompt of that handler, the region that was
//! current at capture, and a snapshot of that region's cells. The
//! chain tails into the continuation already captured by handlers
//! further out, and is acyclic by construction: rethrowing only ever
//! prepends new segments.

use std::rc::Rc;

use crate::region::{Arena, ArenaSnapshot};
use crate::value::Value;

use super::{Control, Frame, PromptId, Runtime};

pub(crate) struct Segment {
    /// Pure frames in application order (the innermost enclosing
    /// context first).
    pub(crate) frames: Vec<Frame>,

    /// The prompt of the handler this segment was captured under.
    /// Frames suspending during a rewind are dispatched against it.
    pub(crate) prompt: PromptId,

    /// The region that was current at capture, and its cell contents
    /// at that point.
    pub(crate) region: Rc<Arena>,
    pub(crate) backup: ArenaSnapshot,

    /// The next segment out, or empty at the capturing handler.
    pub(crate) tail: Cont,
}

#[derive(Clone)]
pub(crate) enum Cont {
    Empty,
    Segment(Rc<Segment>),
}

/// A resumable continuation, handed to handler bodies by the engine.
///
/// Resuming is non-destructive: a `Resumption` may be cloned and
/// invoked any number of times, and every invocation restores a
/// fresh copy of the captured region state.
#[derive(Clone)]
pub struct Resumption {
    cont: Cont,
}

impl Resumption {
    pub(crate) fn new(segment: Rc<Segment>) -> Self {
        Resumption {
            cont: Cont::Segment(segment),
        }
    }

    /// Whether resuming would return the value directly, with no
    /// captured work left to replay. Segments captured at handler
    /// boundaries the suspension merely passed through carry no
    /// frames, so the whole chain is walked.
    pub fn is_empty(&self) -> bool {
        let mut cont = &self.cont;
        loop {
            match cont {
                Cont::Empty => return true,
                Cont::Segment(segment) if segment.frames.is_empty() => cont = &segment.tail,
                Cont::Segment(_) => return false,
            }
        }
    }

    /// Rewind the captured continuation with `value`: restore each
    /// segment's region state and re-apply its frames from the
    /// outside in, threading the value through.
    pub fn resume(&self, rt: &mut Runtime<'_>, value: Value) -> Control {
        let control = rt.rewind(self.cont.clone(), value);
        rt.trampoline(control)
    }
}
