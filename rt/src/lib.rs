//! `hilt-rt` is the runtime the Hilt compiler targets.
//!
//! Hilt is an effect-typed language; its compiler lowers source-level
//! effect handlers into the multi-prompt delimited-control primitives
//! this crate provides: prompt introduction ([`Runtime::handle`]),
//! suspension ([`suspend`], [`push`]) and resumption
//! ([`Resumption::resume`]). On top of these, handlers, generators,
//! exceptions and backtracking are all ordinary compiled code.
//!
//! Captured continuations are first-class and multi-shot, and carry
//! snapshots of the lexically scoped mutable regions that were active
//! at capture, so that resuming replays the computation against the
//! state it originally saw. A trampoline ([`Runtime::trampoline`])
//! bounds native-stack growth across compiled tail calls.
//!
//! The runtime is strictly single-threaded and performs no I/O; the
//! embedding program drives it through [`run`] or
//! [`run_with_observer`].

mod control;
mod errors;
pub mod observer;
mod region;
mod value;

#[cfg(test)]
mod tests;

// Re-export the public interface used by compiled programs.
pub use crate::control::{
    frame, push, run, run_with_observer, suspend, Body, Control, Frame, PromptId, Resumption,
    Runtime, Step, Suspension,
};
pub use crate::errors::{Error, ErrorKind, RuntimeResult};
pub use crate::region::{Arena, ArenaSnapshot, Cell, CellSnapshot};
pub use crate::value::{constructor, Data, Value};

/// Terminate the program at a compiler-inserted placeholder.
pub fn hole() -> ! {
    panic!("implementation missing")
}
