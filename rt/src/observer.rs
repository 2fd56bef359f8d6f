//! Implements a trait for things that wish to observe internal state
//! changes of the runtime.
//!
//! This can be used to trace control transfer at runtime: suspends
//! propagating outward, continuations being captured, and captured
//! regions being restored during a rewind.

use std::io::Write;

use tabwriter::TabWriter;

use crate::control::PromptId;

/// Implemented by types that wish to observe internal happenings of
/// the runtime.
///
/// All methods are optional, that is, observers can implement only
/// what they are interested in observing.
pub trait RuntimeObserver {
    /// Called when a new prompt is generated.
    fn observe_fresh_prompt(&mut self, _prompt: PromptId) {}

    /// Called when a handler for the given prompt starts running its
    /// body.
    fn observe_enter_handler(&mut self, _prompt: PromptId) {}

    /// Called when a suspension meets its matching handler and the
    /// continuation between them is captured.
    fn observe_capture(&mut self, _prompt: PromptId, _frames: usize) {}

    /// Called when a suspension passes through a handler for a
    /// different prompt and is repackaged for the next one out.
    fn observe_rethrow(&mut self, _target: PromptId, _boundary: PromptId) {}

    /// Called for each continuation segment that is being rewound.
    fn observe_rewind(&mut self, _prompt: PromptId, _frames: usize) {}

    /// Called when a region becomes current.
    fn observe_enter_region(&mut self, _cells: usize) {}

    /// Called when the current region is left.
    fn observe_leave_region(&mut self, _cells: usize) {}

    /// Called when a suspension escapes the top level of the program.
    fn observe_unhandled_prompt(&mut self, _prompt: PromptId) {}
}

#[derive(Default)]
pub struct NoOpObserver {}

impl RuntimeObserver for NoOpObserver {}

/// An observer that writes a line per control-transfer event to its
/// internal writer.
pub struct TracingObserver<W: Write> {
    writer: TabWriter<W>,
}

impl<W: Write> TracingObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: TabWriter::new(writer),
        }
    }

    fn emit(&mut self, line: std::fmt::Arguments) {
        let _ = writeln!(&mut self.writer, "{}", line);
        let _ = self.writer.flush();
    }
}

impl<W: Write> RuntimeObserver for TracingObserver<W> {
    fn observe_fresh_prompt(&mut self, prompt: PromptId) {
        self.emit(format_args!("fresh-prompt\t{}", prompt));
    }

    fn observe_enter_handler(&mut self, prompt: PromptId) {
        self.emit(format_args!("handle\t{}", prompt));
    }

    fn observe_capture(&mut self, prompt: PromptId, frames: usize) {
        self.emit(format_args!("capture\t{}\tframes={}", prompt, frames));
    }

    fn observe_rethrow(&mut self, target: PromptId, boundary: PromptId) {
        self.emit(format_args!(
            "rethrow\t{}\tthrough={}",
            target, boundary
        ));
    }

    fn observe_rewind(&mut self, prompt: PromptId, frames: usize) {
        self.emit(format_args!("rewind\t{}\tframes={}", prompt, frames));
    }

    fn observe_enter_region(&mut self, cells: usize) {
        self.emit(format_args!("enter-region\tcells={}", cells));
    }

    fn observe_leave_region(&mut self, cells: usize) {
        self.emit(format_args!("leave-region\tcells={}", cells));
    }

    fn observe_unhandled_prompt(&mut self, prompt: PromptId) {
        self.emit(format_args!("unhandled\t{}", prompt));
    }
}
