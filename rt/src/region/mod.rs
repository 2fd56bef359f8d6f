//! Regions are lexically scoped collections of mutable cells whose
//! contents travel with captured continuations.
//!
//! An [`Arena`] records its cells in creation order so that a
//! snapshot taken at continuation capture can later rebuild exactly
//! the cell list (and cell values) that existed at capture time. The
//! [`RegionStack`] tracks which arena fresh cells are currently
//! allocated into.
//!
//! The global arena is special: it lives as long as the runtime and
//! is never captured, so it does not record its cells at all. Cells
//! allocated at the top level behave like plain mutable references,
//! and mutations to them are visible across continuation
//! invocations.

mod cell;

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::value::Value;

pub use cell::{Cell, CellSnapshot};

pub struct Arena {
    cells: RefCell<Vec<Rc<Cell>>>,

    /// Whether cells allocated here are recorded for snapshots. False
    /// only for the global arena.
    tracked: bool,
}

impl Arena {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Arena {
            cells: RefCell::new(Vec::new()),
            tracked: true,
        })
    }

    pub(crate) fn global() -> Rc<Self> {
        Rc::new(Arena {
            cells: RefCell::new(Vec::new()),
            tracked: false,
        })
    }

    /// Allocate a new cell with the given initial value. Tracked
    /// arenas append it to their cell list in creation order.
    pub fn fresh(&self, init: Value) -> Rc<Cell> {
        let cell = Cell::new(init);
        if self.tracked {
            self.cells.borrow_mut().push(Rc::clone(&cell));
        }
        cell
    }

    /// Capture restore records for every cell, in creation order. The
    /// global arena always yields an empty snapshot.
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            cells: self.cells.borrow().iter().map(|c| c.snapshot()).collect(),
        }
    }

    /// Rebuild the cell list from a snapshot, resetting each recorded
    /// cell to its captured value. Cells created after the snapshot
    /// are dropped from the list; cells dropped since are re-adopted.
    pub fn restore(&self, snapshot: &ArenaSnapshot) {
        let cells = snapshot.cells.iter().map(|s| s.restore()).collect();
        *self.cells.borrow_mut() = cells;
    }

    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }
}

impl Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Arena({} cells)", self.len())
    }
}

/// Ordered per-cell restore records for one arena, taken at
/// continuation capture.
pub struct ArenaSnapshot {
    cells: Vec<CellSnapshot>,
}

/// The stack of active regions. The arena at the top ("current") is
/// where fresh cells are allocated; the global arena sits below every
/// user region and is current exactly when no user region is active.
pub(crate) struct RegionStack {
    global: Rc<Arena>,
    current: Rc<Arena>,
    saved: Vec<Rc<Arena>>,
}

impl RegionStack {
    pub(crate) fn new() -> Self {
        let global = Arena::global();
        RegionStack {
            current: Rc::clone(&global),
            global,
            saved: Vec::new(),
        }
    }

    pub(crate) fn global(&self) -> &Rc<Arena> {
        &self.global
    }

    pub(crate) fn current(&self) -> &Rc<Arena> {
        &self.current
    }

    /// Make `region` current, saving the previous current arena.
    pub(crate) fn enter(&mut self, region: Rc<Arena>) {
        self.saved.push(std::mem::replace(&mut self.current, region));
    }

    /// Pop the region stack, returning the arena that was current.
    pub(crate) fn leave(&mut self) -> Rc<Arena> {
        let below = self
            .saved
            .pop()
            .expect("hilt-rt bug: region stack underflow");
        std::mem::replace(&mut self.current, below)
    }

    pub(crate) fn fresh_in_current(&self, init: Value) -> Rc<Cell> {
        self.current.fresh(init)
    }
}
