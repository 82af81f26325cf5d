// Undo/redo action log

use crate::record::Visit;
use std::collections::VecDeque;

/// Maximum number of actions kept on each stack
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Add,
    Update,
    Delete,
}

/// The state transition a completed mutation made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add { visit: Visit },
    Update { before: Visit, after: Visit },
    /// `position` is the index the visit occupied before removal
    Delete { visit: Visit, position: usize },
}

/// One completed mutation, with a label for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub change: Change,
    pub description: String,
}

impl Action {
    pub fn add(visit: Visit) -> Self {
        let description = format!("Add visit for {}", visit.patient_name);
        Self {
            change: Change::Add { visit },
            description,
        }
    }

    pub fn update(before: Visit, after: Visit) -> Self {
        let description = format!("Update visit for {}", after.patient_name);
        Self {
            change: Change::Update { before, after },
            description,
        }
    }

    pub fn delete(visit: Visit, position: usize) -> Self {
        let description = format!("Delete visit for {}", visit.patient_name);
        Self {
            change: Change::Delete { visit, position },
            description,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self.change {
            Change::Add { .. } => ActionKind::Add,
            Change::Update { .. } => ActionKind::Update,
            Change::Delete { .. } => ActionKind::Delete,
        }
    }

    /// The visit as it exists after the action (Add and Update)
    pub fn new_state(&self) -> Option<&Visit> {
        match &self.change {
            Change::Add { visit } => Some(visit),
            Change::Update { after, .. } => Some(after),
            Change::Delete { .. } => None,
        }
    }

    /// The visit as it existed before the action (Update and Delete)
    pub fn prior_state(&self) -> Option<&Visit> {
        match &self.change {
            Change::Add { .. } => None,
            Change::Update { before, .. } => Some(before),
            Change::Delete { visit, .. } => Some(visit),
        }
    }
}

/// Two bounded stacks; pushing past capacity evicts the oldest entry
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Action>,
    redo: VecDeque<Action>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a fresh mutation; invalidates anything that could be redone
    pub fn record(&mut self, action: Action) {
        push_bounded(&mut self.undo, action, self.capacity);
        self.redo.clear();
    }

    pub fn pop_undo(&mut self) -> Option<Action> {
        self.undo.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<Action> {
        self.redo.pop_back()
    }

    pub fn push_undo(&mut self, action: Action) {
        push_bounded(&mut self.undo, action, self.capacity);
    }

    pub fn push_redo(&mut self, action: Action) {
        push_bounded(&mut self.redo, action, self.capacity);
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

fn push_bounded(stack: &mut VecDeque<Action>, action: Action, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while stack.len() >= capacity {
        stack.pop_front();
    }
    stack.push_back(action);
}
