// Role-gated command dispatch over a store

use crate::activity::{ActivityLog, Role};
use crate::error::StoreError;
use crate::filter::{Filter, SortField};
use crate::notify::Notifier;
use crate::record::{Visit, VisitDraft, VisitKind};
use crate::report;
use crate::store::Store;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, warn};

/// Text listings stop after this many rows
pub const DISPLAY_LIMIT: usize = 20;

/// Field-by-field edits for an update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitChanges {
    pub patient_name: Option<String>,
    pub visit_date: Option<NaiveDateTime>,
    pub kind: Option<VisitKind>,
    pub description: Option<String>,
    pub doctor_name: Option<String>,
    pub duration_minutes: Option<u32>,
}

impl VisitChanges {
    pub fn apply(self, mut draft: VisitDraft) -> VisitDraft {
        if let Some(name) = self.patient_name {
            draft.patient_name = name;
        }
        if let Some(date) = self.visit_date {
            draft.visit_date = Some(date);
        }
        if let Some(kind) = self.kind {
            draft.kind = kind;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(doctor) = self.doctor_name {
            draft.doctor_name = doctor;
        }
        if let Some(duration) = self.duration_minutes {
            draft.duration_minutes = duration;
        }
        draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary(u32),
    CountByKind,
    /// Week containing the given day
    Weekly(NaiveDate),
}

/// One user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `force` skips the conflict confirmation
    Add { draft: VisitDraft, force: bool },
    Update { id: u32, changes: VisitChanges },
    /// `force` skips the "are you sure" confirmation
    Delete { id: u32, force: bool },
    Show { id: u32 },
    List { json: bool },
    Find { filter: Filter, json: bool },
    Sort { field: SortField, json: bool },
    Report { kind: ReportKind, json: bool },
    Undo,
    Redo,
}

impl Command {
    fn modifies_existing(&self) -> bool {
        matches!(self, Command::Update { .. } | Command::Delete { .. })
    }

    fn denied_action(&self) -> String {
        match self {
            Command::Update { id, .. } => format!("Updating Entry. Visit id: {} (permission denied)", id),
            Command::Delete { id, .. } => format!("Deleting Entry. Visit id: {} (permission denied)", id),
            _ => "Permission denied".to_string(),
        }
    }
}

/// A logged-in role driving one store
pub struct Session {
    store: Store,
    role: Role,
    notifier: Rc<dyn Notifier>,
    activity: Box<dyn ActivityLog>,
}

impl Session {
    pub fn new(store: Store, role: Role, notifier: Rc<dyn Notifier>, activity: Box<dyn ActivityLog>) -> Self {
        Self {
            store,
            role,
            notifier,
            activity,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run a command, reporting the outcome through the notifier
    ///
    /// Returns whether the command succeeded. Cancelled confirmations count as
    /// failures.
    pub fn execute(&mut self, command: Command) -> bool {
        debug!(role = %self.role, ?command, "execute: called");

        if command.modifies_existing() && !self.role.can_modify() {
            self.notifier
                .error(&format!("{} is not allowed to update or delete visits.", self.role));
            self.log(&command.denied_action(), false);
            return false;
        }

        match command {
            Command::Add { draft, force } => self.add(draft, force),
            Command::Update { id, changes } => self.update(id, changes),
            Command::Delete { id, force } => self.delete(id, force),
            Command::Show { id } => self.show(id),
            Command::List { json } => {
                let visits = self.store.list();
                if !json {
                    self.notifier.message(&format!("=== ALL VISITS ({} total) ===", visits.len()));
                }
                self.print_visits(&visits, json, "No visits found.");
                true
            }
            Command::Find { filter, json } => {
                let visits = self.store.find(&filter);
                self.print_visits(&visits, json, "No visits found matching your criteria.");
                self.log(&format!("Filtered Entries by {}", filter), true);
                true
            }
            Command::Sort { field, json } => {
                let visits = self.store.sorted_by(field);
                self.print_visits(&visits, json, "No visits found.");
                self.log(&format!("Sorted Entries by {}", field), true);
                true
            }
            Command::Report { kind, json } => self.report(kind, json),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
        }
    }

    /// Retry a failed save; true when nothing is left unsaved
    pub fn flush(&mut self) -> bool {
        !self.store.is_dirty() || self.store.flush().is_ok()
    }

    /// Record the end of the session in the activity log
    pub fn logout(&self) {
        self.activity.logout(self.role);
    }

    fn add(&mut self, draft: VisitDraft, force: bool) -> bool {
        let action = format!("Adding Entry for {}", draft.patient_name);

        if let Some(date) = draft.visit_date {
            if !force && self.store.has_conflict(&draft.patient_name, date) {
                let proceed = self
                    .notifier
                    .confirm("Warning: This patient has another visit within 30 minutes. Proceed?");
                if !proceed {
                    self.notifier.message("Visit creation cancelled.");
                    self.log(&action, false);
                    return false;
                }
            }
        }

        match self.store.create(draft) {
            Ok(visit) => {
                self.notifier.success(&format!("Visit added successfully! (ID: {})", visit.id));
                self.log(&action, true);
                true
            }
            Err(e) => self.fail(&action, "Error adding visit", e),
        }
    }

    fn update(&mut self, id: u32, changes: VisitChanges) -> bool {
        let existing = match self.store.get(id) {
            Ok(v) => v,
            Err(e) => return self.fail("Updating a visit", "Error updating visit", e),
        };

        match self.store.update(id, changes.apply(existing.to_draft())) {
            Ok(visit) => {
                self.notifier.success("Visit updated successfully!");
                self.log(
                    &format!("Updating Entry for {}. Visit id: {}", visit.patient_name, id),
                    true,
                );
                true
            }
            Err(e) => self.fail("Updating a visit", "Error updating visit", e),
        }
    }

    fn delete(&mut self, id: u32, force: bool) -> bool {
        let action = format!("Deleting Entry for visit id: {}", id);
        let visit = match self.store.get(id) {
            Ok(v) => v,
            Err(e) => return self.fail(&action, "Error deleting visit", e),
        };

        if !force {
            self.notifier.message(&format!("Visit to delete: {}", visit));
            if !self.notifier.confirm("Are you sure?") {
                self.notifier.message("Delete cancelled.");
                self.log(
                    &format!("Deleting Entry for {}. Visit id: {}", visit.patient_name, id),
                    false,
                );
                return false;
            }
        }

        match self.store.delete(id) {
            Ok(removed) => {
                self.notifier.success("Visit deleted successfully!");
                self.log(
                    &format!("Deleting Entry for {}. Visit id: {}", removed.patient_name, id),
                    true,
                );
                true
            }
            Err(e) => self.fail(&action, "Error deleting visit", e),
        }
    }

    fn show(&mut self, id: u32) -> bool {
        match self.store.get(id) {
            Ok(visit) => {
                self.notifier.message(&visit.to_string());
                true
            }
            Err(e) => {
                self.notifier.error(&e.to_string());
                false
            }
        }
    }

    fn report(&mut self, kind: ReportKind, json: bool) -> bool {
        let visits = self.store.visits();
        match kind {
            ReportKind::Summary(id) => {
                let action = format!("Generating Visit Summary for id {}", id);
                match visits.iter().find(|v| v.id == id) {
                    Some(visit) => {
                        let lines = report::visit_summary(visit);
                        self.emit(visit, &lines, json);
                        self.log(&action, true);
                        true
                    }
                    None => self.fail(&action, "Report generation error", StoreError::NotFound(id)),
                }
            }
            ReportKind::CountByKind => {
                let counts = report::count_by_kind(visits);
                self.emit(&counts, &counts.lines(), json);
                self.log("Generating Reports by Visit Type Count", true);
                true
            }
            ReportKind::Weekly(day) => {
                let summary = report::weekly_summary(visits, day);
                self.emit(&summary, &summary.lines(), json);
                self.log("Generating Weekly summary", true);
                true
            }
        }
    }

    fn undo(&mut self) -> bool {
        match self.store.undo() {
            Ok(Some(description)) => {
                self.notifier.message(&format!("*** Undone: {} ***", description));
                self.log(&format!("Undo: {}", description), true);
                true
            }
            Ok(None) => {
                self.notifier.message("Nothing to undo.");
                true
            }
            Err(e) => self.fail("Undo", "Undo could not be saved", e),
        }
    }

    fn redo(&mut self) -> bool {
        match self.store.redo() {
            Ok(Some(description)) => {
                self.notifier.message(&format!("*** Redone: {} ***", description));
                self.log(&format!("Redo: {}", description), true);
                true
            }
            Ok(None) => {
                self.notifier.message("Nothing to redo.");
                true
            }
            Err(e) => self.fail("Redo", "Redo could not be saved", e),
        }
    }

    fn print_visits(&self, visits: &[Visit], json: bool, empty: &str) {
        if json {
            self.print_json(&visits);
            return;
        }

        if visits.is_empty() {
            self.notifier.message(empty);
            return;
        }

        self.notifier.message(&format!("Found {} visit(s):", visits.len()));
        self.notifier.message(&"-".repeat(80));
        for visit in visits.iter().take(DISPLAY_LIMIT) {
            self.notifier.message(&visit.to_string());
        }
        if visits.len() > DISPLAY_LIMIT {
            self.notifier
                .message(&format!("... and {} more results.", visits.len() - DISPLAY_LIMIT));
        }
    }

    fn emit<T: Serialize>(&self, value: &T, lines: &[String], json: bool) {
        if json {
            self.print_json(value);
        } else {
            for line in lines {
                self.notifier.message(line);
            }
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => self.notifier.message(&text),
            Err(e) => {
                warn!(error = ?e, "Failed to serialize output");
                self.notifier.error(&format!("Failed to serialize output: {}", e));
            }
        }
    }

    fn fail(&self, action: &str, context: &str, error: StoreError) -> bool {
        self.notifier.error(&format!("{}: {}", context, error));
        self.log(action, false);
        false
    }

    fn log(&self, action: &str, success: bool) {
        self.activity.record(self.role, action, success);
    }
}
