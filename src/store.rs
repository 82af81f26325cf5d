// Visit store: validated in-memory collection with undo/redo and persistence

use crate::error::StoreError;
use crate::filter::{Filter, SortField};
use crate::history::{Action, Change, History};
use crate::notify::Notifier;
use crate::rates::RateTable;
use crate::record::{Visit, VisitDraft};
use crate::repository::Repository;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Two visits of the same patient closer than this are flagged as conflicting
pub const CONFLICT_WINDOW_MINUTES: i64 = 30;

/// Authoritative visit collection
///
/// Every mutation (including undo and redo) rewrites the whole backing
/// repository. If that write fails the in-memory state still changes and is
/// kept as the source of truth; the store is marked dirty until a later save
/// succeeds.
pub struct Store {
    visits: Vec<Visit>,
    next_id: u32,
    history: History,
    rates: RateTable,
    repository: Box<dyn Repository>,
    notifier: Rc<dyn Notifier>,
    fresh: bool,
    dirty: bool,
}

impl Store {
    /// Open a store over the given repository
    ///
    /// Unparseable lines are skipped by the repository. If the repository
    /// cannot be read at all, the store starts empty and the failure is
    /// reported through the notifier.
    pub fn open(repository: Box<dyn Repository>, rates: RateTable, notifier: Rc<dyn Notifier>) -> Self {
        let fresh = !repository.exists();

        let loaded = match repository.load() {
            Ok(visits) => visits,
            Err(e) => {
                error!(file = ?repository.location(), error = ?e, "Failed to load visits, starting empty");
                notifier.error(&format!("Error loading data: {}", e));
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let mut visits = Vec::with_capacity(loaded.len());
        for visit in loaded {
            // The highest id would leave nothing to assign after it
            if visit.id == u32::MAX {
                warn!(id = visit.id, "Visit id out of range in data file, skipping");
                continue;
            }
            if seen.insert(visit.id) {
                visits.push(visit);
            } else {
                warn!(id = visit.id, "Duplicate visit id in data file, keeping first");
            }
        }

        let next_id = visits
            .iter()
            .map(|v| v.id)
            .max()
            .and_then(|max| max.checked_add(1))
            .unwrap_or(1);

        if !visits.is_empty() {
            notifier.success(&format!("Loaded {} visits from file.", visits.len()));
        }
        info!(file = ?repository.location(), count = visits.len(), next_id, fresh, "Opened visit store");

        Self {
            visits,
            next_id,
            history: History::default(),
            rates,
            repository,
            notifier,
            fresh,
            dirty: false,
        }
    }

    /// True when the backing file did not exist at open time
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// True when the last save failed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// Read-only view in insertion order
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate and store a new visit
    pub fn create(&mut self, draft: VisitDraft) -> Result<Visit, StoreError> {
        let following = self.following_id()?;
        let visit = Visit::from_draft(self.next_id, draft, &self.rates)?;
        self.next_id = following;

        debug!(id = visit.id, kind = %visit.kind, fee = visit.fee, "create: adding visit");
        self.visits.push(visit.clone());
        self.history.record(Action::add(visit.clone()));
        self.persist()?;

        Ok(visit)
    }

    /// Replace the visit with `id`, keeping its id and position
    pub fn update(&mut self, id: u32, draft: VisitDraft) -> Result<Visit, StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        let visit = Visit::from_draft(id, draft, &self.rates)?;

        debug!(id, kind = %visit.kind, fee = visit.fee, "update: replacing visit");
        let before = std::mem::replace(&mut self.visits[index], visit.clone());
        self.history.record(Action::update(before, visit.clone()));
        self.persist()?;

        Ok(visit)
    }

    /// Remove the visit with `id`, returning it
    pub fn delete(&mut self, id: u32) -> Result<Visit, StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;

        debug!(id, index, "delete: removing visit");
        let visit = self.visits.remove(index);
        self.history.record(Action::delete(visit.clone(), index));
        self.persist()?;

        Ok(visit)
    }

    /// Reverse the most recent action
    ///
    /// Returns the action's description, or `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<String>, StoreError> {
        let Some(action) = self.history.pop_undo() else {
            debug!("undo: nothing to undo");
            return Ok(None);
        };

        match &action.change {
            Change::Add { visit } => self.remove_by_id(visit.id),
            Change::Update { before, .. } => self.replace_by_id(before.clone()),
            Change::Delete { visit, position } => {
                let index = (*position).min(self.visits.len());
                self.visits.insert(index, visit.clone());
            }
        }

        info!(kind = ?action.kind(), description = %action.description, "Undone");
        let description = action.description.clone();
        self.history.push_redo(action);
        self.persist()?;

        Ok(Some(description))
    }

    /// Re-apply the most recently undone action
    ///
    /// Returns the action's description, or `None` if there is nothing to redo.
    pub fn redo(&mut self) -> Result<Option<String>, StoreError> {
        let Some(action) = self.history.pop_redo() else {
            debug!("redo: nothing to redo");
            return Ok(None);
        };

        match &action.change {
            Change::Add { visit } => self.visits.push(visit.clone()),
            Change::Update { after, .. } => self.replace_by_id(after.clone()),
            Change::Delete { visit, .. } => self.remove_by_id(visit.id),
        }

        info!(kind = ?action.kind(), description = %action.description, "Redone");
        let description = action.description.clone();
        self.history.push_undo(action);
        self.persist()?;

        Ok(Some(description))
    }

    pub fn can_undo(&self) -> bool {
        self.history.undo_depth() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history.redo_depth() > 0
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Bulk-insert drafts without recording history (used for sample data)
    ///
    /// Invalid drafts are skipped. Returns the number of visits added.
    pub fn seed(&mut self, drafts: Vec<VisitDraft>) -> Result<usize, StoreError> {
        let mut added = 0;
        for draft in drafts {
            let Ok(following) = self.following_id() else {
                warn!("No visit ids left, stopping seed");
                break;
            };
            match Visit::from_draft(self.next_id, draft, &self.rates) {
                Ok(visit) => {
                    self.next_id = following;
                    self.visits.push(visit);
                    added += 1;
                }
                Err(e) => warn!(error = %e, "Skipping invalid seed visit"),
            }
        }

        info!(count = added, "Seeded visits");
        self.persist()?;
        Ok(added)
    }

    /// Retry writing the current collection
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.persist()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, id: u32) -> Result<Visit, StoreError> {
        self.visits
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Snapshot of all visits in insertion order
    pub fn list(&self) -> Vec<Visit> {
        self.visits.clone()
    }

    pub fn find(&self, filter: &Filter) -> Vec<Visit> {
        self.visits.iter().filter(|v| filter.matches(v)).cloned().collect()
    }

    /// Stable ascending sort; ties keep insertion order
    pub fn sorted_by(&self, field: SortField) -> Vec<Visit> {
        let mut visits = self.visits.clone();
        visits.sort_by(|a, b| field.compare(a, b));
        visits
    }

    /// Whether the patient already has a visit within the conflict window
    ///
    /// Advisory only: `create` does not consult it.
    pub fn has_conflict(&self, patient_name: &str, visit_date: NaiveDateTime) -> bool {
        let window = Duration::minutes(CONFLICT_WINDOW_MINUTES);
        let patient = patient_name.to_lowercase();

        self.visits.iter().any(|v| {
            let gap = v.visit_date.signed_duration_since(visit_date);
            v.patient_name.to_lowercase() == patient && gap < window && gap > -window
        })
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// The id after `next_id`, or an error once ids run out
    fn following_id(&self) -> Result<u32, StoreError> {
        self.next_id.checked_add(1).ok_or(StoreError::IdsExhausted)
    }

    fn position(&self, id: u32) -> Option<usize> {
        self.visits.iter().position(|v| v.id == id)
    }

    fn remove_by_id(&mut self, id: u32) {
        self.visits.retain(|v| v.id != id);
    }

    fn replace_by_id(&mut self, visit: Visit) {
        match self.position(visit.id) {
            Some(index) => self.visits[index] = visit,
            None => warn!(id = visit.id, "History refers to a visit that is no longer stored"),
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        match self.repository.save(&self.visits) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(source) => {
                self.dirty = true;
                let path = self.repository.location().to_path_buf();
                error!(file = ?path, error = ?source, "Failed to save visits");
                self.notifier.error(&format!("Error saving data: {}", source));
                Err(StoreError::Persistence { path, source })
            }
        }
    }
}
