use super::{Transition, ViewState};
use crate::data::StatusRecord;
use crate::poller::PollEvent;
use std::collections::HashMap;

/// A status write the operator started and the backend has not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate<S> {
    pub id: String,
    pub previous: Option<S>,
    pub requested: S,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UpdateRejected {
    #[error("row is no longer in the list")]
    UnknownRow,
    #[error("an update for this row is already in progress")]
    AlreadyUpdating,
    #[error("row already has that status")]
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Confirmed,
    /// The write failed; the row shows its previous status again unless
    /// something else changed it meanwhile.
    Reverted { message: String },
}

/// A polled table of status-bearing records.
pub struct ListView<R: StatusRecord> {
    state: ViewState<Vec<R>>,
    selected: usize,
    expanded: Option<String>,
    in_flight: HashMap<String, PendingUpdate<R::Status>>,
}

impl<R: StatusRecord> Default for ListView<R> {
    fn default() -> Self {
        Self {
            state: ViewState::default(),
            selected: 0,
            expanded: None,
            in_flight: HashMap::new(),
        }
    }
}

impl<R: StatusRecord> ListView<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState<Vec<R>> {
        &self.state
    }

    pub fn rows(&self) -> &[R] {
        self.state.data()
    }

    pub fn row(&self, id: &str) -> Option<&R> {
        self.rows().iter().find(|r| r.id() == id)
    }

    pub fn apply(&mut self, event: PollEvent<Vec<R>>) -> Transition {
        let replaced = matches!(
            event,
            PollEvent::Finished { result: Ok(_), .. }
        );
        let transition = self.state.apply(event);
        if transition == Transition::Applied && replaced {
            self.reapply_in_flight();
            self.clamp_selection();
            if let Some(id) = &self.expanded {
                if self.row(id).is_none() {
                    self.expanded = None;
                }
            }
        }
        transition
    }

    pub fn tear_down(&mut self) {
        self.state.tear_down();
    }

    /// Fresh rows still carry the server's old status while a write is pending.
    fn reapply_in_flight(&mut self) {
        let in_flight = &self.in_flight;
        for row in self.state.data_mut().iter_mut() {
            if let Some(pending) = in_flight.get(row.id()) {
                row.set_status(Some(pending.requested));
            }
        }
    }

    /// Optimistically set `id`'s status and mark the row busy.
    pub fn begin_status_update(
        &mut self,
        id: &str,
        status: R::Status,
    ) -> Result<PendingUpdate<R::Status>, UpdateRejected> {
        if self.in_flight.contains_key(id) {
            return Err(UpdateRejected::AlreadyUpdating);
        }
        let row = self
            .state
            .data_mut()
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(UpdateRejected::UnknownRow)?;
        let previous = row.status();
        if previous == Some(status) {
            return Err(UpdateRejected::Unchanged);
        }
        row.set_status(Some(status));

        let pending = PendingUpdate {
            id: id.to_string(),
            previous,
            requested: status,
        };
        self.in_flight.insert(id.to_string(), pending.clone());
        Ok(pending)
    }

    /// Settle the in-flight write for `id`. `None` when nothing was pending.
    pub fn finish_status_update(
        &mut self,
        id: &str,
        result: Result<(), String>,
    ) -> Option<UpdateOutcome> {
        let pending = self.in_flight.remove(id)?;
        match result {
            Ok(()) => Some(UpdateOutcome::Confirmed),
            Err(message) => {
                if let Some(row) = self.state.data_mut().iter_mut().find(|r| r.id() == id) {
                    if row.status() == Some(pending.requested) {
                        row.set_status(pending.previous);
                    }
                }
                Some(UpdateOutcome::Reverted { message })
            }
        }
    }

    pub fn is_updating(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn updates_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&R> {
        self.rows().get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows().len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows().len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.rows().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.as_deref() == Some(id)
    }

    /// Expand the selected row, or collapse it if already expanded.
    /// Only one row is expanded at a time.
    pub fn toggle_expanded(&mut self) {
        let Some(id) = self.selected().map(|r| r.id().to_string()) else {
            return;
        };
        if self.is_expanded(&id) {
            self.expanded = None;
        } else {
            self.expanded = Some(id);
        }
    }
}
