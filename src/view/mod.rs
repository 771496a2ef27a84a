//! Per-view state, updated only through `ViewState::apply`.

pub mod list;

pub use list::{ListView, PendingUpdate, UpdateOutcome, UpdateRejected};

use crate::poller::{FetchTicket, PollEvent};
use chrono::{DateTime, Local};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The view was torn down before the event arrived.
    TornDown,
    /// A newer fetch has been started.
    Superseded,
}

/// What `ViewState::apply` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// A silent fetch failed; data and status were left alone.
    Suppressed,
    Discarded(DiscardReason),
}

#[derive(Debug, Clone)]
pub struct ViewState<T> {
    data: T,
    status: LoadStatus,
    last_updated: Option<DateTime<Local>>,
    latest: Option<FetchTicket>,
    /// Whether the latest fetch surfaces its outcome.
    visible: bool,
    torn_down: bool,
}

impl<T: Default> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            status: LoadStatus::Idle,
            last_updated: None,
            latest: None,
            visible: false,
            torn_down: false,
        }
    }
}

impl<T: Default> ViewState<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> ViewState<T> {
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Local edits (optimistic patches). Load status is untouched.
    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            LoadStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn latest_generation(&self) -> Option<u64> {
        self.latest.map(|t| t.generation)
    }

    /// Every later event is discarded.
    pub fn tear_down(&mut self) {
        self.torn_down = true;
    }

    pub fn apply(&mut self, event: PollEvent<T>) -> Transition {
        self.apply_at(event, Local::now())
    }

    pub fn apply_at(&mut self, event: PollEvent<T>, now: DateTime<Local>) -> Transition {
        if self.torn_down {
            return Transition::Discarded(DiscardReason::TornDown);
        }

        match event {
            PollEvent::Started(ticket) => {
                if self
                    .latest
                    .is_some_and(|latest| ticket.generation < latest.generation)
                {
                    return Transition::Discarded(DiscardReason::Superseded);
                }
                // A silent fetch replacing a visible one keeps the spinner
                self.visible = ticket.show_loading || self.status == LoadStatus::Loading;
                self.latest = Some(ticket);
                if ticket.show_loading {
                    self.status = LoadStatus::Loading;
                }
                Transition::Applied
            }
            PollEvent::Finished { ticket, result } => {
                if self.latest_generation() != Some(ticket.generation) {
                    return Transition::Discarded(DiscardReason::Superseded);
                }
                match result {
                    Ok(data) => {
                        self.data = data;
                        self.status = LoadStatus::Success;
                        self.last_updated = Some(now);
                        self.visible = false;
                        Transition::Applied
                    }
                    Err(message) if self.visible => {
                        tracing::warn!("Load failed: {}", message);
                        self.status = LoadStatus::Error(message);
                        self.visible = false;
                        Transition::Applied
                    }
                    Err(message) => {
                        tracing::warn!("Background refresh failed: {}", message);
                        Transition::Suppressed
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(generation: u64, show_loading: bool) -> PollEvent<Vec<u32>> {
        PollEvent::Started(FetchTicket {
            generation,
            show_loading,
        })
    }

    fn finished(
        generation: u64,
        show_loading: bool,
        result: Result<Vec<u32>, &str>,
    ) -> PollEvent<Vec<u32>> {
        PollEvent::Finished {
            ticket: FetchTicket {
                generation,
                show_loading,
            },
            result: result.map_err(str::to_string),
        }
    }

    #[test]
    fn test_visible_load_cycle() {
        let mut state = ViewState::<Vec<u32>>::new();
        assert_eq!(state.status(), &LoadStatus::Idle);

        assert_eq!(state.apply(started(1, true)), Transition::Applied);
        assert!(state.is_loading());

        assert_eq!(state.apply(finished(1, true, Ok(vec![1, 2]))), Transition::Applied);
        assert_eq!(state.status(), &LoadStatus::Success);
        assert_eq!(state.data(), &vec![1, 2]);
        assert!(state.last_updated().is_some());
    }

    #[test]
    fn test_silent_start_keeps_status() {
        let mut state = ViewState::<Vec<u32>>::new();
        state.apply(started(1, true));
        state.apply(finished(1, true, Ok(vec![1])));
        state.apply(started(2, false));
        assert_eq!(state.status(), &LoadStatus::Success);
    }

    #[test]
    fn test_silent_failure_after_loading_visible_fetch_is_shown() {
        let mut state = ViewState::<Vec<u32>>::new();
        state.apply(started(1, true));
        state.apply(started(2, false));
        assert!(state.is_loading());
        assert_eq!(state.apply(finished(2, false, Err("boom"))), Transition::Applied);
        assert_eq!(state.error(), Some("boom"));
    }

    #[test]
    fn test_finished_without_start_is_discarded() {
        let mut state = ViewState::<Vec<u32>>::new();
        assert_eq!(
            state.apply(finished(1, true, Ok(vec![1]))),
            Transition::Discarded(DiscardReason::Superseded)
        );
        assert_eq!(state.status(), &LoadStatus::Idle);
    }
}
