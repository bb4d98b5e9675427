//! Observable state published by one synchronized store.

/// Snapshot of one store as seen by observers.
///
/// Replaced atomically; observers never see a half-applied update.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<T> {
    /// Records from the most recently delivered snapshot, in delivery order.
    pub records: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    awaiting_snapshot: bool,
    in_flight: usize,
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            error: None,
            awaiting_snapshot: false,
            in_flight: 0,
        }
    }
}

impl<T> StoreState<T> {
    /// Returns whether a listener is open but has not delivered yet.
    pub fn awaiting_snapshot(&self) -> bool {
        self.awaiting_snapshot
    }

    /// Number of mutations still waiting on the collaborator.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn start_listening(&mut self, keep_records: bool) {
        if !keep_records {
            self.records.clear();
        }
        self.awaiting_snapshot = true;
        self.error = None;
        self.refresh_loading();
    }

    pub(crate) fn apply_snapshot(&mut self, records: Vec<T>) {
        self.records = records;
        self.awaiting_snapshot = false;
        self.refresh_loading();
    }

    pub(crate) fn begin_mutation(&mut self) {
        self.in_flight += 1;
        self.error = None;
        self.refresh_loading();
    }

    pub(crate) fn end_mutation(&mut self, error: Option<String>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if error.is_some() {
            self.error = error;
        }
        self.refresh_loading();
    }

    pub(crate) fn reset(&mut self) {
        let in_flight = self.in_flight;
        *self = Self::default();
        self.in_flight = in_flight;
        self.refresh_loading();
    }

    fn refresh_loading(&mut self) {
        self.loading = self.awaiting_snapshot || self.in_flight > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::StoreState;

    #[test]
    fn loading_tracks_snapshot_and_mutations() {
        let mut state = StoreState::<u32>::default();
        assert!(!state.loading);

        state.start_listening(false);
        assert!(state.loading);

        state.begin_mutation();
        state.apply_snapshot(vec![1, 2]);
        assert!(state.loading, "mutation still in flight");

        state.end_mutation(None);
        assert!(!state.loading);
        assert_eq!(state.records, vec![1, 2]);
    }

    #[test]
    fn failed_mutation_records_error_without_touching_records() {
        let mut state = StoreState::<u32>::default();
        state.apply_snapshot(vec![7]);
        state.begin_mutation();
        state.end_mutation(Some("offline".to_string()));

        assert_eq!(state.records, vec![7]);
        assert_eq!(state.error.as_deref(), Some("offline"));
        assert!(!state.loading);
    }

    #[test]
    fn reset_keeps_in_flight_count() {
        let mut state = StoreState::<u32>::default();
        state.apply_snapshot(vec![1]);
        state.begin_mutation();
        state.reset();

        assert!(state.records.is_empty());
        assert_eq!(state.in_flight(), 1);
        assert!(state.loading);
    }
}
