use std::collections::BTreeSet;

/// Union of server-confirmed and locally pending ids, sorted.
#[must_use]
pub fn union_completed(
    server_confirmed: &BTreeSet<String>,
    pending_local: &BTreeSet<String>,
) -> Vec<String> {
    server_confirmed.union(pending_local).cloned().collect()
}

/// Completion ids for one list (chores or outdoor activities) as the UI
/// shows them.
///
/// The server's list is replaced wholesale on every refresh. Ids the user
/// just completed live in `pending_local` until their post and the follow-up
/// refresh settle, so the display never flickers back to "not done".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimisticCompletions {
    server_confirmed: BTreeSet<String>,
    pending_local: BTreeSet<String>,
}

impl OptimisticCompletions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the server truth with the ids from the latest snapshot.
    pub fn confirm_from_server<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server_confirmed = ids.into_iter().map(Into::into).collect();
    }

    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        self.server_confirmed.contains(id) || self.pending_local.contains(id)
    }

    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending_local.contains(id)
    }

    /// Marks `id` as pending.
    ///
    /// Returns `false` when the id already counts as completed, in which case
    /// nothing should be submitted.
    pub fn begin(&mut self, id: &str) -> bool {
        if self.is_completed(id) {
            return false;
        }
        self.pending_local.insert(id.to_string())
    }

    /// Drops `id` from the pending set once its post and refresh settled,
    /// whether they succeeded or not.
    pub fn settle(&mut self, id: &str) {
        self.pending_local.remove(id);
    }

    /// Records that the server accepted `id` before a snapshot showing it
    /// arrived. The next `confirm_from_server` replaces it like any other id.
    pub fn accept(&mut self, id: &str) {
        self.pending_local.remove(id);
        self.server_confirmed.insert(id.to_string());
    }

    #[must_use]
    pub fn displayed(&self) -> Vec<String> {
        union_completed(&self.server_confirmed, &self.pending_local)
    }

    #[must_use]
    pub fn server_confirmed(&self) -> &BTreeSet<String> {
        &self.server_confirmed
    }

    #[must_use]
    pub fn pending_local(&self) -> &BTreeSet<String> {
        &self.pending_local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_ids_show_as_completed_until_settled() {
        let mut completions = OptimisticCompletions::new();
        completions.confirm_from_server(["bed"]);
        assert!(completions.begin("dishes"));
        assert_eq!(completions.displayed(), vec!["bed", "dishes"]);
        assert!(completions.is_pending("dishes"));

        completions.settle("dishes");
        assert_eq!(completions.displayed(), vec!["bed"]);
        assert!(!completions.is_completed("dishes"));
    }

    #[test]
    fn begin_refuses_completed_or_pending_ids() {
        let mut completions = OptimisticCompletions::new();
        completions.confirm_from_server(["bed"]);
        assert!(!completions.begin("bed"));
        assert!(completions.begin("dishes"));
        assert!(!completions.begin("dishes"));
    }

    #[test]
    fn server_refresh_replaces_truth_but_keeps_pending() {
        let mut completions = OptimisticCompletions::new();
        completions.confirm_from_server(["bed", "trash"]);
        completions.begin("dishes");
        completions.confirm_from_server(["dishes"]);

        assert_eq!(completions.displayed(), vec!["dishes"]);
        completions.settle("dishes");
        assert_eq!(completions.displayed(), vec!["dishes"]);
    }

    #[test]
    fn accepted_ids_stay_completed_until_the_next_snapshot() {
        let mut completions = OptimisticCompletions::new();
        completions.confirm_from_server(["bed"]);
        completions.begin("dishes");
        completions.accept("dishes");

        assert!(!completions.is_pending("dishes"));
        assert!(!completions.begin("dishes"));
        assert_eq!(completions.displayed(), vec!["bed", "dishes"]);
    }
}
