//! Client-local selection state and the run selection policy.
//!
//! Nothing here does IO; the policy is a pure function of the current
//! selection and the freshly fetched runs.

use fogsync_protocol::RunSummary;
use serde::Serialize;

/// Which screen the user is looking at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    New,
    Detail,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub session_id: String,
    pub run_id: String,
    /// Track the most recent run instead of a pinned one.
    pub auto_follow_latest: bool,
    pub view: View,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            run_id: String::new(),
            auto_follow_latest: true,
            view: View::New,
        }
    }
}

impl Selection {
    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }

    pub fn has_run(&self) -> bool {
        !self.run_id.is_empty()
    }

    pub fn clear_session(&mut self) {
        self.session_id.clear();
        self.run_id.clear();
    }

    /// True when a tick should follow the list refresh with a detail reload.
    pub fn wants_detail(&self) -> bool {
        self.has_session() && self.view == View::Detail
    }
}

/// Decide which run to display after fetching `runs` (most recent first).
///
/// Returns the first run when following latest or nothing is pinned, the
/// pinned run while it still exists, else the first run. Empty when there
/// are no runs. Never returns an id absent from `runs`.
pub fn pick_run(auto_follow_latest: bool, selected_run_id: &str, runs: &[RunSummary]) -> String {
    let first = || runs.first().map(|r| r.id.clone()).unwrap_or_default();
    if auto_follow_latest || selected_run_id.is_empty() {
        return first();
    }
    if runs.iter().any(|r| r.id == selected_run_id) {
        selected_run_id.to_string()
    } else {
        first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogsync_protocol::RunState;

    fn runs(ids: &[&str]) -> Vec<RunSummary> {
        ids.iter()
            .map(|id| RunSummary {
                id: id.to_string(),
                session_id: "s1".to_string(),
                state: RunState::AiRunning,
                ..RunSummary::default()
            })
            .collect()
    }

    #[test]
    fn auto_follow_takes_latest_even_when_pinned() {
        assert_eq!(pick_run(true, "r1", &runs(&["r3", "r2", "r1"])), "r3");
    }

    #[test]
    fn nothing_pinned_takes_latest() {
        assert_eq!(pick_run(false, "", &runs(&["r2", "r1"])), "r2");
    }

    #[test]
    fn pinned_run_sticks_while_present() {
        assert_eq!(pick_run(false, "r1", &runs(&["r3", "r2", "r1"])), "r1");
    }

    #[test]
    fn vanished_pin_falls_back_to_latest() {
        assert_eq!(pick_run(false, "r9", &runs(&["r3", "r2"])), "r3");
    }

    #[test]
    fn no_runs_clears_selection() {
        assert_eq!(pick_run(false, "r1", &[]), "");
        assert_eq!(pick_run(true, "", &[]), "");
    }

    #[test]
    fn result_is_always_a_fetched_run_or_empty() {
        let fetched = runs(&["a", "b", "c"]);
        for follow in [true, false] {
            for pinned in ["", "a", "b", "c", "zz"] {
                let picked = pick_run(follow, pinned, &fetched);
                assert!(fetched.iter().any(|r| r.id == picked), "{follow} {pinned}");
            }
        }
    }

    #[test]
    fn detail_reload_requires_session_and_detail_view() {
        let mut selection = Selection::default();
        assert!(selection.auto_follow_latest);
        assert!(!selection.wants_detail());

        selection.session_id = "s1".to_string();
        assert!(!selection.wants_detail());
        selection.view = View::Detail;
        assert!(selection.wants_detail());

        selection.run_id = "r1".to_string();
        selection.clear_session();
        assert!(!selection.has_session());
        assert!(!selection.has_run());
    }
}
