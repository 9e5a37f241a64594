//! Web links for a session: pull request, branch and compare view.

use fogsync_protocol::{Repo, SessionSummary};
use serde::Serialize;

const DEFAULT_BASE_BRANCH: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    PullRequest,
    Branch,
    Compare,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionLinks {
    pub pull_request: Option<String>,
    pub branch: Option<String>,
    pub compare: Option<String>,
}

impl SessionLinks {
    pub fn get(&self, kind: LinkKind) -> Option<&str> {
        match kind {
            LinkKind::PullRequest => self.pull_request.as_deref(),
            LinkKind::Branch => self.branch.as_deref(),
            LinkKind::Compare => self.compare.as_deref(),
        }
    }
}

/// Browser address of a GitHub remote, from its SSH or HTTPS clone URL.
pub fn repo_web_url(remote: &str) -> Option<String> {
    let remote = remote.trim();
    let path = remote
        .strip_prefix("git@github.com:")
        .or_else(|| remote.strip_prefix("https://github.com/"))?;
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    if path.is_empty() {
        return None;
    }
    Some(format!("https://github.com/{path}"))
}

pub fn branch_url(repo: &Repo, branch: &str) -> Option<String> {
    let web = repo_web_url(&repo.url)?;
    let branch = branch.trim();
    if branch.is_empty() {
        return None;
    }
    Some(format!("{web}/tree/{}", urlencoding::encode(branch)))
}

pub fn compare_url(repo: &Repo, branch: &str) -> Option<String> {
    let web = repo_web_url(&repo.url)?;
    let branch = branch.trim();
    if branch.is_empty() {
        return None;
    }
    let base = match repo.default_branch.trim() {
        "" => DEFAULT_BASE_BRANCH,
        b => b,
    };
    Some(format!(
        "{web}/compare/{}...{}?expand=1",
        urlencoding::encode(base),
        urlencoding::encode(branch)
    ))
}

pub fn session_links(session: &SessionSummary, repos: &[Repo]) -> SessionLinks {
    let pull_request = Some(session.pr_url.trim())
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let repo = repos
        .iter()
        .find(|r| r.name.trim() == session.repo_name.trim());
    SessionLinks {
        pull_request,
        branch: repo.and_then(|r| branch_url(r, &session.branch)),
        compare: repo.and_then(|r| compare_url(r, &session.branch)),
    }
}
