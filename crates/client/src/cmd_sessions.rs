//! `fogsync sessions` / `watch` / `create` / `followup` / `open`.

use fogsync::{LinkKind, SyncHandle, SyncNotice};
use fogsync_protocol::{CreateSessionRequest, SessionSummary};
use tokio::sync::broadcast::error::RecvError;

fn session_line(session: &SessionSummary) -> String {
    let flag = if session.busy { "*" } else { " " };
    format!(
        "{flag} {:<24} {:<12} {:<20} {}",
        session.id,
        session.effective_state().as_str(),
        session.repo_name,
        session.branch
    )
}

pub fn list(handle: &SyncHandle) -> anyhow::Result<()> {
    let snapshot = handle.snapshot();
    println!();
    println!("  fog daemon v{}", snapshot.version);
    println!();
    println!("  Running ({})", snapshot.running_sessions().len());
    for session in snapshot.running_sessions() {
        println!("  {}", session_line(session));
    }
    println!();
    println!("  Completed ({})", snapshot.completed_sessions().len());
    for session in snapshot.completed_sessions() {
        println!("  {}", session_line(session));
    }
    println!();
    Ok(())
}

pub async fn watch(handle: &SyncHandle) -> anyhow::Result<()> {
    let mut notices = handle.subscribe();
    let mut seen = Vec::new();
    list(handle)?;
    print_changes(handle, &mut seen, false);
    loop {
        let notice = tokio::select! {
            notice = notices.recv() => notice,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        match notice {
            Ok(SyncNotice::SessionsRefreshed { .. }) => print_changes(handle, &mut seen, true),
            Ok(SyncNotice::ConnectionChanged { status }) => {
                println!("  connection: {status:?}");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => print_changes(handle, &mut seen, true),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

/// Print sessions whose state changed since the last call.
fn print_changes(handle: &SyncHandle, seen: &mut Vec<(String, String)>, announce: bool) {
    let snapshot = handle.snapshot();
    for session in &snapshot.sessions {
        let state = session.effective_state().to_string();
        match seen.iter_mut().find(|(id, _)| id == &session.id) {
            Some((_, last)) if *last == state => {}
            Some((_, last)) => {
                println!("  {} -> {}", session.id, state);
                *last = state;
            }
            None => {
                if announce {
                    println!("  {} new ({})", session.id, state);
                }
                seen.push((session.id.clone(), state));
            }
        }
    }
}

pub async fn create(handle: &SyncHandle, request: CreateSessionRequest) -> anyhow::Result<()> {
    let response = handle.create_session(request).await?;
    println!();
    println!("  Session: {}", response.session_id);
    if let Some(run_id) = response.run_id.as_deref().filter(|r| !r.is_empty()) {
        println!("  Run:     {run_id}");
    }
    println!();
    Ok(())
}

pub async fn followup(handle: &SyncHandle, session_id: &str, prompt: &str) -> anyhow::Result<()> {
    let run_id = handle.create_followup(session_id, prompt).await?;
    println!();
    println!("  Session: {session_id}");
    println!("  Run:     {run_id}");
    println!();
    Ok(())
}

pub async fn open(handle: &SyncHandle, session_id: &str, kind: LinkKind) -> anyhow::Result<()> {
    handle.select_session(session_id, true).await?;
    let url = handle.open_link(kind).await?;
    println!("  Opened {url}");
    Ok(())
}
