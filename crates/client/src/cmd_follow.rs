//! `fogsync follow <session>`: print a run's events, live while active.

use std::collections::HashSet;

use fogsync::{AppSnapshot, DetailStatus, StreamCloseReason, SyncHandle, SyncNotice};
use fogsync_protocol::RunEvent;
use tokio::sync::broadcast::error::RecvError;

fn event_line(event: &RunEvent) -> String {
    format!(
        "  [{:>5}] {:<14} {}",
        event.id,
        event.event_type,
        event.body()
    )
}

/// Prints each event id of the current run once.
#[derive(Default)]
struct Printer {
    run_id: String,
    printed: HashSet<u64>,
}

impl Printer {
    fn catch_up(&mut self, handle: &SyncHandle) {
        let snapshot = handle.snapshot();
        let timeline = &snapshot.detail.timeline;
        if timeline.run_id() != self.run_id {
            self.run_id = timeline.run_id().to_string();
            self.printed.clear();
            if let Some(run) = snapshot.selected_run() {
                println!();
                println!("  Run {} ({})", run.id, run.state);
                if !run.prompt.is_empty() {
                    println!("  {}", run.prompt);
                }
                println!();
            }
        }
        for event in timeline.events() {
            self.print(event);
        }
    }

    fn print(&mut self, event: &RunEvent) {
        if self.printed.insert(event.id) {
            println!("{}", event_line(event));
        }
    }
}

/// Nothing left to follow: no live stream and the run is terminal.
fn run_finished(snapshot: &AppSnapshot) -> bool {
    snapshot.stream.is_none() && !snapshot.selected_run().is_some_and(|run| run.state.is_active())
}

pub async fn run(
    handle: &SyncHandle,
    session_id: &str,
    run_id: Option<String>,
) -> anyhow::Result<()> {
    let mut notices = handle.subscribe();
    handle.select_session(session_id, run_id.is_none()).await?;
    if let Some(run_id) = run_id {
        handle.select_run(run_id).await?;
    }

    let snapshot = handle.snapshot();
    if snapshot.detail.status == DetailStatus::NotFound {
        anyhow::bail!("Session {session_id} not found");
    }

    let mut printer = Printer::default();
    printer.catch_up(handle);
    if snapshot.stream.is_none() {
        return Ok(());
    }

    loop {
        let notice = tokio::select! {
            notice = notices.recv() => notice,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        match notice {
            Ok(SyncNotice::EventAppended { run_id, event, .. }) if run_id == printer.run_id => {
                printer.print(&event);
            }
            Ok(SyncNotice::DetailLoaded { .. }) => {
                printer.catch_up(handle);
                if run_finished(&handle.snapshot()) {
                    return Ok(());
                }
            }
            Ok(SyncNotice::StreamClosed { reason, .. }) => match reason {
                StreamCloseReason::Error(message) => {
                    eprintln!("  stream interrupted: {message} (resuming on next poll)");
                }
                // Auto-follow moved to a newer run; its stream opens next.
                StreamCloseReason::Superseded => {}
                // The daemon may finish the stream before the run state
                // settles; the next detail reload decides.
                StreamCloseReason::Done => {
                    printer.catch_up(handle);
                    if run_finished(&handle.snapshot()) {
                        return Ok(());
                    }
                }
                StreamCloseReason::Terminal
                | StreamCloseReason::Cleared
                | StreamCloseReason::Teardown => {
                    printer.catch_up(handle);
                    return Ok(());
                }
            },
            Ok(SyncNotice::SelectionCleared { .. }) => {
                anyhow::bail!("Session {session_id} was removed");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(_)) => printer.catch_up(handle),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
