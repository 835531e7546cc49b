//! `taskboard watch`: follow one project's board from a running server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use taskboard::board::{Board, BoardView, HttpBoardApi, Identity, SyncConfig, ViewEvent};
use taskboard::models::ProjectId;

pub async fn cmd_watch(
    base_url: &str,
    identity: Identity,
    project_id: ProjectId,
    sync: SyncConfig,
) -> Result<()> {
    let api = Arc::new(HttpBoardApi::new(base_url, identity)?);
    let view = BoardView::open(api, project_id, sync)
        .await
        .with_context(|| format!("Failed to load project {} from {}", project_id, base_url))?;
    let mut events = view.subscribe();
    log_board(&view.board());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(ViewEvent::SnapshotApplied { .. }) => log_board(&view.board()),
                Ok(ViewEvent::SnapshotRejected { offered, reason }) => {
                    debug!(offered, ?reason, "snapshot ignored");
                }
                Ok(ViewEvent::PersistFailed { operation, message }) => {
                    warn!(operation, %message, "change was not saved");
                }
                Ok(ViewEvent::StateChanged(state)) => debug!(?state, "sync state"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    view.close().await;
    Ok(())
}

fn log_board(board: &Board) {
    let stats = board.stats();
    info!(
        project_id = board.project_id(),
        name = board.name(),
        version = board.version(),
        total = stats.total,
        completed = stats.completed,
        progress = board.progress(),
        columns = %column_summary(board),
        "board snapshot"
    );
}

/// `todo=2 in-progress=1 review=0 done=3`
fn column_summary(board: &Board) -> String {
    board
        .columns()
        .iter()
        .map(|column| format!("{}={}", column.id, column.len()))
        .collect::<Vec<_>>()
        .join(" ")
}
