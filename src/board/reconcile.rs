//! Reconciliation controller.
//!
//! Applies user actions to the local [`Board`] synchronously, persists them in
//! the background, and converges back to server truth with full-snapshot
//! overwrites.
//!
//! ```text
//!   Idle ──user action──> Mutating ──request issued──> Persisting
//!                                                          │
//!            ack: re-fetch after reconcile_delay ┌─────────┴─────────┐ failure: re-fetch now
//!                                                v                   v
//!                                             Settled             Drifted
//!                                                └─snapshot applied──┴──> Idle
//! ```
//!
//! A periodic poll re-fetches independently of user actions. Every fetched
//! snapshot is offered to the view and dropped when it is older than the
//! newest server version seen, when a persistence call is still in flight, or
//! when a local mutation happened after the fetch was issued.
//!
//! `Settled` returns to `Idle` once its re-fetch has run, applied or not.
//! `Drifted` stays until a snapshot is applied.
//!
//! All timers belong to the view and stop when it is closed or dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::SyncSettings;
use crate::errors::{BoardError, ClientError};
use crate::models::{
    DeleteAck, NewTask, ProjectBoard, ProjectId, TaskAck, TaskCard, TaskId, TaskPatch,
};

use super::client::BoardApi;
use super::model::{Board, SnapshotOutcome, TaskEdit};
use super::moves::{MoveOutcome, Position};

const EVENT_CAPACITY: usize = 64;

/// Timing knobs for one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay between a successful persistence call and the follow-up re-fetch.
    pub reconcile_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconcile_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_secs(15),
        }
    }
}

impl From<&SyncSettings> for SyncConfig {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            reconcile_delay: settings.reconcile_delay(),
            poll_interval: settings.poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Mutating,
    Persisting,
    Settled,
    Drifted,
}

/// Why a fetched snapshot was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    OlderVersion { known: u64, offered: u64 },
    PersistInFlight,
    LocalMutation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    StateChanged(SyncState),
    SnapshotApplied { version: u64 },
    SnapshotRejected { offered: u64, reason: StaleReason },
    PersistFailed { operation: &'static str, message: String },
}

/// A server acknowledgement that carries the project's post-mutation version.
pub trait Acknowledged {
    fn version(&self) -> u64;
}

impl Acknowledged for TaskAck {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Acknowledged for DeleteAck {
    fn version(&self) -> u64 {
        self.version
    }
}

struct ViewState {
    board: Board,
    sync: SyncState,
    /// Bumped by every local mutation; fetches remember the value they were issued at.
    local_seq: u64,
    in_flight: usize,
    out_of_sync: bool,
    next_provisional: TaskId,
}

struct Shared<A> {
    api: Arc<A>,
    project_id: ProjectId,
    config: SyncConfig,
    state: Mutex<ViewState>,
    events: broadcast::Sender<ViewEvent>,
    cancel: CancellationToken,
    timers: TaskTracker,
}

impl<A: BoardApi> Shared<A> {
    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: ViewEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, st: &mut ViewState, next: SyncState) {
        if st.sync == next {
            return;
        }
        debug!(
            project_id = self.project_id,
            from = ?st.sync,
            to = ?next,
            "sync state transition"
        );
        st.sync = next;
        self.emit(ViewEvent::StateChanged(next));
    }

    /// Record a local mutation that is about to be persisted.
    fn begin_persist(&self, st: &mut ViewState) {
        self.transition(st, SyncState::Mutating);
        st.local_seq += 1;
        st.in_flight += 1;
        self.transition(st, SyncState::Persisting);
    }

    fn finish_persist<T, F>(
        self: &Arc<Self>,
        operation: &'static str,
        result: Result<T, ClientError>,
        on_ack: F,
    ) where
        T: Acknowledged,
        F: FnOnce(&mut Board, &T),
    {
        if self.cancel.is_cancelled() {
            debug!(project_id = self.project_id, operation, "view closed, dropping persistence result");
            return;
        }

        let mut st = self.lock();
        st.in_flight = st.in_flight.saturating_sub(1);
        match result {
            Ok(ack) => {
                st.board.observe_version(ack.version());
                on_ack(&mut st.board, &ack);
                if st.in_flight == 0 && !st.out_of_sync {
                    self.transition(&mut st, SyncState::Settled);
                }
                drop(st);
                self.schedule_resync(self.config.reconcile_delay);
            }
            Err(err) => {
                warn!(
                    project_id = self.project_id,
                    operation,
                    error = %err,
                    "persistence call failed, board is out of sync"
                );
                st.out_of_sync = true;
                self.transition(&mut st, SyncState::Drifted);
                drop(st);
                self.emit(ViewEvent::PersistFailed {
                    operation,
                    message: err.to_string(),
                });
                self.schedule_resync(Duration::ZERO);
            }
        }
    }

    fn schedule_resync(self: &Arc<Self>, delay: Duration) {
        let shared = Arc::clone(self);
        self.timers.spawn(async move {
            tokio::select! {
                () = shared.cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    shared.resync().await;
                }
            }
        });
    }

    /// Fetch a full snapshot and offer it to the view. Returns whether it was applied.
    async fn resync(&self) -> bool {
        let issued_seq = self.lock().local_seq;
        let result = tokio::select! {
            () = self.cancel.cancelled() => return false,
            result = self.api.fetch_board(self.project_id) => result,
        };
        let applied = match result {
            Ok(snapshot) => self.offer_snapshot(snapshot, issued_seq),
            Err(err) => {
                warn!(project_id = self.project_id, error = %err, "board re-fetch failed");
                false
            }
        };
        self.fold_settled();
        applied
    }

    /// `Settled` returns to `Idle` once a re-fetch has run, whatever its
    /// outcome, as long as nothing is pending and the view is not drifted.
    fn fold_settled(&self) {
        let mut st = self.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        if st.sync == SyncState::Settled && st.in_flight == 0 && !st.out_of_sync {
            self.transition(&mut st, SyncState::Idle);
        }
    }

    fn offer_snapshot(&self, snapshot: ProjectBoard, issued_seq: u64) -> bool {
        let mut st = self.lock();
        if self.cancel.is_cancelled() {
            return false;
        }

        let offered = snapshot.summary.version;
        let blocked = if st.in_flight > 0 {
            Some(StaleReason::PersistInFlight)
        } else if st.local_seq != issued_seq {
            Some(StaleReason::LocalMutation)
        } else {
            None
        };

        let outcome = match blocked {
            Some(reason) if offered >= st.board.version() => Err(reason),
            _ => match st.board.apply_snapshot(snapshot) {
                SnapshotOutcome::Applied { version } => Ok(version),
                SnapshotOutcome::Stale { known, offered } => {
                    Err(StaleReason::OlderVersion { known, offered })
                }
            },
        };

        match outcome {
            Ok(version) => {
                st.out_of_sync = false;
                self.transition(&mut st, SyncState::Idle);
                drop(st);
                debug!(project_id = self.project_id, version, "snapshot applied");
                self.emit(ViewEvent::SnapshotApplied { version });
                true
            }
            Err(reason) => {
                drop(st);
                debug!(project_id = self.project_id, offered, ?reason, "stale snapshot ignored");
                self.emit(ViewEvent::SnapshotRejected { offered, reason });
                false
            }
        }
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the view was just loaded.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.resync().await;
                }
            }
        }
        debug!(project_id = self.project_id, "poll stopped");
    }
}

/// A live, reconciling view of one project's board.
///
/// Mutations never block on the network. Dropping the view stops every timer
/// it owns; [`BoardView::close`] additionally waits for them to wind down.
pub struct BoardView<A: BoardApi> {
    shared: Arc<Shared<A>>,
}

impl<A: BoardApi> BoardView<A> {
    /// Load the initial snapshot and start the periodic poll.
    pub async fn open(
        api: Arc<A>,
        project_id: ProjectId,
        config: SyncConfig,
    ) -> Result<Self, ClientError> {
        let snapshot = api.fetch_board(project_id).await?;
        let version = snapshot.summary.version;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let shared = Arc::new(Shared {
            api,
            project_id,
            config,
            state: Mutex::new(ViewState {
                board: Board::from_snapshot(snapshot),
                sync: SyncState::Idle,
                local_seq: 0,
                in_flight: 0,
                out_of_sync: false,
                next_provisional: -1,
            }),
            events,
            cancel: CancellationToken::new(),
            timers: TaskTracker::new(),
        });
        shared.timers.spawn(Arc::clone(&shared).poll_loop());

        info!(project_id, version, "board view opened");
        Ok(Self { shared })
    }

    pub fn project_id(&self) -> ProjectId {
        self.shared.project_id
    }

    /// A copy of the current local board.
    pub fn board(&self) -> Board {
        self.shared.lock().board.clone()
    }

    pub fn sync_state(&self) -> SyncState {
        self.shared.lock().sync
    }

    /// True after a failed persistence call until the next snapshot is applied.
    pub fn is_out_of_sync(&self) -> bool {
        self.shared.lock().out_of_sync
    }

    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.shared.events.subscribe()
    }

    /// Move a task. Moves that change column are persisted; reordering inside
    /// a column is local only because ordering is not stored.
    pub fn move_task(&self, from: Position, to: Position) -> Result<MoveOutcome, BoardError> {
        let shared = &self.shared;
        let mut st = shared.lock();
        // Only cross-column moves are persisted, so only they need a server id.
        if from.column != to.column {
            if let Some(card) = st.board.task_at(from) {
                ensure_acknowledged(card.id)?;
            }
        }

        let outcome = st.board.move_task(from, to)?;
        let MoveOutcome::Moved(mv) = outcome else {
            return Ok(outcome);
        };
        if !mv.changes_column() {
            st.local_seq += 1;
            return Ok(outcome);
        }

        shared.begin_persist(&mut st);
        drop(st);

        let project_id = shared.project_id;
        let patch = TaskPatch {
            column_id: Some(mv.to.column),
            ..Default::default()
        };
        self.persist(
            "move",
            move |api| async move { api.update_task(project_id, mv.task_id, &patch).await },
            |_: &mut Board, _: &TaskAck| {},
        );
        Ok(outcome)
    }

    /// Optimistically add a task. Returns the provisional (negative) id it is
    /// shown under until the server acknowledges it.
    pub fn add_task(&self, task: NewTask) -> Result<TaskId, BoardError> {
        if task.title.trim().is_empty() {
            return Err(BoardError::Validation("Task title is required".into()));
        }

        let shared = &self.shared;
        let mut st = shared.lock();
        let provisional = st.next_provisional;
        st.next_provisional -= 1;
        st.board.insert_task(
            task.column_id,
            TaskCard {
                id: provisional,
                title: task.title.clone(),
                description: task.description.clone(),
                priority: task.priority,
                completed: false,
            },
        );
        shared.begin_persist(&mut st);
        drop(st);

        let project_id = shared.project_id;
        self.persist(
            "create",
            move |api| async move { api.create_task(project_id, &task).await },
            move |board: &mut Board, ack: &TaskAck| {
                if !board.resolve_task_id(provisional, ack.task.id) {
                    debug!(provisional, assigned = ack.task.id, "provisional task no longer on board");
                }
            },
        );
        Ok(provisional)
    }

    pub fn edit_task(&self, task_id: TaskId, edit: TaskEdit) -> Result<(), BoardError> {
        if edit.is_empty() {
            return Ok(());
        }

        let shared = &self.shared;
        let mut st = shared.lock();
        if st.board.find_task(task_id).is_some() {
            ensure_acknowledged(task_id)?;
        }
        st.board.edit_task(task_id, &edit)?;
        shared.begin_persist(&mut st);
        drop(st);

        let project_id = shared.project_id;
        let patch = TaskPatch {
            title: edit.title,
            description: edit.description,
            priority: edit.priority,
            ..Default::default()
        };
        self.persist(
            "edit",
            move |api| async move { api.update_task(project_id, task_id, &patch).await },
            |_: &mut Board, _: &TaskAck| {},
        );
        Ok(())
    }

    pub fn delete_task(&self, task_id: TaskId) -> Result<TaskCard, BoardError> {
        let shared = &self.shared;
        let mut st = shared.lock();
        if st.board.find_task(task_id).is_some() {
            ensure_acknowledged(task_id)?;
        }
        let (_, card) = st.board.remove_task(task_id)?;
        shared.begin_persist(&mut st);
        drop(st);

        let project_id = shared.project_id;
        self.persist(
            "delete",
            move |api| async move { api.delete_task(project_id, task_id).await },
            |_: &mut Board, _: &DeleteAck| {},
        );
        Ok(card)
    }

    /// Re-fetch now. Returns whether the snapshot was applied.
    pub async fn refresh(&self) -> bool {
        self.shared.resync().await
    }

    /// Stop the poll and every pending deferred re-fetch, and wait for them to finish.
    pub async fn close(self) {
        self.shared.cancel.cancel();
        self.shared.timers.close();
        self.shared.timers.wait().await;
        info!(project_id = self.shared.project_id, "board view closed");
    }

    fn persist<T, R, Fut, F>(&self, operation: &'static str, request: R, on_ack: F)
    where
        T: Acknowledged + Send + 'static,
        R: FnOnce(Arc<A>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
        F: FnOnce(&mut Board, &T) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = request(Arc::clone(&shared.api)).await;
            shared.finish_persist(operation, result, on_ack);
        });
    }
}

impl<A: BoardApi> Drop for BoardView<A> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

/// Tasks created locally carry negative ids until the server assigns one.
fn ensure_acknowledged(task_id: TaskId) -> Result<(), BoardError> {
    if task_id < 0 {
        return Err(BoardError::PendingCreate { id: task_id });
    }
    Ok(())
}
