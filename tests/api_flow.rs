//! End-to-end tests: a real server on a loopback port, driven through the
//! HTTP client and a reconciling board view.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use taskboard::board::{
    BoardApi, BoardView, HttpBoardApi, Identity, Position, SyncConfig, SyncState, ViewEvent,
};
use taskboard::errors::ClientError;
use taskboard::models::{ColumnId, CreatedProject, NewTask, ProjectId, TaskPatch, TaskStats};
use taskboard::server::db::{BoardDb, DbHandle};
use taskboard::server::serve;

const USER: &str = "user-1";

struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let db = DbHandle::new(BoardDb::new_in_memory().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, db, false, async {
            let _ = rx.await;
        }));
        Self {
            base_url: format!("http://{}", addr),
            shutdown: Some(tx),
            handle,
        }
    }

    fn api(&self, user_id: &str) -> Arc<HttpBoardApi> {
        let identity = Identity {
            user_id: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
        };
        Arc::new(HttpBoardApi::new(&self.base_url, identity).unwrap())
    }

    async fn create_project(&self, name: &str) -> ProjectId {
        let resp = reqwest::Client::new()
            .post(format!("{}/api/projects", self.base_url))
            .header("x-user-id", USER)
            .json(&serde_json::json!({"name": name, "description": "e2e"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let created: CreatedProject = resp.json().await.unwrap();
        assert_eq!(created.message, "Project created successfully");
        created.project.id
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn fast_sync() -> SyncConfig {
    SyncConfig {
        reconcile_delay: Duration::from_millis(50),
        poll_interval: Duration::from_secs(60),
    }
}

/// Wait until the view applies a snapshot at `version` or newer.
async fn wait_for_version(events: &mut broadcast::Receiver<ViewEvent>, version: u64) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(ViewEvent::SnapshotApplied { version: applied }) if applied >= version => break,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "no snapshot at version {} within 5s", version);
}

// =============================================================================
// HTTP client against the real server
// =============================================================================

#[tokio::test]
async fn test_client_task_lifecycle() {
    let server = TestServer::start().await;
    let project_id = server.create_project("Website").await;
    let api = server.api(USER);

    let board = api.fetch_board(project_id).await.unwrap();
    assert_eq!(board.summary.name, "Website");
    assert_eq!(board.summary.version, 1);
    assert_eq!(board.columns.len(), 4);
    assert_eq!(board.columns[1].name, "In Progress");

    let created = api
        .create_task(project_id, &NewTask::new("Write docs", ColumnId::Todo))
        .await
        .unwrap();
    assert_eq!(created.message, "Task created successfully");
    assert!(created.task.id > 0);
    assert!(!created.task.completed);
    assert_eq!(created.version, 2);

    let patch = TaskPatch {
        column_id: Some(ColumnId::Done),
        ..Default::default()
    };
    let moved = api
        .update_task(project_id, created.task.id, &patch)
        .await
        .unwrap();
    assert!(moved.task.completed);
    assert_eq!(moved.task.column_id, ColumnId::Done);
    assert_eq!(moved.version, 3);

    let board = api.fetch_board(project_id).await.unwrap();
    assert_eq!(board.summary.task_stats, TaskStats { total: 1, completed: 1 });
    assert_eq!(board.summary.progress, 100);
    assert_eq!(board.columns[3].tasks[0].id, created.task.id);

    let deleted = api.delete_task(project_id, created.task.id).await.unwrap();
    assert_eq!(deleted.message, "Task deleted successfully");
    assert_eq!(deleted.version, 4);

    let board = api.fetch_board(project_id).await.unwrap();
    assert_eq!(board.summary.task_stats, TaskStats::default());

    server.stop().await;
}

#[tokio::test]
async fn test_client_maps_error_statuses() {
    let server = TestServer::start().await;
    let project_id = server.create_project("Private").await;

    let anonymous = server.api("  ");
    assert!(matches!(
        anonymous.fetch_board(project_id).await,
        Err(ClientError::Unauthorized)
    ));

    let stranger = server.api("someone-else");
    match stranger.fetch_board(project_id).await {
        Err(ClientError::NotFound(message)) => assert_eq!(message, "Project not found"),
        other => panic!("Expected NotFound, got {:?}", other.map(|b| b.summary.id)),
    }

    let owner = server.api(USER);
    match owner
        .create_task(project_id, &NewTask::new("   ", ColumnId::Todo))
        .await
    {
        Err(ClientError::Validation { message, errors }) => {
            assert_eq!(message, "Invalid task data");
            assert!(errors.iter().any(|e| e.field == "title"));
        }
        other => panic!("Expected Validation, got {:?}", other.map(|a| a.task.id)),
    }

    assert!(matches!(
        owner.delete_task(project_id, 9999).await,
        Err(ClientError::NotFound(_))
    ));

    server.stop().await;
}

// =============================================================================
// Board view against the real server
// =============================================================================

#[tokio::test]
async fn test_view_converges_after_optimistic_actions() {
    let server = TestServer::start().await;
    let project_id = server.create_project("Launch").await;
    let api = server.api(USER);
    api.create_task(project_id, &NewTask::new("Spec", ColumnId::Todo))
        .await
        .unwrap();

    let view = BoardView::open(Arc::clone(&api), project_id, fast_sync())
        .await
        .unwrap();
    let mut events = view.subscribe();
    assert_eq!(view.board().stats(), TaskStats { total: 1, completed: 0 });

    // Optimistic add shows up immediately under a provisional id.
    let provisional = view
        .add_task(NewTask::new("Ship it", ColumnId::Done))
        .unwrap();
    assert!(provisional < 0);
    assert_eq!(view.board().stats(), TaskStats { total: 2, completed: 1 });
    wait_for_version(&mut events, 3).await;

    let board = view.board();
    assert!(board.task(provisional).is_none());
    assert_eq!(board.stats(), TaskStats { total: 2, completed: 1 });
    assert!(board.tasks().all(|(_, card)| card.id > 0));

    // Move the remaining todo card into done.
    view.move_task(
        Position::new(ColumnId::Todo, 0),
        Position::new(ColumnId::Done, 0),
    )
    .unwrap();
    assert_eq!(view.board().stats(), TaskStats { total: 2, completed: 2 });
    wait_for_version(&mut events, 4).await;

    let server_board = api.fetch_board(project_id).await.unwrap();
    assert_eq!(server_board.summary.task_stats, TaskStats { total: 2, completed: 2 });
    assert_eq!(view.board().stats(), TaskStats { total: 2, completed: 2 });
    assert_eq!(view.sync_state(), SyncState::Idle);
    assert!(view.board().is_consistent());

    view.close().await;
    server.stop().await;
}

#[tokio::test]
async fn test_view_recovers_from_rejected_write() {
    let server = TestServer::start().await;
    let project_id = server.create_project("Cleanup").await;
    let api = server.api(USER);
    let task = api
        .create_task(project_id, &NewTask::new("Old", ColumnId::Review))
        .await
        .unwrap()
        .task;

    let view = BoardView::open(Arc::clone(&api), project_id, fast_sync())
        .await
        .unwrap();
    let mut events = view.subscribe();

    // Another session deletes the task first.
    api.delete_task(project_id, task.id).await.unwrap();

    view.delete_task(task.id).unwrap();
    let failed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(ViewEvent::PersistFailed { operation, .. }) = events.recv().await {
                return operation;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(failed, "delete");

    wait_for_version(&mut events, 3).await;
    assert!(!view.is_out_of_sync());
    assert_eq!(view.board().stats(), TaskStats::default());

    view.close().await;
    server.stop().await;
}

#[tokio::test]
async fn test_refresh_picks_up_other_sessions() {
    let server = TestServer::start().await;
    let project_id = server.create_project("Shared").await;
    let api = server.api(USER);

    let view = BoardView::open(Arc::clone(&api), project_id, fast_sync())
        .await
        .unwrap();
    api.create_task(project_id, &NewTask::new("From elsewhere", ColumnId::InProgress))
        .await
        .unwrap();

    assert!(view.refresh().await);
    let board = view.board();
    assert_eq!(board.version(), 2);
    assert_eq!(board.column(ColumnId::InProgress).len(), 1);

    view.close().await;
    server.stop().await;
}
