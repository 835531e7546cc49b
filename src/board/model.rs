use chrono::Utc;

use crate::errors::BoardError;
use crate::models::{
    ColumnId, ColumnView, Priority, ProjectBoard, ProjectId, ProjectSummary, TaskCard, TaskId,
    TaskStats,
};

use super::moves::Position;

/// One board column holding an ordered run of task cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub tasks: Vec<TaskCard>,
}

impl Column {
    fn empty(id: ColumnId) -> Self {
        Self {
            id,
            name: id.display_name().to_string(),
            tasks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Result of offering a fetched snapshot to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied { version: u64 },
    Stale { known: u64, offered: u64 },
}

/// Field edits for a task. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.priority.is_none()
    }
}

/// In-memory snapshot of one project's board for a single viewing session.
///
/// Always holds exactly four columns in [`ColumnId::ALL`] order. The project's
/// `task_stats` are maintained incrementally by the mutation methods; `version`
/// is the highest server version this board has observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    project: ProjectSummary,
    columns: Vec<Column>,
}

impl Board {
    /// An empty board for a project that has no tasks yet.
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project: ProjectSummary {
                id: project_id,
                name: name.into(),
                description: None,
                created_at: now,
                updated_at: now,
                version: 0,
                task_stats: TaskStats::default(),
                progress: 0,
            },
            columns: ColumnId::ALL.iter().copied().map(Column::empty).collect(),
        }
    }

    pub fn from_snapshot(snapshot: ProjectBoard) -> Self {
        let mut board = Self::new(snapshot.summary.id, snapshot.summary.name.clone());
        board.load(snapshot);
        board
    }

    /// Replace the entire board with a trusted server snapshot. No merging:
    /// every column, card, counter and the version come from `snapshot`.
    ///
    /// Card `completed` flags are re-derived from column membership.
    pub fn load(&mut self, snapshot: ProjectBoard) {
        let mut columns: Vec<Column> = ColumnId::ALL.iter().copied().map(Column::empty).collect();
        for view in snapshot.columns {
            let done = view.id.is_done();
            let column = &mut columns[view.id.ordinal()];
            if !view.name.is_empty() {
                column.name = view.name;
            }
            column.tasks.extend(view.tasks.into_iter().map(|mut card| {
                card.completed = done;
                card
            }));
        }
        self.project = snapshot.summary;
        self.columns = columns;
    }

    /// Load `snapshot` unless it is older than the newest version already seen.
    pub fn apply_snapshot(&mut self, snapshot: ProjectBoard) -> SnapshotOutcome {
        let known = self.project.version;
        let offered = snapshot.summary.version;
        if offered < known {
            return SnapshotOutcome::Stale { known, offered };
        }
        self.load(snapshot);
        SnapshotOutcome::Applied { version: offered }
    }

    /// Record a server version learned from a mutation acknowledgement.
    pub fn observe_version(&mut self, version: u64) {
        self.project.version = self.project.version.max(version);
    }

    pub fn project_id(&self) -> ProjectId {
        self.project.id
    }

    pub fn name(&self) -> &str {
        &self.project.name
    }

    pub fn version(&self) -> u64 {
        self.project.version
    }

    pub fn stats(&self) -> TaskStats {
        self.project.task_stats
    }

    pub fn progress(&self) -> u8 {
        self.project.task_stats.progress()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.ordinal()]
    }

    pub(crate) fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        &mut self.columns[id.ordinal()]
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TaskStats {
        &mut self.project.task_stats
    }

    /// Locate a task by id.
    pub fn find_task(&self, task_id: TaskId) -> Option<(ColumnId, usize)> {
        self.columns.iter().find_map(|column| {
            column
                .tasks
                .iter()
                .position(|card| card.id == task_id)
                .map(|index| (column.id, index))
        })
    }

    pub fn task(&self, task_id: TaskId) -> Option<&TaskCard> {
        self.find_task(task_id)
            .map(|(column, index)| &self.column(column).tasks[index])
    }

    pub fn task_at(&self, position: Position) -> Option<&TaskCard> {
        self.column(position.column).tasks.get(position.index)
    }

    pub fn tasks(&self) -> impl Iterator<Item = (ColumnId, &TaskCard)> {
        self.columns
            .iter()
            .flat_map(|column| column.tasks.iter().map(move |card| (column.id, card)))
    }

    /// Apply field edits to a task. Never touches column membership or counters.
    pub fn edit_task(&mut self, task_id: TaskId, edit: &TaskEdit) -> Result<(), BoardError> {
        if let Some(title) = &edit.title {
            if title.trim().is_empty() {
                return Err(BoardError::Validation("Task title is required".into()));
            }
        }
        let (column, index) = self
            .find_task(task_id)
            .ok_or(BoardError::TaskNotFound { id: task_id })?;
        let card = &mut self.column_mut(column).tasks[index];
        if let Some(title) = &edit.title {
            card.title = title.clone();
        }
        if let Some(description) = &edit.description {
            card.description = description.clone();
        }
        if let Some(priority) = edit.priority {
            card.priority = priority;
        }
        Ok(())
    }

    /// Swap a provisional id for the id the server assigned. Returns false when
    /// the provisional card is no longer on the board.
    pub fn resolve_task_id(&mut self, provisional: TaskId, assigned: TaskId) -> bool {
        match self.find_task(provisional) {
            Some((column, index)) => {
                self.column_mut(column).tasks[index].id = assigned;
                true
            }
            None => false,
        }
    }

    /// Render the board back into its wire representation.
    pub fn to_snapshot(&self) -> ProjectBoard {
        let mut summary = self.project.clone();
        summary.progress = summary.task_stats.progress();
        ProjectBoard {
            summary,
            columns: self
                .columns
                .iter()
                .map(|column| ColumnView {
                    id: column.id,
                    name: column.name.clone(),
                    tasks: column.tasks.clone(),
                })
                .collect(),
        }
    }
}
