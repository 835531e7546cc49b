//! Completion inference: a card is completed exactly when it sits in `done`,
//! and the project counters follow every create, move and delete.

use crate::errors::BoardError;
use crate::models::{ColumnId, TaskCard, TaskId, TaskStats};

use super::model::Board;
use super::moves::{MoveOutcome, Position, TaskMove};

impl Board {
    /// Move a task and propagate any change of terminal status.
    pub fn move_task(&mut self, from: Position, to: Position) -> Result<MoveOutcome, BoardError> {
        let outcome = self.relocate(from, to)?;
        if let MoveOutcome::Moved(mv) = &outcome {
            self.apply_move_completion(mv);
        }
        Ok(outcome)
    }

    /// Flip the moved card's flag and adjust `completed` by one. `total` never changes.
    pub fn apply_move_completion(&mut self, mv: &TaskMove) {
        if !mv.status_changed {
            return;
        }
        let done = mv.to.column.is_done();
        if let Some(card) = self.column_mut(mv.to.column).tasks.get_mut(mv.to.index) {
            card.completed = done;
        }
        let stats = self.stats_mut();
        if done {
            stats.completed = (stats.completed + 1).min(stats.total);
        } else {
            stats.completed = stats.completed.saturating_sub(1);
        }
    }

    /// Append a new card to `column`. Its `completed` flag is derived from the
    /// column and the counters grow accordingly.
    pub fn insert_task(&mut self, column: ColumnId, mut card: TaskCard) -> Position {
        card.completed = column.is_done();
        let completed = card.completed;
        let tasks = &mut self.column_mut(column).tasks;
        tasks.push(card);
        let position = Position::new(column, tasks.len() - 1);

        let stats = self.stats_mut();
        stats.total += 1;
        if completed {
            stats.completed += 1;
        }
        position
    }

    /// Remove a card and shrink the counters. Counters never go negative.
    pub fn remove_task(&mut self, task_id: TaskId) -> Result<(Position, TaskCard), BoardError> {
        let (column, index) = self
            .find_task(task_id)
            .ok_or(BoardError::TaskNotFound { id: task_id })?;
        let card = self.column_mut(column).tasks.remove(index);

        let stats = self.stats_mut();
        stats.total = stats.total.saturating_sub(1);
        if card.completed {
            stats.completed = stats.completed.saturating_sub(1);
        }
        stats.completed = stats.completed.min(stats.total);
        Ok((Position::new(column, index), card))
    }

    /// Counters recomputed from scratch by scanning every column.
    pub fn recount(&self) -> TaskStats {
        let total = self.tasks().count() as u32;
        let completed = self.column(ColumnId::Done).len() as u32;
        TaskStats { total, completed }
    }

    /// True when the incremental counters and every card flag agree with column membership.
    pub fn is_consistent(&self) -> bool {
        self.recount() == self.stats()
            && self
                .tasks()
                .all(|(column, card)| card.completed == column.is_done())
    }
}
