use crate::errors::BoardError;
use crate::models::{ColumnId, TaskId};

use super::model::Board;

/// A slot on the board: a column and an index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub column: ColumnId,
    pub index: usize,
}

impl Position {
    pub fn new(column: ColumnId, index: usize) -> Self {
        Self { column, index }
    }
}

/// A relocation that actually changed the board layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMove {
    pub task_id: TaskId,
    pub from: Position,
    pub to: Position,
    /// True when the task entered or left the `done` column.
    pub status_changed: bool,
}

impl TaskMove {
    pub fn changes_column(&self) -> bool {
        self.from.column != self.to.column
    }

    pub fn entered_done(&self) -> bool {
        self.status_changed && self.to.column.is_done()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Source and destination were the same slot; nothing happened.
    Unchanged,
    Moved(TaskMove),
}

impl Board {
    /// Relocate the task at `from` so that it ends up at `to`.
    ///
    /// Layout only: the card's `completed` flag and the project counters are
    /// left untouched. Use [`Board::move_task`] to get completion inference too.
    ///
    /// `to.index` is interpreted against the destination column *after* the
    /// task has been removed from its source, so it may equal the destination
    /// length (append). Bounds are checked before anything is mutated.
    pub fn relocate(&mut self, from: Position, to: Position) -> Result<MoveOutcome, BoardError> {
        if from == to {
            let len = self.column(from.column).len();
            if from.index >= len {
                return Err(BoardError::OutOfRange {
                    column: from.column,
                    index: from.index,
                    len,
                });
            }
            return Ok(MoveOutcome::Unchanged);
        }

        let source_len = self.column(from.column).len();
        if from.index >= source_len {
            return Err(BoardError::OutOfRange {
                column: from.column,
                index: from.index,
                len: source_len,
            });
        }

        let dest_len = if from.column == to.column {
            source_len - 1
        } else {
            self.column(to.column).len()
        };
        if to.index > dest_len {
            return Err(BoardError::OutOfRange {
                column: to.column,
                index: to.index,
                len: dest_len,
            });
        }

        let card = self.column_mut(from.column).tasks.remove(from.index);
        let task_id = card.id;
        self.column_mut(to.column).tasks.insert(to.index, card);

        Ok(MoveOutcome::Moved(TaskMove {
            task_id,
            from,
            to,
            status_changed: from.column.is_done() != to.column.is_done(),
        }))
    }
}
