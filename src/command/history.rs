use super::{Command, CommandResult};
use crate::error::StoreError;
use crate::scene::DrawingList;

/// Manages the history of executed commands for undo/redo functionality
#[derive(Debug, Default)]
pub struct CommandHistory {
    /// Stack of commands that can be undone
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone
    redo_stack: Vec<Command>,
}

impl CommandHistory {
    /// Creates a new empty command history
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a command and add it to the history if successful
    pub fn execute(&mut self, command: Command, drawings: &mut DrawingList) -> CommandResult {
        command.execute(drawings)?;
        log::debug!("{}", command.name());
        self.undo_stack.push(command);
        // A new change invalidates whatever was undone before it
        self.redo_stack.clear();
        Ok(())
    }

    /// Undo the last executed command
    pub fn undo(&mut self, drawings: &mut DrawingList) -> CommandResult {
        let command = self.undo_stack.pop().ok_or(StoreError::NothingToUndo)?;
        if let Err(err) = command.undo(drawings) {
            self.undo_stack.push(command);
            return Err(err);
        }
        log::debug!("Undo {}", command.name());
        self.redo_stack.push(command);
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self, drawings: &mut DrawingList) -> CommandResult {
        let command = self.redo_stack.pop().ok_or(StoreError::NothingToRedo)?;
        if let Err(err) = command.execute(drawings) {
            self.redo_stack.push(command);
            return Err(err);
        }
        log::debug!("Redo {}", command.name());
        self.undo_stack.push(command);
        Ok(())
    }

    /// Returns true if there are commands that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are commands that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear the command history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
