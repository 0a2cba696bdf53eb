// ============================================================================
// REVERSIBLE SELECTION EDITS — minimal undo records + the action log protocol
// ============================================================================

use crate::geom::WorldPoint;
use crate::volume::VolumeSource;

/// One point's selection toggle: enough to invert it exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionEdit {
    pub world: WorldPoint,
    /// True when the original edit selected the point, false when it
    /// unselected it.
    pub select: bool,
}

impl SelectionEdit {
    pub fn new(world: WorldPoint, select: bool) -> Self {
        Self { world, select }
    }

    /// Re-apply the opposite polarity at the stored point.
    pub fn undo(&self, volume: &mut dyn VolumeSource) {
        if self.select {
            volume.unselect(self.world);
        } else {
            volume.select(self.world);
        }
    }

    /// Re-apply the original polarity at the stored point.
    pub fn redo(&self, volume: &mut dyn VolumeSource) {
        if self.select {
            volume.select(self.world);
        } else {
            volume.unselect(self.world);
        }
    }
}

/// The log the region tools produce into: one named action per gesture,
/// opened before the first edit and closed after the last. The layer never
/// replays the log itself.
pub trait EditLog {
    fn begin_action(&mut self, name: &str);
    fn add(&mut self, edit: SelectionEdit);
    fn end_action(&mut self);
}

/// Throws edits away. For hosts that bring their own undo machinery and only
/// want the volume side effects.
#[derive(Default)]
pub struct NullLog;

impl EditLog for NullLog {
    fn begin_action(&mut self, _name: &str) {}
    fn add(&mut self, _edit: SelectionEdit) {}
    fn end_action(&mut self) {}
}

// ============================================================================
// SELECTION HISTORY — a concrete bounded undo/redo stack
// ============================================================================

/// A finished, named group of edits (one brush gesture or one flood).
#[derive(Clone, Debug)]
pub struct SelectionAction {
    pub name: String,
    pub edits: Vec<SelectionEdit>,
}

/// Bounded undo/redo stack over whole actions. A fresh action clears the redo
/// stack; overflowing the bound drops the oldest undoable action.
pub struct SelectionHistory {
    open: Option<SelectionAction>,
    undo_stack: Vec<SelectionAction>,
    redo_stack: Vec<SelectionAction>,
    max_actions: usize,
}

impl Default for SelectionHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SelectionHistory {
    pub fn new(max_actions: usize) -> Self {
        Self {
            open: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_actions: max_actions.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Name of the action `undo` would revert, if any.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|a| a.name.as_str())
    }

    /// Revert the most recent action. Edits are undone in reverse order so
    /// overlapping toggles unwind correctly.
    pub fn undo(&mut self, volume: &mut dyn VolumeSource) -> bool {
        match self.undo_stack.pop() {
            Some(action) => {
                for edit in action.edits.iter().rev() {
                    edit.undo(volume);
                }
                self.redo_stack.push(action);
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone action, forward order.
    pub fn redo(&mut self, volume: &mut dyn VolumeSource) -> bool {
        match self.redo_stack.pop() {
            Some(action) => {
                for edit in &action.edits {
                    edit.redo(volume);
                }
                self.undo_stack.push(action);
                true
            }
            None => false,
        }
    }
}

impl EditLog for SelectionHistory {
    fn begin_action(&mut self, name: &str) {
        // An unterminated previous gesture closes implicitly.
        self.end_action();
        self.open = Some(SelectionAction {
            name: name.to_string(),
            edits: Vec::new(),
        });
    }

    fn add(&mut self, edit: SelectionEdit) {
        if let Some(action) = self.open.as_mut() {
            action.edits.push(edit);
        }
    }

    fn end_action(&mut self) {
        if let Some(action) = self.open.take() {
            if action.edits.is_empty() {
                return;
            }
            self.redo_stack.clear();
            self.undo_stack.push(action);
            if self.undo_stack.len() > self.max_actions {
                self.undo_stack.remove(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::GridVolume;

    fn small_volume() -> GridVolume {
        GridVolume::zeros([4, 4, 4], [1.0, 1.0, 1.0])
    }

    #[test]
    fn edit_undo_then_redo_restores_recorded_state() {
        let mut vol = small_volume();
        let p = [1.0, 2.0, 3.0];
        let edit = SelectionEdit::new(p, true);

        edit.redo(&mut vol);
        assert!(vol.selection_at(p).is_some());
        edit.undo(&mut vol);
        assert!(vol.selection_at(p).is_none());
        // Idempotent under repeated redo/undo pairs
        for _ in 0..3 {
            edit.redo(&mut vol);
            assert!(vol.selection_at(p).is_some());
            edit.undo(&mut vol);
            assert!(vol.selection_at(p).is_none());
        }
    }

    #[test]
    fn history_undoes_whole_actions() {
        let mut vol = small_volume();
        let mut history = SelectionHistory::default();

        history.begin_action("Selection Brush");
        for x in 0..3 {
            let p = [x as f32, 0.0, 0.0];
            vol.select(p);
            history.add(SelectionEdit::new(p, true));
        }
        history.end_action();

        assert_eq!(history.undo_description(), Some("Selection Brush"));
        assert!(history.undo(&mut vol));
        for x in 0..3 {
            assert!(vol.selection_at([x as f32, 0.0, 0.0]).is_none());
        }
        assert!(history.redo(&mut vol));
        for x in 0..3 {
            assert!(vol.selection_at([x as f32, 0.0, 0.0]).is_some());
        }
    }

    #[test]
    fn new_action_clears_redo() {
        let mut vol = small_volume();
        let mut history = SelectionHistory::default();

        history.begin_action("a");
        history.add(SelectionEdit::new([0.0, 0.0, 0.0], true));
        history.end_action();
        history.undo(&mut vol);
        assert!(history.can_redo());

        history.begin_action("b");
        history.add(SelectionEdit::new([1.0, 0.0, 0.0], true));
        history.end_action();
        assert!(!history.can_redo());
    }

    #[test]
    fn empty_actions_are_not_recorded() {
        let mut history = SelectionHistory::default();
        history.begin_action("noop");
        history.end_action();
        assert!(!history.can_undo());
        // Stray end_action with nothing open is harmless
        history.end_action();
    }
}
