use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionType {
    #[default]
    Range,
    Region,
}

/// A member's selection, held as step indices.
///
/// `anchor` is where the selection started and `focus` where it ends; a
/// backwards selection has `focus < anchor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdtCursor {
    pub member_id: String,
    pub anchor: usize,
    pub focus: usize,
    pub selection_type: SelectionType,
}

impl OdtCursor {
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            anchor: 0,
            focus: 0,
            selection_type: SelectionType::Range,
        }
    }

    pub fn position(&self) -> usize {
        self.focus
    }

    pub fn length(&self) -> i64 {
        self.focus as i64 - self.anchor as i64
    }

    /// First and last step covered by the selection.
    pub fn bounds(&self) -> (usize, usize) {
        (self.anchor.min(self.focus), self.anchor.max(self.focus))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn set_collapsed(&mut self, step: usize) {
        self.anchor = step;
        self.focus = step;
    }

    /// Shifts the cursor after `length` steps appeared at `position`.
    /// A cursor sitting exactly at `position` only moves when `sticky`.
    pub fn handle_steps_inserted(&mut self, position: usize, length: usize, sticky: bool) {
        let shift = |step: usize| {
            if step > position || (step == position && sticky) {
                step + length
            } else {
                step
            }
        };
        self.anchor = shift(self.anchor);
        self.focus = shift(self.focus);
    }

    /// Shifts the cursor after the steps `position + 1..=position + length`
    /// disappeared.
    pub fn handle_steps_removed(&mut self, position: usize, length: usize) {
        let shift = |step: usize| {
            if step <= position {
                step
            } else if step <= position + length {
                position
            } else {
                step - length
            }
        };
        self.anchor = shift(self.anchor);
        self.focus = shift(self.focus);
    }
}

/// Cursor position and signed selection length as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSelection {
    pub position: usize,
    pub length: i64,
}
