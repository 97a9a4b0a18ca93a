use crate::errors::StepsError;
use crate::filter::{FilterResult, PositionFilter};
use crate::position_iterator::PositionIterator;
use odfkit_dom::{DomPoint, NodeId};

/// Direction preferred by [`StepIterator::round_to_closest_step`] when both
/// neighbouring steps are equally far away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepDirection {
    #[default]
    Previous,
    Next,
}

/// A saved iterator position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSnapshot {
    pub container: NodeId,
    pub offset: usize,
}

impl From<StepSnapshot> for DomPoint {
    fn from(snapshot: StepSnapshot) -> Self {
        DomPoint::new(snapshot.container, snapshot.offset)
    }
}

/// Walks the positions a [`PositionFilter`] accepts.
pub struct StepIterator<'a> {
    iterator: PositionIterator<'a>,
    filter: Box<dyn PositionFilter + 'a>,
}

impl<'a> StepIterator<'a> {
    pub fn new(iterator: PositionIterator<'a>, filter: impl PositionFilter + 'a) -> Self {
        Self {
            iterator,
            filter: Box::new(filter),
        }
    }

    pub fn position_iterator(&self) -> &PositionIterator<'a> {
        &self.iterator
    }

    pub fn container(&self) -> NodeId {
        self.iterator.container()
    }

    pub fn offset(&self) -> usize {
        self.iterator.unfiltered_dom_offset()
    }

    pub fn point(&self) -> DomPoint {
        self.iterator.point()
    }

    fn accepts(&self, iterator: &PositionIterator<'_>) -> bool {
        self.filter.accept_position(iterator) != FilterResult::Reject
    }

    pub fn is_step(&self) -> bool {
        self.accepts(&self.iterator)
    }

    /// Moves to `(container, offset)` and reports whether it is a step.
    pub fn set_position(&mut self, container: NodeId, offset: usize) -> Result<bool, StepsError> {
        self.iterator.set_unfiltered_position(container, offset)?;
        Ok(self.is_step())
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            container: self.iterator.container(),
            offset: self.iterator.unfiltered_dom_offset(),
        }
    }

    pub fn restore(&mut self, snapshot: StepSnapshot) {
        self.iterator.jump_to(snapshot.container, snapshot.offset);
    }

    /// Advances to the next step. On failure the position is unchanged.
    pub fn next_step(&mut self) -> bool {
        let start = self.snapshot();
        while self.iterator.next_position() {
            if self.is_step() {
                return true;
            }
        }
        self.restore(start);
        false
    }

    /// Moves back to the previous step. On failure the position is unchanged.
    pub fn previous_step(&mut self) -> bool {
        let start = self.snapshot();
        while self.iterator.previous_position() {
            if self.is_step() {
                return true;
            }
        }
        self.restore(start);
        false
    }

    pub fn round_to_previous_step(&mut self) -> bool {
        self.is_step() || self.previous_step()
    }

    pub fn round_to_next_step(&mut self) -> bool {
        self.is_step() || self.next_step()
    }

    /// Moves to whichever neighbouring step is fewer raw positions away.
    pub fn round_to_closest_step(&mut self, preference: StepDirection) -> bool {
        if self.is_step() {
            return true;
        }

        let mut backward = self.iterator;
        let mut backward_distance = 0usize;
        let mut found_backward = false;
        while backward.previous_position() {
            backward_distance += 1;
            if self.accepts(&backward) {
                found_backward = true;
                break;
            }
        }

        let mut forward = self.iterator;
        let mut forward_distance = 0usize;
        let mut found_forward = false;
        while forward.next_position() {
            forward_distance += 1;
            if self.accepts(&forward) {
                found_forward = true;
                break;
            }
        }

        let chosen = match (found_backward, found_forward) {
            (false, false) => return false,
            (true, false) => backward,
            (false, true) => forward,
            (true, true) => {
                if backward_distance < forward_distance {
                    backward
                } else if forward_distance < backward_distance {
                    forward
                } else {
                    match preference {
                        StepDirection::Previous => backward,
                        StepDirection::Next => forward,
                    }
                }
            }
        };
        self.iterator = chosen;
        true
    }
}

impl std::fmt::Debug for StepIterator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepIterator")
            .field("iterator", &self.iterator)
            .finish()
    }
}
