//! Conversion between step numbers and tree positions.
//!
//! Walking from the start of the body for every lookup is linear in the
//! document size, so the translator keeps a sparse cache of the positions
//! of every `interval`-th step. Any mutation must drop the checkpoints at
//! or after the first affected step; checkpoints are also re-validated
//! when read and silently replaced when they went stale.

use crate::errors::StepsError;
use crate::step_iterator::{StepIterator, StepSnapshot};
use odfkit_dom::{DomPoint, NodeId};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How a position between steps is mapped onto a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    #[default]
    Previous,
    Next,
}

#[derive(Debug)]
pub struct StepsTranslator {
    /// Node whose first position is step 0
    root: NodeId,

    /// Distance in steps between two checkpoints
    interval: usize,

    /// Iterator snapshots keyed by step; filled lazily by lookups
    checkpoints: RefCell<BTreeMap<usize, StepSnapshot>>,
}

impl StepsTranslator {
    pub fn new(root: NodeId, interval: usize) -> Self {
        Self {
            root,
            interval: interval.max(1),
            checkpoints: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.borrow().len()
    }

    fn is_valid_checkpoint(&self, iterator: &mut StepIterator<'_>, snapshot: StepSnapshot) -> bool {
        let tree = iterator.position_iterator().tree();
        if !tree.contains(self.root, snapshot.container) {
            return false;
        }
        if snapshot.offset > tree.node_length(snapshot.container) {
            return false;
        }
        iterator.restore(snapshot);
        iterator.is_step()
    }

    /// Positions `iterator` on the nearest usable checkpoint accepted by
    /// `usable` and returns its step. Falls back to the first step.
    fn seek_checkpoint(
        &self,
        iterator: &mut StepIterator<'_>,
        usable: impl Fn(usize, StepSnapshot) -> bool,
    ) -> Result<usize, StepsError> {
        let candidates: Vec<(usize, StepSnapshot)> = self
            .checkpoints
            .borrow()
            .iter()
            .rev()
            .map(|(&step, &snapshot)| (step, snapshot))
            .collect();

        for (step, snapshot) in candidates {
            if !self.is_valid_checkpoint(iterator, snapshot) {
                warn!(step, container = %snapshot.container, "Discarding stale step checkpoint");
                self.checkpoints.borrow_mut().split_off(&step);
                continue;
            }
            if usable(step, snapshot) {
                return Ok(step);
            }
        }

        debug!(root = %self.root, "No usable checkpoint, walking from the first step");
        iterator.set_position(self.root, 0)?;
        if !iterator.round_to_next_step() {
            return Err(StepsError::NoWalkablePositions);
        }
        Ok(0)
    }

    fn record(&self, step: usize, iterator: &StepIterator<'_>) {
        if step > 0 && step % self.interval == 0 {
            self.checkpoints.borrow_mut().insert(step, iterator.snapshot());
        }
    }

    /// Position of `step`.
    pub fn convert_steps_to_dom_point(
        &self,
        iterator: &mut StepIterator<'_>,
        step: usize,
    ) -> Result<DomPoint, StepsError> {
        let mut current = self.seek_checkpoint(iterator, |checkpoint, _| checkpoint <= step)?;
        while current < step {
            if !iterator.next_step() {
                return Err(StepsError::OutOfRange { step, last: current });
            }
            current += 1;
            self.record(current, iterator);
        }
        Ok(iterator.point())
    }

    /// Step of `point`, rounding positions that are not steps.
    ///
    /// A point before the first step maps to step 0. With
    /// [`Rounding::Next`] a point after the last step maps to the last step.
    pub fn convert_dom_point_to_steps(
        &self,
        iterator: &mut StepIterator<'_>,
        point: DomPoint,
        rounding: Rounding,
    ) -> Result<usize, StepsError> {
        let tree = iterator.position_iterator().tree();
        if !tree.contains(self.root, point.node) {
            return Err(StepsError::PointOutsideRoot(point));
        }

        iterator.set_position(point.node, point.offset)?;
        let rounded = match rounding {
            Rounding::Previous => iterator.round_to_previous_step(),
            Rounding::Next => iterator.round_to_next_step() || iterator.round_to_previous_step(),
        };
        if !rounded {
            iterator.set_position(self.root, 0)?;
            return if iterator.round_to_next_step() {
                Ok(0)
            } else {
                Err(StepsError::NoWalkablePositions)
            };
        }
        let target = iterator.point();

        let mut current = self.seek_checkpoint(iterator, |_, snapshot| {
            tree.compare_points(snapshot.into(), target) != Ordering::Greater
        })?;
        loop {
            let position = iterator.point();
            if position == target {
                return Ok(current);
            }
            if tree.compare_points(position, target) == Ordering::Greater || !iterator.next_step() {
                return Err(StepsError::Unreachable(target));
            }
            current += 1;
            self.record(current, iterator);
        }
    }

    /// Index of the last step.
    pub fn step_count(&self, iterator: &mut StepIterator<'_>) -> Result<usize, StepsError> {
        let mut current = self.seek_checkpoint(iterator, |_, _| true)?;
        while iterator.next_step() {
            current += 1;
            self.record(current, iterator);
        }
        Ok(current)
    }

    /// Drops every checkpoint at or after `position`.
    pub fn invalidate_from(&self, position: usize) {
        self.checkpoints.borrow_mut().split_off(&position);
    }

    pub fn handle_steps_inserted(&self, position: usize) {
        self.invalidate_from(position);
    }

    pub fn handle_steps_removed(&self, position: usize) {
        self.invalidate_from(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{NodeFilterChain, TextPositionFilter};
    use crate::position_iterator::PositionIterator;
    use odfkit_dom::{ns, xml, Tree};

    fn fixture() -> Tree {
        let source = format!(
            r#"<office:text xmlns:office="{}" xmlns:text="{}"><text:p>abc</text:p><text:p>de</text:p></office:text>"#,
            ns::OFFICE,
            ns::TEXT
        );
        xml::parse(&source).unwrap()
    }

    #[test]
    fn test_steps_and_points_round_trip() {
        let tree = fixture();
        let filter = NodeFilterChain::for_text_body(vec![]);
        let translator = StepsTranslator::new(tree.root(), 2);
        let iterator = || StepIterator::new(PositionIterator::new(&tree, tree.root(), &filter), TextPositionFilter);

        assert_eq!(translator.step_count(&mut iterator()).unwrap(), 6);
        for step in 0..=6 {
            let point = translator.convert_steps_to_dom_point(&mut iterator(), step).unwrap();
            let back = translator
                .convert_dom_point_to_steps(&mut iterator(), point, Rounding::Previous)
                .unwrap();
            assert_eq!(back, step);
        }
        assert!(translator.checkpoint_count() > 0);
    }

    #[test]
    fn test_out_of_range_step() {
        let tree = fixture();
        let filter = NodeFilterChain::for_text_body(vec![]);
        let translator = StepsTranslator::new(tree.root(), 500);
        let mut iterator = StepIterator::new(PositionIterator::new(&tree, tree.root(), &filter), TextPositionFilter);

        let error = translator.convert_steps_to_dom_point(&mut iterator, 7).unwrap_err();
        assert!(matches!(error, StepsError::OutOfRange { step: 7, last: 6 }));
    }

    #[test]
    fn test_point_between_paragraphs_rounds() {
        let tree = fixture();
        let filter = NodeFilterChain::for_text_body(vec![]);
        let translator = StepsTranslator::new(tree.root(), 500);
        let mut iterator = StepIterator::new(PositionIterator::new(&tree, tree.root(), &filter), TextPositionFilter);
        let between = DomPoint::new(tree.root(), 1);

        assert_eq!(
            translator
                .convert_dom_point_to_steps(&mut iterator, between, Rounding::Previous)
                .unwrap(),
            3
        );
        assert_eq!(
            translator
                .convert_dom_point_to_steps(&mut iterator, between, Rounding::Next)
                .unwrap(),
            4
        );
    }

    #[test]
    fn test_invalidate_drops_later_checkpoints() {
        let tree = fixture();
        let filter = NodeFilterChain::for_text_body(vec![]);
        let translator = StepsTranslator::new(tree.root(), 1);
        let mut iterator = StepIterator::new(PositionIterator::new(&tree, tree.root(), &filter), TextPositionFilter);

        translator.step_count(&mut iterator).unwrap();
        assert_eq!(translator.checkpoint_count(), 6);
        translator.invalidate_from(3);
        assert_eq!(translator.checkpoint_count(), 2);
    }
}
