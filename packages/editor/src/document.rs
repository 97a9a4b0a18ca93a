//! The editable ODF text document.
//!
//! `OdtDocument` owns the tree together with everything operations need
//! to address it in steps: the filters, the checkpointed translator, the
//! member and cursor registries and the signal notifier. Cursors are
//! plain step indices; every operation that changes the number of steps
//! reports it through [`OdtDocument::steps_inserted`] or
//! [`OdtDocument::steps_removed`], which keeps both the translator cache
//! and the cursors in sync.

use crate::config::EditorConfig;
use crate::cursor::{CursorSelection, OdtCursor, SelectionType};
use crate::errors::{EditorError, OperationError, StepsError};
use crate::filter::{NodeFilterChain, PositionFilter, PositionFilterChain, RootFilter, TextPositionFilter};
use crate::member::Member;
use crate::odf_utils::{inline_root, paragraph_element};
use crate::position_iterator::PositionIterator;
use crate::signals::{EventNotifier, Signal, SignalKind, SubscriptionId};
use crate::step_iterator::{StepDirection, StepIterator};
use crate::steps_translator::{Rounding, StepsTranslator};
use odfkit_dom::{ns, xml, DomPoint, DomRange, NodeId, QName, Tree};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

const EMPTY_DOCUMENT: &str = r#"<office:document xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0"><office:meta/><office:styles/><office:automatic-styles/><office:body><office:text><text:p/></office:text></office:body></office:document>"#;

/// Binary attachment stored by `SetBlob`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mimetype: String,
    pub content: String,
}

/// A text node and character offset at a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNodePosition {
    pub text_node: NodeId,
    pub offset: usize,
}

/// A tree selection as reported by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomSelection {
    pub anchor: DomPoint,
    pub focus: DomPoint,
}

/// Editable ODF text document
pub struct OdtDocument {
    /// Whole `office:document` tree
    tree: Tree,

    /// `office:text`, root of all steps
    body: NodeId,

    /// `office:meta`
    meta: NodeId,

    /// `office:styles`, common styles
    styles: NodeId,

    /// `office:automatic-styles`
    automatic_styles: NodeId,

    config: EditorConfig,

    /// Hides blacklisted namespaces and formatting whitespace from iteration
    node_filter: NodeFilterChain,

    /// Decides which positions are steps
    position_filter: TextPositionFilter,

    /// Checkpointed step ⇄ point cache over `body`
    translator: StepsTranslator,

    /// Cursors by member id
    cursors: BTreeMap<String, OdtCursor>,

    /// Members by id
    members: BTreeMap<String, Member>,

    /// Binary attachments by filename
    blobs: BTreeMap<String, Blob>,

    notifier: Rc<EventNotifier>,

    /// Set once the first edit ran
    edited_in_session: bool,

    /// Last suffix handed out for generated style names
    style_counter: usize,
}

impl OdtDocument {
    /// A document holding a single empty paragraph.
    pub fn new(config: EditorConfig) -> Result<Self, EditorError> {
        Self::from_xml(EMPTY_DOCUMENT, config)
    }

    pub fn from_xml(source: &str, config: EditorConfig) -> Result<Self, EditorError> {
        Self::from_tree(xml::parse(source)?, config)
    }

    /// Wraps an existing tree. The root must contain an `office:text` body;
    /// missing `office:meta`, `office:styles` and `office:automatic-styles`
    /// containers are created next to it.
    pub fn from_tree(mut tree: Tree, config: EditorConfig) -> Result<Self, EditorError> {
        let root = tree.root();
        let body = tree
            .find_element(root, ns::OFFICE, "text")
            .ok_or(EditorError::MissingBody)?;
        let branch = std::iter::once(body)
            .chain(tree.ancestors(body))
            .find(|&node| tree.parent(node) == Some(root))
            .ok_or(EditorError::MissingBody)?;

        let container = |tree: &mut Tree, local: &str| -> Result<NodeId, EditorError> {
            if let Some(existing) = tree.find_element(root, ns::OFFICE, local) {
                return Ok(existing);
            }
            let element = tree.create_element(QName::new(ns::OFFICE, local));
            tree.insert_before(root, element, Some(branch))?;
            Ok(element)
        };
        let meta = container(&mut tree, "meta")?;
        let styles = container(&mut tree, "styles")?;
        let automatic_styles = container(&mut tree, "automatic-styles")?;

        debug!(body = %body, "Opened document");
        Ok(Self {
            node_filter: NodeFilterChain::for_text_body(config.blacklisted_namespaces.clone()),
            translator: StepsTranslator::new(body, config.effective_checkpoint_interval()),
            position_filter: TextPositionFilter,
            tree,
            body,
            meta,
            styles,
            automatic_styles,
            config,
            cursors: BTreeMap::new(),
            members: BTreeMap::new(),
            blobs: BTreeMap::new(),
            notifier: Rc::new(EventNotifier::new()),
            edited_in_session: false,
            style_counter: 0,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The `office:text` element steps are counted from.
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn meta(&self) -> NodeId {
        self.meta
    }

    pub fn styles(&self) -> NodeId {
        self.styles
    }

    pub fn automatic_styles(&self) -> NodeId {
        self.automatic_styles
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn to_xml(&self) -> String {
        xml::write(&self.tree)
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    pub fn notifier(&self) -> Rc<EventNotifier> {
        Rc::clone(&self.notifier)
    }

    pub fn subscribe(&self, kind: SignalKind, handler: impl Fn(&Signal) + 'static) -> SubscriptionId {
        self.notifier.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn emit(&self, signal: Signal) {
        self.notifier.emit(&signal);
    }

    // ------------------------------------------------------------------
    // Step iteration
    // ------------------------------------------------------------------

    pub fn position_filter(&self) -> TextPositionFilter {
        self.position_filter
    }

    pub fn create_position_iterator(&self, root: NodeId) -> PositionIterator<'_> {
        PositionIterator::new(&self.tree, root, &self.node_filter)
    }

    /// Step iterator bounded to `subtree`, positioned at
    /// `(container, offset)` and walking the steps every filter accepts.
    pub fn create_step_iterator<'a>(
        &'a self,
        container: NodeId,
        offset: usize,
        filters: Vec<Box<dyn PositionFilter + 'a>>,
        subtree: NodeId,
    ) -> Result<StepIterator<'a>, StepsError> {
        let mut iterator = StepIterator::new(
            self.create_position_iterator(subtree),
            PositionFilterChain::from(filters),
        );
        iterator.set_position(container, offset)?;
        Ok(iterator)
    }

    /// Step iterator over the whole body with the document's own filter.
    pub fn root_step_iterator(&self) -> StepIterator<'_> {
        StepIterator::new(self.create_position_iterator(self.body), self.position_filter)
    }

    /// Index of the last step, 0 for a body without walkable positions.
    pub fn step_count(&self) -> usize {
        self.translator
            .step_count(&mut self.root_step_iterator())
            .unwrap_or(0)
    }

    pub fn convert_steps_to_dom_point(&self, step: usize) -> Result<DomPoint, StepsError> {
        self.translator
            .convert_steps_to_dom_point(&mut self.root_step_iterator(), step)
    }

    pub fn convert_dom_point_to_steps(&self, point: DomPoint, rounding: Rounding) -> Result<usize, StepsError> {
        self.translator
            .convert_dom_point_to_steps(&mut self.root_step_iterator(), point, rounding)
    }

    /// Tree range covered by a step selection. A negative `length` selects
    /// backwards from `position`; the returned range is always ordered.
    pub fn convert_cursor_to_dom_range(&self, position: usize, length: i64) -> Result<DomRange, StepsError> {
        let end = position as i64 + length;
        if end < 0 {
            return Err(StepsError::InvalidRange { position, length });
        }
        let (first, second) = if length < 0 {
            (end as usize, position)
        } else {
            (position, end as usize)
        };
        let start = self.convert_steps_to_dom_point(first)?;
        if first == second {
            return Ok(DomRange::collapsed(start));
        }
        let end = self.convert_steps_to_dom_point(second)?;
        Ok(DomRange::new(start, end))
    }

    pub fn convert_dom_to_cursor_range(&self, selection: &DomSelection) -> Result<CursorSelection, StepsError> {
        let anchor = self.convert_dom_point_to_steps(selection.anchor, Rounding::Previous)?;
        let focus = if selection.anchor == selection.focus {
            anchor
        } else {
            self.convert_dom_point_to_steps(selection.focus, Rounding::Previous)?
        };
        Ok(CursorSelection {
            position: anchor,
            length: focus as i64 - anchor as i64,
        })
    }

    /// Number of steps inside `paragraph`, nested annotations included.
    pub fn paragraph_step_count(&self, paragraph: NodeId) -> usize {
        let mut iterator = StepIterator::new(self.create_position_iterator(paragraph), self.position_filter);
        if !iterator.round_to_next_step() {
            return 0;
        }
        let mut count = 1;
        while iterator.next_step() {
            count += 1;
        }
        count
    }

    /// Step of the first position of `paragraph`.
    pub fn paragraph_start_step(&self, paragraph: NodeId) -> Result<usize, StepsError> {
        self.convert_dom_point_to_steps(DomPoint::new(paragraph, 0), Rounding::Next)
    }

    /// Paragraph containing `step`, if the step lies in one.
    pub fn paragraph_at_step(&self, step: usize) -> Result<Option<NodeId>, StepsError> {
        let point = self.convert_steps_to_dom_point(step)?;
        Ok(paragraph_element(&self.tree, point.node))
    }

    // ------------------------------------------------------------------
    // Steps bookkeeping
    // ------------------------------------------------------------------

    /// Drops translator checkpoints at or after `position`.
    pub fn invalidate_steps_from(&self, position: usize) {
        self.translator.invalidate_from(position);
    }

    /// Records `length` new steps right after step `position`. The cursor of
    /// `sticky_member` moves along when it sits exactly at `position`.
    pub fn steps_inserted(&mut self, position: usize, length: usize, sticky_member: Option<&str>) {
        self.translator.handle_steps_inserted(position);
        if length == 0 {
            return;
        }
        for cursor in self.cursors.values_mut() {
            let sticky = sticky_member == Some(cursor.member_id.as_str());
            cursor.handle_steps_inserted(position, length, sticky);
        }
        self.emit(Signal::StepsInserted { position, length });
    }

    /// Records that the `length` steps after step `position` disappeared.
    pub fn steps_removed(&mut self, position: usize, length: usize) {
        self.translator.handle_steps_removed(position);
        if length == 0 {
            return;
        }
        for cursor in self.cursors.values_mut() {
            cursor.handle_steps_removed(position, length);
        }
        self.emit(Signal::StepsRemoved { position, length });
    }

    /// Text node and offset at `step`, fabricating an empty text node when
    /// the step sits between elements. Adjacent text nodes are merged.
    pub fn get_text_node_at_step(&mut self, step: usize) -> Result<TextNodePosition, OperationError> {
        let point = self.convert_steps_to_dom_point(step)?;
        let (node, offset) = if self.tree.is_text(point.node) {
            (point.node, point.offset)
        } else {
            let text = self.tree.create_text("");
            let reference = self.tree.child(point.node, point.offset);
            self.tree.insert_before(point.node, text, reference)?;
            (text, 0)
        };
        let (text_node, shift) = self.tree.merge_adjacent_text(node)?;
        self.translator.invalidate_from(step);
        Ok(TextNodePosition {
            text_node,
            offset: offset + shift,
        })
    }

    /// Inserts `node` at `step`, splitting the text there if needed. An
    /// empty scratch text node left behind is removed again.
    pub fn insert_node_at_step(&mut self, step: usize, node: NodeId) -> Result<(), OperationError> {
        let TextNodePosition { text_node, offset } = self.get_text_node_at_step(step)?;
        let parent = self.tree.parent(text_node).ok_or(odfkit_dom::DomError::Detached(text_node))?;
        let length = self.tree.node_length(text_node);
        let reference = if offset == 0 {
            Some(text_node)
        } else if offset < length {
            Some(self.tree.split_text(text_node, offset)?)
        } else {
            self.tree.next_sibling(text_node)
        };
        self.tree.insert_before(parent, node, reference)?;
        if self.tree.node_length(text_node) == 0 {
            self.tree.remove(text_node)?;
        }
        self.translator.invalidate_from(step);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    pub fn add_member(&mut self, member: Member) -> Result<(), OperationError> {
        if self.members.contains_key(&member.member_id) {
            return Err(OperationError::contract(
                "AddMember",
                format!("member {} already exists", member.member_id),
            ));
        }
        self.members.insert(member.member_id.clone(), member);
        Ok(())
    }

    pub fn get_member(&self, member_id: &str) -> Option<&Member> {
        self.members.get(member_id)
    }

    pub(crate) fn get_member_mut(&mut self, member_id: &str) -> Option<&mut Member> {
        self.members.get_mut(member_id)
    }

    pub fn has_member(&self, member_id: &str) -> bool {
        self.members.contains_key(member_id)
    }

    pub fn remove_member(&mut self, member_id: &str) -> Option<Member> {
        self.members.remove(member_id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Cursors
    // ------------------------------------------------------------------

    /// Adds a collapsed cursor at step 0.
    pub fn add_cursor(&mut self, member_id: &str) -> Result<(), OperationError> {
        if self.cursors.contains_key(member_id) {
            return Err(OperationError::contract(
                "AddCursor",
                format!("cursor for {} already exists", member_id),
            ));
        }
        self.cursors.insert(member_id.to_string(), OdtCursor::new(member_id));
        Ok(())
    }

    pub fn get_cursor(&self, member_id: &str) -> Option<&OdtCursor> {
        self.cursors.get(member_id)
    }

    pub(crate) fn get_cursor_mut(&mut self, member_id: &str) -> Option<&mut OdtCursor> {
        self.cursors.get_mut(member_id)
    }

    pub fn has_cursor(&self, member_id: &str) -> bool {
        self.cursors.contains_key(member_id)
    }

    pub fn cursors(&self) -> impl Iterator<Item = &OdtCursor> {
        self.cursors.values()
    }

    pub fn remove_cursor(&mut self, member_id: &str) -> bool {
        self.cursors.remove(member_id).is_some()
    }

    /// Moves a cursor to the selection starting at `position` and spanning
    /// `length` steps. Returns false when the member has no cursor.
    pub fn move_cursor(
        &mut self,
        member_id: &str,
        position: usize,
        length: i64,
        selection_type: SelectionType,
    ) -> Result<bool, StepsError> {
        if !self.cursors.contains_key(member_id) {
            return Ok(false);
        }
        let focus = position as i64 + length;
        let last = self.step_count();
        if focus < 0 || position > last || focus as usize > last {
            return Err(StepsError::InvalidRange { position, length });
        }
        if let Some(cursor) = self.cursors.get_mut(member_id) {
            cursor.anchor = position;
            cursor.focus = focus as usize;
            cursor.selection_type = selection_type;
        }
        Ok(true)
    }

    /// Focus step of the member's cursor, 0 without a cursor.
    pub fn get_cursor_position(&self, member_id: &str) -> usize {
        self.cursors.get(member_id).map_or(0, OdtCursor::position)
    }

    pub fn get_cursor_selection(&self, member_id: &str) -> CursorSelection {
        match self.cursors.get(member_id) {
            Some(cursor) => CursorSelection {
                position: cursor.anchor,
                length: cursor.length(),
            },
            None => CursorSelection { position: 0, length: 0 },
        }
    }

    pub(crate) fn cursor_moved_signal(&self, member_id: &str) -> Option<Signal> {
        self.cursors.get(member_id).map(|cursor| Signal::CursorMoved {
            member_id: cursor.member_id.clone(),
            position: cursor.anchor,
            length: cursor.length(),
        })
    }

    /// Clamps every cursor into the document and keeps each selection inside
    /// a single inline root, moving the focus to the closest step within the
    /// anchor's root (ties go to the previous step). Emits `CursorMoved` for
    /// cursors that changed.
    pub fn fix_cursor_positions(&mut self) -> Result<(), StepsError> {
        let last = self.step_count();
        let member_ids: Vec<String> = self.cursors.keys().cloned().collect();
        for member_id in member_ids {
            let Some(cursor) = self.cursors.get(&member_id) else {
                continue;
            };
            let (old_anchor, old_focus) = (cursor.anchor, cursor.focus);
            let anchor = old_anchor.min(last);
            let mut focus = old_focus.min(last);

            if anchor != focus {
                let anchor_point = self.convert_steps_to_dom_point(anchor)?;
                let focus_point = self.convert_steps_to_dom_point(focus)?;
                let anchor_root = inline_root(&self.tree, anchor_point.node).unwrap_or(self.body);
                let focus_root = inline_root(&self.tree, focus_point.node).unwrap_or(self.body);
                if anchor_root != focus_root {
                    let mut iterator = self.create_step_iterator(
                        focus_point.node,
                        focus_point.offset,
                        vec![
                            Box::new(self.position_filter),
                            Box::new(RootFilter::new(anchor_root, self.body)),
                        ],
                        self.body,
                    )?;
                    focus = if iterator.round_to_closest_step(StepDirection::Previous) {
                        self.convert_dom_point_to_steps(iterator.point(), Rounding::Previous)?
                    } else {
                        anchor
                    };
                }
            }

            if (anchor, focus) != (old_anchor, old_focus) {
                if let Some(cursor) = self.cursors.get_mut(&member_id) {
                    cursor.anchor = anchor;
                    cursor.focus = focus;
                }
                debug!(member_id = %member_id, anchor, focus, "Fixed cursor position");
                if let Some(signal) = self.cursor_moved_signal(&member_id) {
                    self.emit(signal);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Blobs
    // ------------------------------------------------------------------

    pub fn set_blob(&mut self, filename: &str, blob: Blob) {
        self.blobs.insert(filename.to_string(), blob);
    }

    pub fn get_blob(&self, filename: &str) -> Option<&Blob> {
        self.blobs.get(filename)
    }

    pub fn remove_blob(&mut self, filename: &str) -> Option<Blob> {
        self.blobs.remove(filename)
    }

    // ------------------------------------------------------------------
    // Styles
    // ------------------------------------------------------------------

    /// `style:style` with the given name and family, common styles first.
    pub fn find_style(&self, name: &str, family: &str) -> Option<NodeId> {
        [self.styles, self.automatic_styles]
            .into_iter()
            .flat_map(|container| self.tree.children(container).iter().copied())
            .find(|&style| {
                self.tree.is_named(style, ns::STYLE, "style")
                    && self.tree.attribute(style, ns::STYLE, "name") == Some(name)
                    && self.tree.attribute(style, ns::STYLE, "family") == Some(family)
            })
    }

    pub fn is_automatic_style(&self, style: NodeId) -> bool {
        self.tree.parent(style) == Some(self.automatic_styles)
    }

    /// Fresh automatic style name not used by any style.
    pub fn generate_style_name(&mut self) -> String {
        loop {
            self.style_counter += 1;
            let candidate = format!("T{}", self.style_counter);
            let taken = [self.styles, self.automatic_styles]
                .into_iter()
                .flat_map(|container| self.tree.children(container).iter().copied())
                .any(|style| self.tree.attribute(style, ns::STYLE, "name") == Some(candidate.as_str()));
            if !taken {
                return candidate;
            }
        }
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    pub(crate) fn edited_in_session(&self) -> bool {
        self.edited_in_session
    }

    pub(crate) fn mark_edited(&mut self) {
        self.edited_in_session = true;
    }

    /// Compacts the tree once detached nodes pile up. Node ids handed out
    /// before a compaction, including those in earlier signals, go stale.
    /// Returns whether a compaction ran.
    pub fn collect_garbage(&mut self) -> bool {
        if !self.tree.needs_compaction() {
            return false;
        }
        let allocated = self.tree.allocated();
        let remap = self.tree.compact();
        let keep = |old: NodeId| remap.get(old).unwrap_or(old);
        self.body = keep(self.body);
        self.meta = keep(self.meta);
        self.styles = keep(self.styles);
        self.automatic_styles = keep(self.automatic_styles);
        self.translator = StepsTranslator::new(self.body, self.config.effective_checkpoint_interval());
        debug!(allocated, live = self.tree.allocated(), "Compacted document tree");
        true
    }
}

impl std::fmt::Debug for OdtDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdtDocument")
            .field("body", &self.body)
            .field("cursors", &self.cursors)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .field("blobs", &self.blobs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Document whose body holds `body`.
    pub(crate) fn document(body: &str) -> OdtDocument {
        let source = format!(
            r#"<office:document xmlns:office="{}" xmlns:text="{}" xmlns:style="{}" xmlns:draw="{}" xmlns:dc="{}" xmlns:editinfo="{}"><office:body><office:text>{}</office:text></office:body></office:document>"#,
            ns::OFFICE,
            ns::TEXT,
            ns::STYLE,
            ns::DRAW,
            ns::DC,
            ns::EDITINFO,
            body
        );
        OdtDocument::from_xml(&source, EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_new_document_has_single_step() {
        let document = OdtDocument::new(EditorConfig::default()).unwrap();
        assert_eq!(document.step_count(), 0);
        assert!(document.tree().is_named(document.meta(), ns::OFFICE, "meta"));
    }

    #[test]
    fn test_missing_containers_are_created() {
        let document = document("<text:p>ab</text:p>");
        let root = document.tree().root();
        let names: Vec<String> = document
            .tree()
            .children(root)
            .iter()
            .filter_map(|&child| document.tree().name(child).map(|n| n.local.clone()))
            .collect();
        assert_eq!(names, vec!["meta", "styles", "automatic-styles", "body"]);
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let source = format!(r#"<office:document xmlns:office="{}"/>"#, ns::OFFICE);
        let result = OdtDocument::from_xml(&source, EditorConfig::default());
        assert!(matches!(result, Err(EditorError::MissingBody)));
    }

    #[test]
    fn test_cursor_range_conversion() {
        let document = document("<text:p>abc</text:p>");
        let text = document.tree().find_element(document.body(), ns::TEXT, "p").unwrap();
        let text = document.tree().first_child(text).unwrap();

        let range = document.convert_cursor_to_dom_range(3, -2).unwrap();
        assert_eq!(range.start, DomPoint::new(text, 1));
        assert_eq!(range.end, DomPoint::new(text, 3));

        let selection = document
            .convert_dom_to_cursor_range(&DomSelection {
                anchor: DomPoint::new(text, 3),
                focus: DomPoint::new(text, 1),
            })
            .unwrap();
        assert_eq!(selection, CursorSelection { position: 3, length: -2 });
        assert!(document.convert_cursor_to_dom_range(1, -2).is_err());
    }

    #[test]
    fn test_get_text_node_at_step_fabricates_text() {
        let mut document = document("<text:p>a<text:s/></text:p>");
        let position = document.get_text_node_at_step(2).unwrap();
        assert_eq!(document.tree().text(position.text_node), Some(""));
        assert_eq!(position.offset, 0);
        assert_eq!(document.step_count(), 2);
    }

    #[test]
    fn test_steps_inserted_respects_stickiness() {
        let mut document = document("<text:p>abc</text:p>");
        document.add_cursor("alice").unwrap();
        document.add_cursor("bob").unwrap();
        document.move_cursor("alice", 1, 0, SelectionType::Range).unwrap();
        document.move_cursor("bob", 1, 0, SelectionType::Range).unwrap();

        document.steps_inserted(1, 2, Some("alice"));

        assert_eq!(document.get_cursor_position("alice"), 3);
        assert_eq!(document.get_cursor_position("bob"), 1);
    }

    #[test]
    fn test_fix_cursor_positions_clamps_and_is_idempotent() {
        let mut document = document("<text:p>ab</text:p>");
        document.add_cursor("alice").unwrap();
        if let Some(cursor) = document.get_cursor_mut("alice") {
            cursor.anchor = 1;
            cursor.focus = 9;
        }
        let moves = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&moves);
        document.subscribe(SignalKind::CursorMoved, move |_| counter.set(counter.get() + 1));

        document.fix_cursor_positions().unwrap();
        document.fix_cursor_positions().unwrap();

        assert_eq!(moves.get(), 1);
        assert_eq!(document.get_cursor_selection("alice"), CursorSelection { position: 1, length: 1 });
    }

    #[test]
    fn test_fix_cursor_positions_keeps_selection_in_one_root() {
        let mut document = document(
            "<text:p>ab<office:annotation><text:list><text:list-item><text:p>xy</text:p></text:list-item></text:list></office:annotation>c</text:p>",
        );
        // steps: 0 a 1 b 2, annotation 3 x 4 y 5, 6 c 7
        document.add_cursor("alice").unwrap();
        if let Some(cursor) = document.get_cursor_mut("alice") {
            cursor.anchor = 1;
            cursor.focus = 4;
        }

        document.fix_cursor_positions().unwrap();

        // (ab, 2) is no farther from (xy, 1) than (c, 0); ties round back
        assert_eq!(document.get_cursor_selection("alice"), CursorSelection { position: 1, length: 1 });
    }

    #[test]
    fn test_duplicate_registrations_are_contract_errors() {
        let mut document = document("<text:p/>");
        document.add_cursor("alice").unwrap();
        assert!(matches!(
            document.add_cursor("alice"),
            Err(OperationError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_collect_garbage_keeps_document_intact() {
        let mut document = document("<text:p>ab</text:p><text:p>cd</text:p>");
        let before = document.to_xml();
        assert!(!document.collect_garbage());
        while !document.tree().needs_compaction() {
            document.tree_mut().create_text("scratch");
        }

        assert!(document.collect_garbage());

        assert_eq!(document.to_xml(), before);
        assert_eq!(document.step_count(), 5);
        let point = document.convert_steps_to_dom_point(4).unwrap();
        assert_eq!(document.tree().text(point.node), Some("cd"));
        assert_eq!(point.offset, 1);
        assert!(!document.collect_garbage());
    }

    #[test]
    fn test_generated_style_names_are_unique() {
        let mut document = document("<text:p/>");
        let first = document.generate_style_name();
        let second = document.generate_style_name();
        assert_ne!(first, second);
    }
}
