//! ODF element classification and the paragraph character model.
//!
//! Inside a paragraph the characters are the chars of text nodes whose
//! parent is a grouping element plus every element anchored as a
//! character. A literal whitespace char is visible only when the previous
//! character is not literal whitespace and a later character is not
//! literal whitespace; everything else is always visible.

use odfkit_dom::{ns, DomPoint, DomRange, NodeId, Tree};

pub fn is_paragraph(tree: &Tree, node: NodeId) -> bool {
    tree.is_named(node, ns::TEXT, "p") || tree.is_named(node, ns::TEXT, "h")
}

pub fn is_span(tree: &Tree, node: NodeId) -> bool {
    tree.is_named(node, ns::TEXT, "span")
}

pub fn is_hyperlink(tree: &Tree, node: NodeId) -> bool {
    tree.is_named(node, ns::TEXT, "a")
}

/// Elements whose text children are walkable.
pub fn is_grouping_element(tree: &Tree, node: NodeId) -> bool {
    is_paragraph(tree, node) || is_span(tree, node) || is_hyperlink(tree, node)
}

pub fn is_space_element(tree: &Tree, node: NodeId) -> bool {
    tree.is_named(node, ns::TEXT, "s")
}

pub fn is_character_element(tree: &Tree, node: NodeId) -> bool {
    is_space_element(tree, node)
        || tree.is_named(node, ns::TEXT, "tab")
        || tree.is_named(node, ns::TEXT, "line-break")
}

pub fn is_character_frame(tree: &Tree, node: NodeId) -> bool {
    tree.is_named(node, ns::DRAW, "frame")
        && tree.attribute(node, ns::TEXT, "anchor-type") == Some("as-char")
}

/// Annotations open a nested text root inside their host paragraph.
pub fn is_inline_root(tree: &Tree, node: NodeId) -> bool {
    tree.is_named(node, ns::OFFICE, "annotation")
}

pub fn is_anchored_as_character(tree: &Tree, node: NodeId) -> bool {
    is_character_element(tree, node) || is_character_frame(tree, node) || is_inline_root(tree, node)
}

pub fn is_odf_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Text node whose characters take part in the paragraph flow.
pub fn is_walkable_text(tree: &Tree, node: NodeId) -> bool {
    tree.is_text(node)
        && tree
            .parent(node)
            .map_or(false, |parent| is_grouping_element(tree, parent))
}

/// Paragraph owning `node`. Nodes inside an element anchored as a
/// character (for example the body of an annotation outside its own
/// paragraphs) have none.
pub fn paragraph_element(tree: &Tree, node: NodeId) -> Option<NodeId> {
    for candidate in std::iter::once(node).chain(tree.ancestors(node)) {
        if is_paragraph(tree, candidate) {
            return Some(candidate);
        }
        if is_anchored_as_character(tree, candidate) {
            return None;
        }
    }
    None
}

/// Nearest enclosing annotation, if any.
pub fn inline_root(tree: &Tree, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .find(|&candidate| is_inline_root(tree, candidate))
}

/// Nearest enclosing hyperlink below `paragraph`.
pub fn hyperlink_ancestor(tree: &Tree, node: NodeId, paragraph: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .take_while(|&candidate| candidate != paragraph)
        .find(|&candidate| is_hyperlink(tree, candidate))
}

/// One character of the paragraph flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Character {
    Text { node: NodeId, offset: usize, ch: char },
    Element(NodeId),
}

impl Character {
    pub fn is_literal_whitespace(&self) -> bool {
        matches!(self, Character::Text { ch, .. } if is_odf_whitespace(*ch))
    }

    /// Boundary point directly before the character.
    pub fn before(&self, tree: &Tree) -> Option<DomPoint> {
        match *self {
            Character::Text { node, offset, .. } => Some(DomPoint::new(node, offset)),
            Character::Element(node) => Some(DomPoint::new(tree.parent(node)?, tree.index_in_parent(node)?)),
        }
    }

    /// Boundary point directly after the character.
    pub fn after(&self, tree: &Tree) -> Option<DomPoint> {
        match *self {
            Character::Text { node, offset, .. } => Some(DomPoint::new(node, offset + 1)),
            Character::Element(node) => {
                Some(DomPoint::new(tree.parent(node)?, tree.index_in_parent(node)? + 1))
            }
        }
    }
}

fn node_before(tree: &Tree, node: NodeId, paragraph: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        if let Some(previous) = tree.previous_sibling(current) {
            return Some(previous);
        }
        let parent = tree.parent(current)?;
        if parent == paragraph {
            return None;
        }
        current = parent;
    }
}

fn node_after(tree: &Tree, node: NodeId, paragraph: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        if let Some(next) = tree.next_sibling(current) {
            return Some(next);
        }
        let parent = tree.parent(current)?;
        if parent == paragraph {
            return None;
        }
        current = parent;
    }
}

fn last_character_from(tree: &Tree, start: Option<NodeId>, paragraph: NodeId) -> Option<Character> {
    let mut candidate = start;
    while let Some(node) = candidate {
        if let Some(text) = tree.text(node) {
            if is_walkable_text(tree, node) {
                if let Some(ch) = text.chars().last() {
                    let offset = text.chars().count() - 1;
                    return Some(Character::Text { node, offset, ch });
                }
            }
            candidate = node_before(tree, node, paragraph);
        } else if is_anchored_as_character(tree, node) {
            return Some(Character::Element(node));
        } else if is_grouping_element(tree, node) && !is_paragraph(tree, node) {
            candidate = tree
                .last_child(node)
                .or_else(|| node_before(tree, node, paragraph));
        } else {
            candidate = node_before(tree, node, paragraph);
        }
    }
    None
}

fn first_character_from(tree: &Tree, start: Option<NodeId>, paragraph: NodeId) -> Option<Character> {
    let mut candidate = start;
    while let Some(node) = candidate {
        if let Some(text) = tree.text(node) {
            if is_walkable_text(tree, node) {
                if let Some(ch) = text.chars().next() {
                    return Some(Character::Text { node, offset: 0, ch });
                }
            }
            candidate = node_after(tree, node, paragraph);
        } else if is_anchored_as_character(tree, node) {
            return Some(Character::Element(node));
        } else if is_grouping_element(tree, node) && !is_paragraph(tree, node) {
            candidate = tree
                .first_child(node)
                .or_else(|| node_after(tree, node, paragraph));
        } else {
            candidate = node_after(tree, node, paragraph);
        }
    }
    None
}

/// Character immediately before `point` inside `paragraph`.
pub fn previous_character(tree: &Tree, point: DomPoint, paragraph: NodeId) -> Option<Character> {
    if let Some(text) = tree.text(point.node) {
        if point.offset > 0 && is_walkable_text(tree, point.node) {
            let ch = text.chars().nth(point.offset - 1)?;
            return Some(Character::Text {
                node: point.node,
                offset: point.offset - 1,
                ch,
            });
        }
        return last_character_from(tree, node_before(tree, point.node, paragraph), paragraph);
    }
    if point.offset > 0 {
        return last_character_from(tree, tree.child(point.node, point.offset - 1), paragraph);
    }
    if point.node == paragraph {
        return None;
    }
    last_character_from(tree, node_before(tree, point.node, paragraph), paragraph)
}

/// Character immediately after `point` inside `paragraph`.
pub fn next_character(tree: &Tree, point: DomPoint, paragraph: NodeId) -> Option<Character> {
    if let Some(text) = tree.text(point.node) {
        if is_walkable_text(tree, point.node) {
            if let Some(ch) = text.chars().nth(point.offset) {
                return Some(Character::Text {
                    node: point.node,
                    offset: point.offset,
                    ch,
                });
            }
        }
        return first_character_from(tree, node_after(tree, point.node, paragraph), paragraph);
    }
    match tree.child(point.node, point.offset) {
        Some(child) => first_character_from(tree, Some(child), paragraph),
        None if point.node == paragraph => None,
        None => first_character_from(tree, node_after(tree, point.node, paragraph), paragraph),
    }
}

fn has_later_solid_character(tree: &Tree, mut point: DomPoint, paragraph: NodeId) -> bool {
    while let Some(character) = next_character(tree, point, paragraph) {
        if !character.is_literal_whitespace() {
            return true;
        }
        match character.after(tree) {
            Some(after) => point = after,
            None => return false,
        }
    }
    false
}

/// Whether `character` renders, applying ODF whitespace collapsing.
pub fn is_visible_character(tree: &Tree, character: Character, paragraph: NodeId) -> bool {
    let Character::Text { node, offset, ch } = character else {
        return true;
    };
    if !is_odf_whitespace(ch) {
        return true;
    }
    let preceded_by_solid = matches!(
        previous_character(tree, DomPoint::new(node, offset), paragraph),
        Some(previous) if !previous.is_literal_whitespace()
    );
    preceded_by_solid && has_later_solid_character(tree, DomPoint::new(node, offset + 1), paragraph)
}

/// A `text:s` that can be written as a literal space without collapsing.
pub fn is_downgradable_space_element(tree: &Tree, node: NodeId) -> bool {
    if !is_space_element(tree, node) {
        return false;
    }
    if tree
        .attribute(node, ns::TEXT, "c")
        .map_or(false, |count| count.trim() != "1")
    {
        return false;
    }
    let Some(paragraph) = tree.parent(node).and_then(|parent| paragraph_element(tree, parent)) else {
        return false;
    };
    let (Some(before), Some(after)) = (
        Character::Element(node).before(tree),
        Character::Element(node).after(tree),
    ) else {
        return false;
    };
    let solid = |character: Option<Character>| matches!(character, Some(c) if !c.is_literal_whitespace());
    solid(previous_character(tree, before, paragraph)) && solid(next_character(tree, after, paragraph))
}

/// Text nodes and character elements lying entirely inside `range`,
/// skipping anything nested in a character element below `paragraph`.
pub fn text_elements(tree: &Tree, range: DomRange, paragraph: NodeId) -> Vec<NodeId> {
    tree.contained_nodes(range)
        .into_iter()
        .filter(|&node| is_walkable_text(tree, node) || is_anchored_as_character(tree, node))
        .filter(|&node| {
            !tree
                .ancestors(node)
                .take_while(|&ancestor| ancestor != paragraph)
                .any(|ancestor| is_anchored_as_character(tree, ancestor))
        })
        .collect()
}

/// Walkable text nodes lying entirely inside `range`.
pub fn text_nodes(tree: &Tree, range: DomRange) -> Vec<NodeId> {
    tree.contained_nodes(range)
        .into_iter()
        .filter(|&node| is_walkable_text(tree, node) && paragraph_element(tree, node).is_some())
        .collect()
}

/// Paragraphs touched by `range`, in document order.
pub fn paragraph_elements(tree: &Tree, range: DomRange) -> Vec<NodeId> {
    let mut paragraphs = Vec::new();
    let mut push = |paragraph: Option<NodeId>| {
        if let Some(paragraph) = paragraph {
            if !paragraphs.contains(&paragraph) {
                paragraphs.push(paragraph);
            }
        }
    };
    push(paragraph_element(tree, range.start.node));
    for node in tree.intersecting_text_nodes(range) {
        push(paragraph_element(tree, node));
    }
    for node in tree.contained_nodes(range) {
        if is_paragraph(tree, node) {
            push(Some(node));
        }
    }
    push(paragraph_element(tree, range.end.node));
    paragraphs
}

/// Removes `node`, then any span or link ancestors left empty by it.
pub fn remove_collapsing(tree: &mut Tree, node: NodeId) -> Result<(), odfkit_dom::DomError> {
    let mut parent = tree.parent(node);
    tree.remove(node)?;
    while let Some(current) = parent {
        let collapsible = is_span(tree, current) || is_hyperlink(tree, current);
        if !collapsible || !tree.children(current).is_empty() {
            break;
        }
        parent = tree.parent(current);
        tree.remove(current)?;
    }
    Ok(())
}
