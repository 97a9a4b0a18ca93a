//! XML import/export for fixtures and command line use.

use crate::{ns, DomResult, NodeData, NodeId, QName, Tree};
use std::collections::BTreeMap;

/// Builds a [`Tree`] from an XML string. Comments and processing
/// instructions are dropped; whitespace text is kept verbatim.
pub fn parse(xml: &str) -> DomResult<Tree> {
    let document = roxmltree::Document::parse(xml)?;
    let source_root = document.root_element();
    let mut tree = Tree::new(qualified(source_root.tag_name()));
    let root = tree.root();
    copy_attributes(&mut tree, root, source_root)?;
    copy_children(&mut tree, root, source_root)?;
    Ok(tree)
}

fn qualified(name: roxmltree::ExpandedName<'_, '_>) -> QName {
    QName::new(name.namespace().unwrap_or_default(), name.name())
}

fn copy_attributes(tree: &mut Tree, target: NodeId, source: roxmltree::Node<'_, '_>) -> DomResult<()> {
    for attribute in source.attributes() {
        let name = QName::new(attribute.namespace().unwrap_or_default(), attribute.name());
        tree.set_attribute(target, name, attribute.value())?;
    }
    Ok(())
}

fn copy_children(tree: &mut Tree, target: NodeId, source: roxmltree::Node<'_, '_>) -> DomResult<()> {
    for child in source.children() {
        if child.is_element() {
            let element = tree.create_element(qualified(child.tag_name()));
            tree.append_child(target, element)?;
            copy_attributes(tree, element, child)?;
            copy_children(tree, element, child)?;
        } else if child.is_text() {
            let text = tree.create_text(child.text().unwrap_or_default());
            tree.append_child(target, text)?;
        }
    }
    Ok(())
}

/// Serializes the tree, declaring every namespace it uses on the root.
pub fn write(tree: &Tree) -> String {
    let prefixes = collect_prefixes(tree);
    let mut out = String::new();
    write_node(tree, tree.root(), &prefixes, true, &mut out);
    out
}

fn collect_prefixes(tree: &Tree) -> BTreeMap<String, String> {
    let mut prefixes = BTreeMap::new();
    let mut generated = 0;
    let root = tree.root();
    for node in std::iter::once(root).chain(tree.descendants(root)) {
        let Some(element) = tree.element(node) else {
            continue;
        };
        let names = std::iter::once(&element.name).chain(element.attributes.iter().map(|a| &a.name));
        for name in names {
            if name.ns.is_empty() || prefixes.contains_key(&name.ns) {
                continue;
            }
            let prefix = match ns::prefix_for(&name.ns) {
                Some(prefix) => prefix.to_string(),
                None => {
                    generated += 1;
                    format!("ns{}", generated)
                }
            };
            prefixes.insert(name.ns.clone(), prefix);
        }
    }
    prefixes
}

fn render_name(name: &QName, prefixes: &BTreeMap<String, String>) -> String {
    match prefixes.get(&name.ns) {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.clone(),
    }
}

fn write_node(
    tree: &Tree,
    node: NodeId,
    prefixes: &BTreeMap<String, String>,
    is_root: bool,
    out: &mut String,
) {
    let element = match tree.data(node) {
        NodeData::Text(text) => {
            out.push_str(&escape(text, false));
            return;
        }
        NodeData::Element(element) => element,
    };

    let name = render_name(&element.name, prefixes);
    out.push('<');
    out.push_str(&name);
    if is_root {
        for (uri, prefix) in prefixes {
            out.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape(uri, true)));
        }
    }
    for attribute in &element.attributes {
        out.push_str(&format!(
            " {}=\"{}\"",
            render_name(&attribute.name, prefixes),
            escape(&attribute.value, true)
        ));
    }

    let children = tree.children(node);
    if children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for &child in children {
        write_node(tree, child, prefixes, false, out);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn escape(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<office:text xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><text:p text:style-name="P1">a &amp; b<text:s/></text:p></office:text>"#;

    #[test]
    fn test_parse_keeps_namespaces_and_text() {
        let tree = parse(DOC).unwrap();
        let root = tree.root();
        assert!(tree.is_named(root, ns::OFFICE, "text"));

        let p = tree.first_child(root).unwrap();
        assert_eq!(tree.attribute(p, ns::TEXT, "style-name"), Some("P1"));
        assert_eq!(tree.text_content(p), "a & b");
        assert_eq!(tree.children(p).len(), 2);
    }

    #[test]
    fn test_write_reproduces_document() {
        let tree = parse(DOC).unwrap();
        assert_eq!(write(&tree), DOC);
    }
}
