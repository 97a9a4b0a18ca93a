//! Integration tests for editor crate

use odfkit_dom::ns;
use odfkit_editor::{
    EditorConfig, EditorError, OdtDocument, OperationError, OperationFactory, Rounding, RouterError, SelectionType,
    Session, Signal, SignalKind, TrivialOperationRouter,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::cell::Cell;
use std::cmp::Ordering;
use std::rc::Rc;

fn document(body: &str) -> OdtDocument {
    let source = format!(
        r#"<office:document xmlns:office="{}" xmlns:text="{}" xmlns:style="{}" xmlns:draw="{}" xmlns:svg="{}" xmlns:xlink="{}" xmlns:dc="{}"><office:meta/><office:styles/><office:automatic-styles/><office:body><office:text>{}</office:text></office:body></office:document>"#,
        ns::OFFICE,
        ns::TEXT,
        ns::STYLE,
        ns::DRAW,
        ns::SVG,
        ns::XLINK,
        ns::DC,
        body
    );
    OdtDocument::from_xml(&source, EditorConfig::default()).unwrap()
}

fn session(document: OdtDocument) -> Session {
    Session::with_router(document, Box::new(TrivialOperationRouter::with_clock(Box::new(|| 1_000))))
}

fn body_text(document: &OdtDocument) -> String {
    document.tree().text_content(document.body())
}

/// Paragraphs with spans, links, collapsed whitespace, character
/// elements, an annotation and an inline frame.
const RICH_BODY: &str = concat!(
    "<text:p>ab  c<text:s/>d<text:tab/></text:p>",
    "<text:h><text:span>x</text:span> <text:a>y</text:a></text:h>",
    "<text:list><text:list-item><text:p/></text:list-item></text:list>",
    "<text:p>q<office:annotation><text:list><text:list-item><text:p>note</text:p></text:list-item></text:list></office:annotation>r",
    "<draw:frame text:anchor-type=\"as-char\"><draw:image/></draw:frame></text:p>",
);

#[test]
fn test_insert_and_remove_in_empty_document() {
    let mut session = session(OdtDocument::new(EditorConfig::default()).unwrap());
    assert_eq!(session.document().step_count(), 0);

    session
        .enqueue_specs(&[json!({ "optype": "InsertText", "memberid": "u1", "position": 0, "text": "AB" })])
        .unwrap();

    let document = session.document();
    assert_eq!(document.step_count(), 2);
    let first = document.convert_steps_to_dom_point(0).unwrap();
    let second = document.convert_steps_to_dom_point(1).unwrap();
    assert_eq!(first.node, second.node);
    assert_eq!(document.tree().text(first.node), Some("AB"));
    assert!(first.offset < second.offset);

    session
        .enqueue_specs(&[json!({ "optype": "RemoveText", "memberid": "u1", "position": 0, "length": 1 })])
        .unwrap();
    assert_eq!(session.document().step_count(), 1);
    assert_eq!(body_text(session.document()), "B");
}

#[test]
fn test_add_cursor_twice() {
    let mut document = OdtDocument::new(EditorConfig::default()).unwrap();
    let factory = OperationFactory::default();
    let op = factory
        .create(&json!({ "optype": "AddCursor", "memberid": "u1" }))
        .unwrap();

    assert!(op.execute(&mut document).unwrap());
    assert!(!op.execute(&mut document).unwrap());
    assert_eq!(document.cursors().count(), 1);
}

#[test]
fn test_hyperlink_round_trip() {
    let mut session = session(document("<text:p>AB</text:p>"));
    session
        .enqueue_specs(&[
            json!({ "optype": "ApplyHyperlink", "memberid": "u1", "position": 0, "length": 2, "hyperlink": "http://x" }),
            json!({ "optype": "RemoveHyperlink", "memberid": "u1", "position": 0, "length": 2 }),
        ])
        .unwrap();

    let document = session.document();
    assert_eq!(body_text(document), "AB");
    assert_eq!(document.tree().find_element(document.body(), ns::TEXT, "a"), None);
}

#[test]
fn test_remove_text_across_paragraphs_is_hard_failure() {
    let mut session = session(document("<text:p>ab</text:p><text:p>cd</text:p>"));
    let before = session.document().to_xml();

    let result = session.enqueue_specs(&[json!({
        "optype": "RemoveText",
        "memberid": "u1",
        "position": 1,
        "length": 3
    })]);

    assert!(matches!(
        result,
        Err(EditorError::Router(RouterError::Operation {
            source: OperationError::ContractViolation { .. },
            ..
        }))
    ));
    assert_eq!(session.document().to_xml(), before);
}

fn all_operation_specs() -> Vec<Value> {
    vec![
        json!({ "optype": "AddMember", "memberid": "u1", "timestamp": 1, "setProperties": { "fullName": "Ursula", "color": "red", "imageUrl": "u.png" } }),
        json!({ "optype": "UpdateMember", "memberid": "u1", "timestamp": 2, "setProperties": { "color": "blue" }, "removedProperties": { "imageUrl": "" } }),
        json!({ "optype": "RemoveMember", "memberid": "u1", "timestamp": 3 }),
        json!({ "optype": "AddCursor", "memberid": "u1", "timestamp": 4 }),
        json!({ "optype": "RemoveCursor", "memberid": "u1", "timestamp": 5 }),
        json!({ "optype": "MoveCursor", "memberid": "u1", "timestamp": 6, "position": 3, "length": -2, "selectionType": "Region" }),
        json!({ "optype": "InsertText", "memberid": "u1", "timestamp": 7, "position": 1, "text": "hi", "moveCursor": true }),
        json!({ "optype": "RemoveText", "memberid": "u1", "timestamp": 8, "position": 1, "length": 2 }),
        json!({ "optype": "SplitParagraph", "memberid": "u1", "timestamp": 9, "position": 2, "sourceParagraphPosition": 0, "paragraphStyleName": "P1", "moveCursor": false }),
        json!({ "optype": "MergeParagraph", "memberid": "u1", "timestamp": 10, "destinationStartPosition": 0, "sourceStartPosition": 3, "paragraphStyleName": "", "moveCursor": true }),
        json!({ "optype": "SetParagraphStyle", "memberid": "u1", "timestamp": 11, "position": 0, "styleName": "Heading" }),
        json!({ "optype": "AddStyle", "memberid": "u1", "timestamp": 12, "styleName": "P1", "styleFamily": "paragraph", "isAutomaticStyle": true, "setProperties": { "style:text-properties": { "fo:font-weight": "bold" } } }),
        json!({ "optype": "RemoveStyle", "memberid": "u1", "timestamp": 13, "styleName": "P1", "styleFamily": "paragraph" }),
        json!({ "optype": "UpdateParagraphStyle", "memberid": "u1", "timestamp": 14, "styleName": "P1", "setProperties": { "style:display-name": "Body" }, "removedProperties": { "style:text-properties": { "attributes": "fo:color" } } }),
        json!({ "optype": "ApplyDirectStyling", "memberid": "u1", "timestamp": 15, "position": 0, "length": 2, "setProperties": { "style:text-properties": { "fo:font-style": "italic" } } }),
        json!({ "optype": "ApplyHyperlink", "memberid": "u1", "timestamp": 16, "position": 0, "length": 2, "hyperlink": "http://x" }),
        json!({ "optype": "RemoveHyperlink", "memberid": "u1", "timestamp": 17, "position": 0, "length": 2 }),
        json!({ "optype": "AddAnnotation", "memberid": "u1", "timestamp": 18, "position": 0, "length": 2, "name": "a1" }),
        json!({ "optype": "RemoveAnnotation", "memberid": "u1", "timestamp": 19, "position": 1, "length": 4 }),
        json!({ "optype": "InsertImage", "memberid": "u1", "timestamp": 20, "position": 0, "filename": "Pictures/a.png", "frameWidth": "2cm", "frameHeight": "1cm", "frameStyleName": "fr1", "frameName": "Image1" }),
        json!({ "optype": "SetBlob", "memberid": "u1", "timestamp": 21, "filename": "Pictures/a.png", "mimetype": "image/png", "content": "iVBORw0KGgo=" }),
        json!({ "optype": "RemoveBlob", "memberid": "u1", "timestamp": 22, "filename": "Pictures/a.png" }),
        json!({ "optype": "UpdateMetadata", "memberid": "u1", "timestamp": 23, "setProperties": { "dc:title": "Notes" }, "removedProperties": { "attributes": "dc:subject" } }),
    ]
}

#[test]
fn test_every_operation_spec_round_trips() {
    let factory = OperationFactory::default();
    let specs = all_operation_specs();
    assert_eq!(specs.len(), 23);

    for spec in specs {
        let op = factory.create(&spec).unwrap();
        let first = op.spec();
        assert_eq!(first["optype"], spec["optype"]);
        assert_eq!(first["memberid"], spec["memberid"]);
        assert_eq!(first["timestamp"], spec["timestamp"]);

        let again = factory.create(&first).unwrap();
        assert_eq!(again.spec(), first);
    }
}

#[test]
fn test_step_point_bijection() {
    let document = document(RICH_BODY);
    let last = document.step_count();
    assert!(last > 10);

    for step in 0..=last {
        let point = document.convert_steps_to_dom_point(step).unwrap();
        assert_eq!(document.convert_dom_point_to_steps(point, Rounding::Previous).unwrap(), step);
        assert_eq!(document.convert_dom_point_to_steps(point, Rounding::Next).unwrap(), step);
    }
}

#[test]
fn test_steps_follow_document_order() {
    let document = document(RICH_BODY);
    let points: Vec<_> = (0..=document.step_count())
        .map(|step| document.convert_steps_to_dom_point(step).unwrap())
        .collect();

    for pair in points.windows(2) {
        assert_eq!(document.tree().compare_points(pair[0], pair[1]), Ordering::Less);
    }
}

#[test]
fn test_insertion_shifts_only_later_steps() {
    let mut document = document("<text:p>abc</text:p><text:p>de</text:p>");
    let last = document.step_count();
    for step in 0..=last {
        let member = format!("m{}", step);
        document.add_cursor(&member).unwrap();
        document.move_cursor(&member, step, 0, SelectionType::Range).unwrap();
    }

    let factory = OperationFactory::default();
    let insert = factory
        .create(&json!({ "optype": "InsertText", "memberid": "writer", "position": 2, "text": "xyz" }))
        .unwrap();
    insert.execute(&mut document).unwrap();

    assert_eq!(document.step_count(), last + 3);
    for step in 0..=last {
        let expected = if step <= 2 { step } else { step + 3 };
        assert_eq!(document.get_cursor_position(&format!("m{}", step)), expected, "cursor at step {}", step);
    }
}

#[test]
fn test_cursor_fix_up_is_idempotent() {
    let mut document = document(RICH_BODY);
    document.add_cursor("u1").unwrap();
    let last = document.step_count();
    // a selection from the first paragraph into the annotation
    let annotation_step = (0..=last)
        .find(|&step| {
            let point = document.convert_steps_to_dom_point(step).unwrap();
            document
                .tree()
                .ancestors(point.node)
                .any(|node| document.tree().is_named(node, ns::OFFICE, "annotation"))
        })
        .unwrap();
    document.move_cursor("u1", 1, annotation_step as i64 - 1, SelectionType::Range).unwrap();

    let moved = Rc::new(Cell::new(0));
    let counter = Rc::clone(&moved);
    document.subscribe(SignalKind::CursorMoved, move |_| counter.set(counter.get() + 1));

    document.fix_cursor_positions().unwrap();
    let after_first = moved.get();
    document.fix_cursor_positions().unwrap();

    assert_eq!(after_first, 1);
    assert_eq!(moved.get(), 1);
}

#[test]
fn test_collaborative_editing_session() {
    let mut session = session(document("<text:p>Hello</text:p>"));
    let changed = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changed);
    session
        .document()
        .subscribe(SignalKind::ParagraphChanged, move |_| counter.set(counter.get() + 1));
    let members = Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = Rc::clone(&members);
    session.document().subscribe(SignalKind::MemberAdded, move |signal| {
        if let Signal::MemberAdded { member_id } = signal {
            sink.borrow_mut().push(member_id.clone());
        }
    });

    session
        .enqueue_specs(&[
            json!({ "optype": "AddMember", "memberid": "alice", "setProperties": { "fullName": "Alice" } }),
            json!({ "optype": "AddMember", "memberid": "bob", "setProperties": { "fullName": "Bob" } }),
            json!({ "optype": "AddCursor", "memberid": "alice" }),
            json!({ "optype": "AddCursor", "memberid": "bob" }),
            json!({ "optype": "MoveCursor", "memberid": "bob", "position": 5 }),
            json!({ "optype": "InsertText", "memberid": "bob", "position": 5, "text": " world" }),
            json!({ "optype": "SplitParagraph", "memberid": "alice", "position": 5, "sourceParagraphPosition": 0 }),
            json!({ "optype": "InsertText", "memberid": "alice", "position": 0, "text": ">" }),
        ])
        .unwrap();

    let document = session.document();
    let paragraphs: Vec<String> = document
        .tree()
        .descendants(document.body())
        .filter(|&node| document.tree().is_named(node, ns::TEXT, "p"))
        .map(|node| document.tree().text_content(node))
        .collect();
    assert_eq!(paragraphs, vec![">Hello".to_string(), " world".to_string()]);
    // bob typed at his own cursor, which followed the text and the split
    assert_eq!(document.get_cursor_position("bob"), 13);
    assert_eq!(document.metadata("dc:creator").as_deref(), Some("Alice"));
    assert_eq!(*members.borrow(), vec!["alice".to_string(), "bob".to_string()]);
    assert_eq!(changed.get(), 4);
}
