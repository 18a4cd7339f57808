use isle_sfc::{AttrKind, Node, parse_template_at, parse_template_to_ast};

#[test]
fn parse_element_with_text() {
    let ast = parse_template_to_ast("<div>hi</div>").unwrap();
    assert_eq!(ast.len(), 1);
    match &ast[0] {
        Node::Element(el) => {
            assert_eq!(el.tag, "div");
            assert_eq!(el.children.len(), 1);
            assert!(matches!(el.children[0], Node::Text(_)));
        }
        _ => panic!("expected element"),
    }
}

#[test]
fn parse_text_and_interpolation() {
    let ast = parse_template_to_ast("<p>Hello {{name}}</p>").unwrap();
    match &ast[0] {
        Node::Element(el) => {
            assert!(matches!(el.children[0], Node::Text(_)));
            assert_eq!(el.children[1], Node::Interpolation("name".to_string()));
        }
        _ => panic!("expected element"),
    }
}

#[test]
fn parse_attrs_static_bind_event_directive() {
    let ast = parse_template_to_ast(
        r#"<input class="x" :value="count" @input="onInput" v-for="n in 3"/>"#,
    )
    .unwrap();
    match &ast[0] {
        Node::Element(el) => {
            assert!(el.self_closing);
            assert_eq!(el.attrs.len(), 4);
            assert!(el.attr(AttrKind::Static, "class").is_some());
            assert!(el.attr(AttrKind::Bind, "value").is_some());
            assert!(el.attr(AttrKind::On, "input").is_some());
            assert_eq!(
                el.attr(AttrKind::Directive, "for").and_then(|a| a.value.as_deref()),
                Some("n in 3")
            );
        }
        _ => panic!("expected element"),
    }
}

#[test]
fn spans_point_at_the_tags() {
    let src = r#"<section><slot name="a">x</slot></section>"#;
    let ast = parse_template_at(src, 100).unwrap();
    let Node::Element(section) = &ast[0] else {
        panic!("expected element")
    };
    let Node::Element(slot) = &section.children[0] else {
        panic!("expected slot")
    };
    assert_eq!(&src[slot.open.start - 100..slot.open.end - 100], r#"<slot name="a">"#);
    let close = slot.close.expect("closed");
    assert_eq!(&src[close.start - 100..close.end - 100], "</slot>");
    assert!(section.close.is_some());
}

#[test]
fn void_elements_do_not_nest() {
    let ast = parse_template_to_ast(r#"<p><input type="text"><b>x</b></p>"#).unwrap();
    let Node::Element(p) = &ast[0] else {
        panic!("expected element")
    };
    assert_eq!(p.children.len(), 2);
    let Node::Element(input) = &p.children[0] else {
        panic!("expected input")
    };
    assert!(input.self_closing);
    assert!(input.children.is_empty());
}

#[test]
fn comments_are_kept() {
    let ast = parse_template_to_ast("<div><!-- note --></div>").unwrap();
    let Node::Element(div) = &ast[0] else {
        panic!("expected element")
    };
    assert_eq!(div.children, vec![Node::Comment(" note ".to_string())]);
}

#[test]
fn unclosed_and_unmatched_tags_are_errors() {
    assert!(parse_template_to_ast("<div><span></span>").is_err());
    assert!(parse_template_to_ast("<div></span></div>").is_err());
}

#[test]
fn unterminated_interpolation_is_an_error() {
    let err = parse_template_to_ast("<div>{{ café</div>é").unwrap_err();
    assert_eq!(err.message, "unterminated interpolation");
    assert_eq!(err.offset, 5);

    let ast = parse_template_to_ast("<p>{{ prix }} €</p>").unwrap();
    let Node::Element(p) = &ast[0] else {
        panic!("expected element")
    };
    assert_eq!(p.children[0], Node::Interpolation("prix".to_string()));
}
