use crate::error::TemplateError;
use crate::template_ast::{AttrKind, Element, Node, Span, TemplateAttr};

/// Elements that never take a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Hand-rolled HTML-ish parser with support for:
/// - nested elements, self-closing tags (`<input/>`) and void elements
/// - attributes: static (`class="x"`), bind (`:value="expr"`), event (`@click="foo"`)
///   and directives (`v-for="item in items"`)
/// - text, comments and `{{ interpolation }}` splits
///
/// Every element records the byte spans of its opening and closing tags so
/// callers can rewrite the markup in place.
pub fn parse_template_to_ast(input: &str) -> Result<Vec<Node>, TemplateError> {
    parse_template_at(input, 0)
}

/// Same as [`parse_template_to_ast`], with spans shifted by `base` so they
/// index into the file the template was cut from.
pub fn parse_template_at(input: &str, base: usize) -> Result<Vec<Node>, TemplateError> {
    let mut i = 0usize;
    let bytes = input.as_bytes();
    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();

    fn push_child(stack: &mut Vec<Element>, roots: &mut Vec<Node>, node: Node) {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        } else {
            roots.push(node);
        }
    }

    while i < bytes.len() {
        if bytes[i] == b'<' && input[i..].starts_with("<!--") {
            let start = i + 4;
            let end = input[start..]
                .find("-->")
                .map(|p| start + p)
                .ok_or_else(|| error("unterminated comment", base + i))?;
            push_child(
                &mut stack,
                &mut roots,
                Node::Comment(input[start..end].to_string()),
            );
            i = end + 3;
        } else if bytes[i] == b'<' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            let tag_start = i;
            i += 2;
            let tag = read_ident(bytes, &mut i);
            skip_ws(bytes, &mut i);
            if i < bytes.len() && bytes[i] == b'>' {
                i += 1;
            } else {
                return Err(error(format!("expected `>` to close `</{tag}`"), base + i));
            }
            let close = Span {
                start: base + tag_start,
                end: base + i,
            };

            if !stack.iter().any(|e| e.tag == tag) {
                return Err(error(
                    format!("closing tag `</{tag}>` has no matching open tag"),
                    base + tag_start,
                ));
            }
            // pop until matching tag; anything popped on the way stays unclosed
            while let Some(mut el) = stack.pop() {
                if el.tag == tag {
                    el.close = Some(close);
                    push_child(&mut stack, &mut roots, Node::Element(el));
                    break;
                }
                push_child(&mut stack, &mut roots, Node::Element(el));
            }
        } else if bytes[i] == b'<' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_alphabetic() {
            let tag_start = i;
            i += 1;
            let tag = read_ident(bytes, &mut i);
            let mut attrs: Vec<TemplateAttr> = Vec::new();
            let mut self_closing = false;
            let mut terminated = false;

            while i < bytes.len() {
                skip_ws(bytes, &mut i);
                if i >= bytes.len() {
                    break;
                }
                match bytes[i] {
                    b'/' => {
                        // possible "/>"
                        i += 1;
                        skip_ws(bytes, &mut i);
                        if i < bytes.len() && bytes[i] == b'>' {
                            self_closing = true;
                            terminated = true;
                            i += 1;
                            break;
                        }
                    }
                    b'>' => {
                        terminated = true;
                        i += 1;
                        break;
                    }
                    _ => {
                        if let Some(attr) = read_attribute(bytes, &mut i) {
                            attrs.push(attr);
                        } else {
                            // skip unknown byte
                            i += 1;
                        }
                    }
                }
            }
            if !terminated {
                return Err(error(format!("unterminated tag `<{tag}`"), base + tag_start));
            }

            let open = Span {
                start: base + tag_start,
                end: base + i,
            };
            let is_void = VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str());
            let el = Element {
                tag,
                attrs,
                children: Vec::new(),
                self_closing: self_closing || is_void,
                open,
                close: None,
            };
            if el.self_closing {
                push_child(&mut stack, &mut roots, Node::Element(el));
            } else {
                stack.push(el);
            }
        } else if i + 1 < bytes.len() && bytes[i] == b'{' && bytes[i + 1] == b'{' {
            // interpolation
            let start = i + 2;
            let Some(len) = input[start..].find("}}") else {
                return Err(error("unterminated interpolation", base + i));
            };
            let expr = input[start..start + len].trim().to_string();
            i = start + len + 2;
            push_child(&mut stack, &mut roots, Node::Interpolation(expr));
        } else {
            // text until next tag or '{{'
            let start = i;
            i += 1;
            while i < bytes.len()
                && !starts_markup(bytes, i)
                && !(i + 1 < bytes.len() && bytes[i] == b'{' && bytes[i + 1] == b'{')
            {
                i += 1;
            }
            let mut text = input[start..i].to_string();
            if is_all_ws(&text) {
                text = " ".to_string();
            }
            push_child(&mut stack, &mut roots, Node::Text(text));
        }
    }

    if let Some(el) = stack.last() {
        return Err(error(format!("`<{}>` is never closed", el.tag), el.open.start));
    }

    roots.retain(|n| !n.is_blank());

    Ok(roots)
}

fn error(message: impl Into<String>, offset: usize) -> TemplateError {
    TemplateError {
        message: message.into(),
        offset,
    }
}

fn starts_markup(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'<'
        && i + 1 < bytes.len()
        && (bytes[i + 1] == b'/' || bytes[i + 1] == b'!' || bytes[i + 1].is_ascii_alphabetic())
}

fn is_all_ws(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace())
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && (bytes[*i] as char).is_whitespace() {
        *i += 1;
    }
}

fn read_ident(bytes: &[u8], i: &mut usize) -> String {
    let start = *i;
    while *i < bytes.len() {
        let c = bytes[*i] as char;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':' {
            *i += 1;
        } else {
            break;
        }
    }
    String::from_utf8_lossy(&bytes[start..*i]).into_owned()
}

fn read_attribute(bytes: &[u8], i: &mut usize) -> Option<TemplateAttr> {
    let name_start = *i;
    while *i < bytes.len() {
        let c = bytes[*i] as char;
        if c.is_ascii_alphanumeric()
            || matches!(c, '_' | '-' | ':' | '@' | '#' | '.' | '[' | ']' | '$')
        {
            *i += 1;
        } else {
            break;
        }
    }
    if *i == name_start {
        return None;
    }
    let raw_name = String::from_utf8_lossy(&bytes[name_start..*i]).into_owned();

    let before_value = *i;
    skip_ws(bytes, i);
    let mut value: Option<String> = None;
    if *i < bytes.len() && bytes[*i] == b'=' {
        *i += 1;
        skip_ws(bytes, i);
        value = read_quoted(bytes, i).or_else(|| read_unquoted(bytes, i));
    } else {
        *i = before_value;
    }

    let (kind, name) = classify_attr_name(&raw_name);
    Some(TemplateAttr { name, value, kind })
}

fn classify_attr_name(raw_name: &str) -> (AttrKind, String) {
    if let Some(rest) = raw_name.strip_prefix(':') {
        (AttrKind::Bind, rest.to_string())
    } else if let Some(rest) = raw_name.strip_prefix("v-bind:") {
        (AttrKind::Bind, rest.to_string())
    } else if let Some(rest) = raw_name.strip_prefix('@') {
        (AttrKind::On, rest.to_string())
    } else if let Some(rest) = raw_name.strip_prefix("v-on:") {
        (AttrKind::On, rest.to_string())
    } else if let Some(rest) = raw_name.strip_prefix('#') {
        (AttrKind::Directive, format!("slot:{rest}"))
    } else if let Some(raw_dir) = raw_name.strip_prefix("v-") {
        (AttrKind::Directive, normalize_directive_name(raw_dir))
    } else {
        (AttrKind::Static, raw_name.to_string())
    }
}

fn read_quoted(bytes: &[u8], i: &mut usize) -> Option<String> {
    if *i >= bytes.len() {
        return None;
    }
    let quote = bytes[*i];
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    *i += 1;
    let start = *i;
    while *i < bytes.len() && bytes[*i] != quote {
        *i += 1;
    }
    let s = String::from_utf8_lossy(&bytes[start..*i]).into_owned();
    if *i < bytes.len() {
        *i += 1;
    } // consume closing quote
    Some(s)
}

fn read_unquoted(bytes: &[u8], i: &mut usize) -> Option<String> {
    let start = *i;
    while *i < bytes.len() && !(bytes[*i] as char).is_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    (*i > start).then(|| String::from_utf8_lossy(&bytes[start..*i]).into_owned())
}

fn normalize_directive_name(s: &str) -> String {
    // keep the argument (`slot:header`) untouched, only normalize the directive
    let (dir, arg) = match s.split_once(':') {
        Some((dir, arg)) => (dir, Some(arg)),
        None => (s, None),
    };
    let mut out = String::with_capacity(s.len());
    for ch in dir.chars() {
        if ch == '_' {
            out.push('-');
        } else if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch.to_ascii_lowercase());
        }
    }
    // collapse any duplicated dashes
    let mut prev_dash = false;
    let mut compact = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '-' {
            if !prev_dash {
                compact.push(c);
                prev_dash = true;
            }
        } else {
            compact.push(c);
            prev_dash = false;
        }
    }
    let mut name = compact.trim_matches('-').to_string();
    if let Some(arg) = arg {
        name.push(':');
        name.push_str(arg);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_names_are_kebab_cased() {
        assert_eq!(normalize_directive_name("elseIf"), "else-if");
        assert_eq!(normalize_directive_name("for"), "for");
        assert_eq!(normalize_directive_name("slot:myName"), "slot:myName");
    }

    #[test]
    fn attribute_prefixes_pick_the_kind() {
        assert_eq!(classify_attr_name(":bar"), (AttrKind::Bind, "bar".into()));
        assert_eq!(classify_attr_name("v-bind:bar"), (AttrKind::Bind, "bar".into()));
        assert_eq!(classify_attr_name("v-bind"), (AttrKind::Directive, "bind".into()));
        assert_eq!(classify_attr_name("@click"), (AttrKind::On, "click".into()));
        assert_eq!(classify_attr_name("#header"), (AttrKind::Directive, "slot:header".into()));
    }
}
