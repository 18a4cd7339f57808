//! Rewrites the `<slot>` outlets of an island's template into marker-bearing
//! wrappers, so the client can find each slot (and its fallback content) in
//! the server-rendered HTML and teleport live content into it.

use serde::{Deserialize, Serialize};

use crate::components::ComponentRegistry;
use crate::edit::EditBuffer;
use crate::error::{AnnotateError, TemplateError};
use crate::sfc::parse_sfc;
use crate::template_ast::{AttrKind, Element, Node, TemplateAttr};
use crate::template_parse::parse_template_at;

pub const SLOT_NAME_ATTR: &str = "nuxt-ssr-slot-name";
pub const SLOT_DATA_ATTR: &str = "nuxt-ssr-slot-data";
pub const FALLBACK_START_ATTR: &str = "nuxt-slot-fallback-start";
pub const FALLBACK_END_ATTR: &str = "nuxt-slot-fallback-end";

/// Local name of the runtime helper turning a `v-for` source into an array.
pub const VFOR_HELPER: &str = "__vforToArray";

const DISPLAY_CONTENTS: &str = r#"style="display: contents;""#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotateOptions {
    /// Statement injected into the component script so [`VFOR_HELPER`] resolves.
    pub helper_import: String,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            helper_import: format!(
                "import {{ vforToArray as {VFOR_HELPER} }} from '#app/components/utils'"
            ),
        }
    }
}

/// Annotates the slots of `code` if the module `id` is an island of
/// `registry`. `Ok(None)` means the file is left as it is.
pub fn annotate_slots(
    code: &str,
    id: &str,
    registry: &ComponentRegistry,
    options: &AnnotateOptions,
) -> Result<Option<String>, AnnotateError> {
    if !registry.is_island(id) {
        log::trace!("{id}: not an island, skipped");
        return Ok(None);
    }
    rewrite_slots(code, options)
}

/// Rewrites every `<slot>` of the template block of `code`. Files without a
/// slot tag or without a template are not touched.
pub fn rewrite_slots(code: &str, options: &AnnotateOptions) -> Result<Option<String>, AnnotateError> {
    if !has_slot_tag(code) || !code.contains("<template") {
        return Ok(None);
    }
    let sfc = parse_sfc(code)?;
    let Some(template) = &sfc.template else {
        return Ok(None);
    };
    let nodes = parse_template_at(&template.content, template.open_end)?;

    let mut edits = EditBuffer::new(code);
    let mut rewritten = 0usize;
    let mut pending: Vec<&Node> = nodes.iter().rev().collect();
    while let Some(node) = pending.pop() {
        if let Node::Element(el) = node {
            if el.tag == "slot" {
                rewrite_slot(el, &mut edits)?;
                rewritten += 1;
            }
            pending.extend(el.children.iter().rev());
        }
    }
    if rewritten == 0 {
        return Ok(None);
    }

    match sfc.first_script() {
        Some(script) => {
            edits.append_right(script.block.open_end, format!("\n{}", options.helper_import))
        }
        None => edits.append_left(
            0,
            format!("<script setup>\n{}\n</script>\n", options.helper_import),
        ),
    }
    log::debug!("rewrote {rewritten} slot outlet(s)");
    edits.apply().map(Some)
}

fn has_slot_tag(code: &str) -> bool {
    code.match_indices("<slot").any(|(at, m)| {
        matches!(
            code[at + m.len()..].chars().next(),
            Some(c) if c.is_whitespace() || c == '/' || c == '>'
        )
    })
}

enum SlotName<'a> {
    Static(&'a str),
    Dynamic(&'a str),
}

impl SlotName<'_> {
    fn attr(&self, name: &str) -> String {
        match self {
            SlotName::Static(v) => format!(r#"{name}="{v}""#),
            SlotName::Dynamic(e) => format!(r#":{name}="{}""#, escape_attr(e)),
        }
    }
}

fn rewrite_slot(el: &Element, edits: &mut EditBuffer<'_>) -> Result<(), AnnotateError> {
    let name = if let Some(expr) = el.attr(AttrKind::Bind, "name").and_then(|a| a.value.as_deref()) {
        SlotName::Dynamic(expr)
    } else {
        SlotName::Static(
            el.attr(AttrKind::Static, "name")
                .and_then(|a| a.value.as_deref())
                .unwrap_or("default"),
        )
    };
    let vfor = match el.attr(AttrKind::Directive, "for").and_then(|a| a.value.as_deref()) {
        Some(expr) => Some(parse_vfor(expr).ok_or_else(|| TemplateError {
            message: format!("invalid v-for expression `{expr}`"),
            offset: el.open.start,
        })?),
        None => None,
    };
    let spread = el.attr(AttrKind::Directive, "bind").and_then(|a| a.value.as_deref());
    let bindings: Vec<&TemplateAttr> = el
        .attrs
        .iter()
        .filter(|a| match a.kind {
            AttrKind::Static => a.name != "name",
            AttrKind::Bind => a.name != "name",
            AttrKind::On | AttrKind::Directive => false,
        })
        .collect();

    let data = slot_data_expression(&bindings, spread, vfor.as_ref());
    let open_tag = format!(
        r#"<div {DISPLAY_CONTENTS} {} :{SLOT_DATA_ATTR}="{}""#,
        name.attr(SLOT_NAME_ATTR),
        escape_attr(&data)
    );

    if el.self_closing {
        edits.overwrite(el.open.start, el.open.end, format!("{open_tag}/>"));
        return Ok(());
    }
    let Some(close) = el.close else {
        return Err(TemplateError {
            message: "`<slot>` is never closed".to_string(),
            offset: el.open.start,
        }
        .into());
    };
    edits.overwrite(el.open.start, el.open.end, format!("{open_tag}>"));
    edits.overwrite(close.start, close.end, "</div>");

    let children: Vec<&Node> = el.significant_children().collect();
    let start_marker = format!("<div {}/>", name.attr(FALLBACK_START_ATTR));
    let end_marker = format!("<div {}/>", name.attr(FALLBACK_END_ATTR));
    match children.as_slice() {
        [] => {}
        [only] => {
            // a lone element repeats itself instead of getting a wrapper
            if let (Some((item, collection)), Node::Element(child)) = (&vfor, only) {
                if child.tag != "slot" {
                    edits.append_right(
                        child.open.start + 1 + child.tag.len(),
                        format!(r#" v-for="{item} in {collection}""#),
                    );
                }
            }
            edits.append_right(el.open.end, start_marker);
            edits.append_left(close.start, end_marker);
        }
        _ => {
            let wrapper = match &vfor {
                Some((item, collection)) => {
                    format!(r#"<div v-for="{item} in {collection}" {DISPLAY_CONTENTS}>"#)
                }
                None => format!("<div {DISPLAY_CONTENTS}>"),
            };
            edits.append_right(el.open.end, format!("{start_marker}{wrapper}"));
            edits.append_left(close.start, format!("</div>{end_marker}"));
        }
    }
    Ok(())
}

/// Splits `item in items` (or `item of items`) into its two sides.
pub fn parse_vfor(expr: &str) -> Option<(String, String)> {
    let (item, collection) = expr
        .split_once(" in ")
        .or_else(|| expr.split_once(" of "))?;
    let (item, collection) = (item.trim(), collection.trim());
    (!item.is_empty() && !collection.is_empty()).then(|| (item.to_string(), collection.to_string()))
}

/// The expression bound to `nuxt-ssr-slot-data`: a JSON array with one
/// bindings object per rendered slot instance.
pub fn slot_data_expression(
    bindings: &[&TemplateAttr],
    spread: Option<&str>,
    vfor: Option<&(String, String)>,
) -> String {
    let mut entries: Vec<String> = Vec::with_capacity(bindings.len() + 1);
    if let Some(spread) = spread {
        entries.push(format!("...({spread})"));
    }
    for attr in bindings {
        let key = object_key(&attr.name);
        let value = attr.value.as_deref().unwrap_or_default();
        entries.push(match attr.kind {
            // `:foo` without a value is shorthand for `:foo="foo"`
            AttrKind::Bind if value.is_empty() => format!("{key}: {}", attr.name),
            AttrKind::Bind => format!("{key}: {value}"),
            _ => format!("{key}: `{}`", escape_template(value)),
        });
    }
    let object = if entries.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", entries.join(", "))
    };
    match vfor {
        None => format!("JSON.stringify([{object}])"),
        Some((item, collection)) => {
            format!("JSON.stringify({VFOR_HELPER}({collection}).map({item} => ({object})))")
        }
    }
}

fn object_key(name: &str) -> String {
    let is_ident = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

fn escape_template(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}
