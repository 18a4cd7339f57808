pub mod components;
pub mod edit;
pub mod error;
pub mod sfc;
pub mod slot_annotate;
pub mod template_ast;
pub mod template_parse;

pub use components::{Component, ComponentMode, ComponentRegistry};
pub use error::{AnnotateError, SfcError, TemplateError};
pub use sfc::{Attr, Block, ScriptBlock, Sfc, parse_sfc};
pub use slot_annotate::{AnnotateOptions, annotate_slots, rewrite_slots};
pub use template_ast::{AttrKind, Element, Node, Span, TemplateAttr};
pub use template_parse::{parse_template_at, parse_template_to_ast};
