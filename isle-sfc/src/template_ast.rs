/// Byte range in the source the template was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    Static,    // class="app"
    Bind,      // :value="count"
    On,        // @click="increment"
    Directive, // v-for="item in items"
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAttr {
    pub name: String,
    pub value: Option<String>,
    pub kind: AttrKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<TemplateAttr>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    /// The opening tag, `<tag ...>` or `<tag .../>`.
    pub open: Span,
    /// The closing tag; `None` for self-closing and void elements.
    pub close: Option<Span>,
}

impl Element {
    pub fn attr(&self, kind: AttrKind, name: &str) -> Option<&TemplateAttr> {
        self.attrs.iter().find(|a| a.kind == kind && a.name == name)
    }

    /// Children that carry content; whitespace-only text is not counted.
    pub fn significant_children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|c| !c.is_blank())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Interpolation(String), // {{ expr }}
    Comment(String),
}

impl Node {
    pub fn is_blank(&self) -> bool {
        match self {
            Node::Text(t) => t.chars().all(char::is_whitespace),
            _ => false,
        }
    }
}
