//! Tokenizer for the markup chunks a render function pushes.
//!
//! A chunk mixes static text with dynamic `${...}` segments. Dynamic segments
//! are atoms: they are never scanned for `<`, `>` or quotes, they just travel
//! along inside the text or attribute run they appear in.

use std::fmt;

use derive_more::{Display, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    /// Verbatim source of an interpolated expression.
    Dynamic(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PseudoMarkup {
    segments: Vec<Segment>,
}

impl PseudoMarkup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_static(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Static(prev)) => prev.push_str(&text),
            _ => self.segments.push(Segment::Static(text)),
        }
    }

    pub fn push_dynamic(&mut self, expression: impl Into<String>) {
        self.segments.push(Segment::Dynamic(expression.into()));
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PseudoMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Static(text) => f.write_str(text)?,
                Segment::Dynamic(expr) => write!(f, "${{{expr}}}")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupToken {
    Open {
        tag: String,
        /// Attribute text as written, dynamic segments rendered as `${...}`.
        attrs: String,
        /// Written as `<x/>` or a void element; opens no nesting level.
        self_closing: bool,
    },
    Close {
        tag: String,
    },
    Text(String),
    FragmentStart,
    FragmentEnd,
    /// Any other comment; carries its body.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{message} (at character {offset})")]
pub struct MarkupError {
    pub message: String,
    pub offset: usize,
}

pub const FRAGMENT_START: &str = "[";
pub const FRAGMENT_END: &str = "]";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose end tag may be left out; the enclosing close ends them.
const OPTIONAL_END_TAGS: &[&str] = &[
    "li", "dt", "dd", "p", "rt", "rp", "optgroup", "option", "colgroup", "thead", "tbody",
    "tfoot", "tr", "td", "th",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn has_optional_end_tag(tag: &str) -> bool {
    OPTIONAL_END_TAGS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom<'m> {
    Char(char),
    Dynamic(&'m str),
}

pub fn tokenize(markup: &PseudoMarkup) -> Result<Vec<MarkupToken>, MarkupError> {
    let mut atoms = Vec::new();
    for segment in &markup.segments {
        match segment {
            Segment::Static(text) => atoms.extend(text.chars().map(Atom::Char)),
            Segment::Dynamic(expr) => atoms.push(Atom::Dynamic(expr.as_str())),
        }
    }
    Tokenizer {
        atoms: &atoms,
        pos: 0,
        text: String::new(),
        tokens: Vec::new(),
    }
    .run()
}

struct Tokenizer<'a, 'm> {
    atoms: &'a [Atom<'m>],
    pos: usize,
    text: String,
    tokens: Vec<MarkupToken>,
}

impl<'m> Tokenizer<'_, 'm> {
    fn run(mut self) -> Result<Vec<MarkupToken>, MarkupError> {
        while let Some(atom) = self.atom(0) {
            match atom {
                Atom::Char('<') => {
                    self.flush_text();
                    self.tag()?;
                }
                other => {
                    push_atom(&mut self.text, other);
                    self.pos += 1;
                }
            }
        }
        self.flush_text();
        Ok(self.tokens)
    }

    fn atom(&self, ahead: usize) -> Option<Atom<'m>> {
        self.atoms.get(self.pos + ahead).copied()
    }

    fn char_at(&self, ahead: usize) -> Option<char> {
        match self.atom(ahead) {
            Some(Atom::Char(c)) => Some(c),
            _ => None,
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.char_at(i) == Some(c))
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        MarkupError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.tokens.push(MarkupToken::Text(text));
        }
    }

    fn tag(&mut self) -> Result<(), MarkupError> {
        if self.starts_with("<!--") {
            return self.comment();
        }
        if self.char_at(1) == Some('/') && self.char_at(2).is_some_and(|c| c.is_ascii_lowercase()) {
            self.pos += 2;
            let tag = self.tag_name();
            while self.char_at(0).is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            if self.char_at(0) != Some('>') {
                return Err(self.error(format!("closing tag `</{tag}` is not terminated")));
            }
            self.pos += 1;
            self.tokens.push(MarkupToken::Close { tag });
            return Ok(());
        }
        if !self.char_at(1).is_some_and(|c| c.is_ascii_lowercase()) {
            return Err(self.error("`<` does not start a tag"));
        }

        let start = self.pos;
        self.pos += 1;
        let tag = self.tag_name();
        if !matches!(self.atom(0), Some(Atom::Dynamic(_)) | Some(Atom::Char('/' | '>')))
            && !self.char_at(0).is_some_and(char::is_whitespace)
        {
            return Err(self.error(format!("invalid character in tag name `{tag}`")));
        }

        let mut attrs = String::new();
        let mut quoted = false;
        loop {
            match self.atom(0) {
                None => {
                    self.pos = start;
                    return Err(self.error(format!("tag `<{tag}` is not terminated")));
                }
                Some(Atom::Char('>')) if !quoted => break,
                Some(Atom::Char('"')) => {
                    quoted = !quoted;
                    attrs.push('"');
                }
                Some(other) => push_atom(&mut attrs, other),
            }
            self.pos += 1;
        }
        self.pos += 1;

        let mut attrs = attrs.trim().to_string();
        let written_self_closing = attrs.ends_with('/');
        if written_self_closing {
            attrs.pop();
            attrs.truncate(attrs.trim_end().len());
        }
        let self_closing = written_self_closing || is_void_element(&tag);
        let raw_text = !self_closing && RAW_TEXT_ELEMENTS.contains(&tag.as_str());
        self.tokens.push(MarkupToken::Open {
            tag: tag.clone(),
            attrs,
            self_closing,
        });
        if raw_text {
            self.raw_text(&tag)?;
        }
        Ok(())
    }

    fn tag_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.char_at(0) {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == ':') {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        name
    }

    fn comment(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        self.pos += 4;
        let mut body = String::new();
        while !self.starts_with("-->") {
            match self.atom(0) {
                None => {
                    self.pos = start;
                    return Err(self.error("comment is not terminated"));
                }
                Some(atom) => push_atom(&mut body, atom),
            }
            self.pos += 1;
        }
        self.pos += 3;
        self.tokens.push(match body.as_str() {
            FRAGMENT_START => MarkupToken::FragmentStart,
            FRAGMENT_END => MarkupToken::FragmentEnd,
            _ => MarkupToken::Comment(body),
        });
        Ok(())
    }

    /// Content of `<script>`/`<style>` up to the matching close tag.
    fn raw_text(&mut self, tag: &str) -> Result<(), MarkupError> {
        let close = format!("</{tag}");
        let start = self.pos;
        while !self.starts_with(&close) {
            match self.atom(0) {
                None => {
                    self.pos = start;
                    return Err(self.error(format!("`<{tag}>` is never closed")));
                }
                Some(atom) => push_atom(&mut self.text, atom),
            }
            self.pos += 1;
        }
        self.flush_text();
        Ok(())
    }
}

fn push_atom(out: &mut String, atom: Atom<'_>) {
    match atom {
        Atom::Char(c) => out.push(c),
        Atom::Dynamic(expr) => {
            out.push_str("${");
            out.push_str(expr);
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> PseudoMarkup {
        let mut markup = PseudoMarkup::new();
        markup.push_static(text);
        markup
    }

    #[test]
    fn dynamic_segments_are_opaque() {
        let mut markup = PseudoMarkup::new();
        markup.push_static("<div");
        markup.push_dynamic("a > b ? \"<x>\" : ''");
        markup.push_static(">");
        let tokens = tokenize(&markup).unwrap();
        assert_eq!(
            tokens,
            vec![MarkupToken::Open {
                tag: "div".into(),
                attrs: "${a > b ? \"<x>\" : ''}".into(),
                self_closing: false,
            }]
        );
    }

    #[test]
    fn quoted_gt_stays_in_attributes() {
        let tokens = tokenize(&chunk(r#"<a title="1 > 0">x</a>"#)).unwrap();
        assert_eq!(
            tokens[0],
            MarkupToken::Open {
                tag: "a".into(),
                attrs: r#"title="1 > 0""#.into(),
                self_closing: false,
            }
        );
        assert_eq!(tokens[1], MarkupToken::Text("x".into()));
    }

    #[test]
    fn void_elements_close_themselves() {
        let tokens = tokenize(&chunk("<br><img src=\"a\"/>")).unwrap();
        assert!(
            tokens
                .iter()
                .all(|t| matches!(t, MarkupToken::Open { self_closing: true, .. }))
        );
    }

    #[test]
    fn raw_text_is_not_tokenized() {
        let tokens = tokenize(&chunk("<style>a<b{}</style>")).unwrap();
        assert_eq!(tokens[1], MarkupToken::Text("a<b{}".into()));
        assert_eq!(tokens[2], MarkupToken::Close { tag: "style".into() });
    }

    #[test]
    fn stray_angle_bracket_is_rejected() {
        let err = tokenize(&chunk("a < b")).unwrap_err();
        assert_eq!(err.offset, 2);
    }
}
