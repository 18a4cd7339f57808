use pest::Parser;
use pest::iterators::Pair;

use crate::error::SfcError;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
struct SfcParser;

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: Option<String>, // boolean attrs allowed, e.g., `scoped` or `setup`
}

/// A top-level block. Offsets are byte positions in the whole file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub attrs: Vec<Attr>,
    pub content: String,
    /// End of the opening tag, which is also where `content` starts.
    pub open_end: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptBlock {
    pub block: Block,
    pub setup: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sfc {
    pub template: Option<Block>,
    pub script_setup: Option<ScriptBlock>,
    pub script: Option<ScriptBlock>,
    pub style: Option<Block>,
}

impl Sfc {
    /// The script block that appears first in the file, setup or not.
    pub fn first_script(&self) -> Option<&ScriptBlock> {
        [self.script.as_ref(), self.script_setup.as_ref()]
            .into_iter()
            .flatten()
            .min_by_key(|s| s.block.open_end)
    }
}

pub fn parse_sfc(source: &str) -> Result<Sfc, SfcError> {
    let mut sfc = Sfc::default();

    let mut pairs = SfcParser::parse(Rule::file, source).map_err(|e| SfcError {
        message: e.to_string(),
    })?;
    let file = pairs.next().ok_or_else(|| SfcError {
        message: "empty file".to_string(),
    })?;
    debug_assert!(file.as_rule() == Rule::file);

    for node in file.into_inner() {
        if node.as_rule() == Rule::block {
            for inner in node.into_inner() {
                consume_top_level(inner, &mut sfc);
            }
        }
    }

    Ok(sfc)
}

fn consume_top_level(node: Pair<Rule>, sfc: &mut Sfc) {
    match node.as_rule() {
        Rule::template => {
            // the first template wins, like the compiler does
            if sfc.template.is_none() {
                sfc.template = Some(parse_block(node));
            }
        }
        Rule::script => {
            let block = parse_block(node);
            let setup = has_bool_attr(&block.attrs, "setup");
            let sb = ScriptBlock { block, setup };
            if setup {
                sfc.script_setup = Some(sb);
            } else {
                sfc.script = Some(sb);
            }
        }
        Rule::style => {
            if sfc.style.is_none() {
                sfc.style = Some(parse_block(node));
            }
        }
        _ => {}
    }
}

fn parse_block(node: Pair<Rule>) -> Block {
    let mut block = Block::default();

    for p in node.into_inner() {
        match p.as_rule() {
            Rule::template_open | Rule::script_open | Rule::style_open => {
                block.open_end = p.as_span().end();
                // attributes are direct children of *_open
                for a in p.into_inner() {
                    if a.as_rule() == Rule::attribute {
                        block.attrs.push(parse_attr(a));
                    }
                }
            }
            Rule::template_body | Rule::script_body | Rule::style_body => {
                block.content = p.as_str().to_string()
            }
            _ => {}
        }
    }
    block
}

fn parse_attr(attr: Pair<Rule>) -> Attr {
    // attribute = ident ( "=" quoted )?
    let mut name = String::new();
    let mut value: Option<String> = None;

    for part in attr.into_inner() {
        match part.as_rule() {
            Rule::ident => name = part.as_str().to_string(),
            Rule::quoted => value = Some(strip_quotes(part.as_str())),
            _ => {}
        }
    }
    Attr { name, value }
}

fn strip_quotes(s: &str) -> String {
    let b = s.as_bytes();
    if b.len() >= 2
        && ((b[0] == b'"' && b[b.len() - 1] == b'"') || (b[0] == b'\'' && b[b.len() - 1] == b'\''))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn has_bool_attr(attrs: &[Attr], key: &str) -> bool {
    attrs.iter().any(|a| a.name == key)
}
