//! Rebuilds the markup structure of a component from its compiled server
//! render function.
//!
//! The render function appends markup chunks to a buffer through the push
//! helper, interleaved with control flow, list rendering and child component
//! calls. Walking it top to bottom while keeping an explicit stack of open
//! nodes gives back the tree the template was compiled from.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, CallExpression, ChainElement, Expression, IfStatement,
    ObjectExpression, ObjectPropertyKind, Statement, TemplateLiteral,
};
use oxc_span::{GetSpan, Span};

use crate::error::{ReconstructError, ReconstructResult};
use crate::markup::{self, MarkupToken, PseudoMarkup};
use crate::options::Options;
use crate::render_tree::{Binding, FragmentMarker, NodeId, NodeKind, Tree};
use crate::script::{self, Callback, start, unparenthesized};

/// Reconstructs the tree of the render function found in `source`.
///
/// Returns `Ok(None)` when the module declares none of the configured render
/// functions. On error no tree is produced at all.
pub fn reconstruct(source: &str, options: &Options) -> ReconstructResult<Option<Tree>> {
    let allocator = Allocator::default();
    let program = script::parse_module(&allocator, source)?;
    let Some((name, function)) =
        script::find_render_function(&program, source, &options.render_functions)
    else {
        log::debug!("no render function found");
        return Ok(None);
    };
    log::debug!("reconstructing `{name}`");
    let mut builder = TreeBuilder::new(source, options);
    builder.walk_statements(&function.body.statements)?;
    builder.finish().map(Some)
}

struct TreeBuilder<'s> {
    source: &'s str,
    options: &'s Options,
    tree: Tree,
    /// Open nodes, innermost last. The root is never popped.
    stack: Vec<NodeId>,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str, options: &'s Options) -> Self {
        let tree = Tree::new();
        let stack = vec![tree.root()];
        Self {
            source,
            options,
            tree,
            stack,
        }
    }

    fn text(&self, span: Span) -> &'s str {
        script::slice(self.source, span)
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn append(&mut self, kind: NodeKind, offset: usize) -> ReconstructResult<NodeId> {
        let parent = self.current();
        self.tree
            .append(parent, kind)
            .map_err(|e| ReconstructError::malformed(e.to_string(), offset))
    }

    fn open(&mut self, kind: NodeKind, offset: usize) -> ReconstructResult<NodeId> {
        let id = self.append(kind, offset)?;
        self.stack.push(id);
        Ok(id)
    }

    /// Pops `id`, which must be the innermost open node once elements with
    /// an optional end tag are ended.
    fn close(&mut self, id: NodeId, offset: usize) -> ReconstructResult<()> {
        if self.current() != id {
            self.end_implied();
        }
        let top = self.current();
        if top != id {
            return Err(ReconstructError::malformed(
                format!("{} is never closed", self.tree.kind(top)),
                offset,
            ));
        }
        self.stack.pop();
        Ok(())
    }

    /// Pops open elements whose end tag may be omitted.
    fn end_implied(&mut self) {
        while let NodeKind::Element { tag, .. } = self.tree.kind(self.current()) {
            if !markup::has_optional_end_tag(tag) {
                break;
            }
            log::trace!("implied `</{tag}>`");
            self.stack.pop();
        }
    }

    fn top_is_element(&self, tag: &str) -> bool {
        matches!(self.tree.kind(self.current()), NodeKind::Element { tag: open, .. } if open == tag)
    }

    fn finish(mut self) -> ReconstructResult<Tree> {
        self.end_implied();
        if let [_, .., innermost] = self.stack.as_slice() {
            return Err(ReconstructError::malformed(
                format!("{} is never closed", self.tree.kind(*innermost)),
                self.source.len(),
            ));
        }
        log::trace!("reconstructed {} node(s)", self.tree.len());
        Ok(self.tree)
    }

    fn walk_statements(&mut self, statements: &[Statement<'_>]) -> ReconstructResult<()> {
        statements.iter().try_for_each(|s| self.walk_statement(s))
    }

    fn walk_statement(&mut self, statement: &Statement<'_>) -> ReconstructResult<()> {
        match statement {
            Statement::ExpressionStatement(s) => self.walk_expression(&s.expression),
            Statement::IfStatement(branch) => self.walk_if(branch),
            Statement::BlockStatement(block) => self.walk_statements(&block.body),
            Statement::ReturnStatement(s) => match &s.argument {
                Some(argument) => self.walk_expression(argument),
                None => Ok(()),
            },
            Statement::ThrowStatement(s) => self.walk_expression(&s.argument),
            Statement::VariableDeclaration(declaration) => declaration
                .declarations
                .iter()
                .filter_map(|d| d.init.as_ref())
                .try_for_each(|init| self.walk_expression(init)),
            Statement::ForStatement(l) => self.walk_statement(&l.body),
            Statement::ForInStatement(l) => self.walk_statement(&l.body),
            Statement::ForOfStatement(l) => self.walk_statement(&l.body),
            Statement::WhileStatement(l) => self.walk_statement(&l.body),
            Statement::DoWhileStatement(l) => self.walk_statement(&l.body),
            Statement::LabeledStatement(l) => self.walk_statement(&l.body),
            // declared helpers run only when called
            Statement::FunctionDeclaration(_)
            | Statement::BreakStatement(_)
            | Statement::ContinueStatement(_)
            | Statement::EmptyStatement(_)
            | Statement::DebuggerStatement(_) => Ok(()),
            other => Err(ReconstructError::unsupported(
                format!("statement `{}`", first_line(self.text(other.span()))),
                start(other.span()),
            )),
        }
    }

    fn walk_if(&mut self, statement: &IfStatement<'_>) -> ReconstructResult<()> {
        // `if (_push) { ssr } else { vnodes }` inside slot functions
        if matches!(unparenthesized(&statement.test), Expression::Identifier(id) if id.name.as_str() == self.options.push)
        {
            log::trace!("following the ssr branch at byte {}", statement.span.start);
            return self.walk_statement(&statement.consequent);
        }

        let mut branch = statement;
        let mut chained = false;
        loop {
            let offset = start(branch.span);
            let node = self.open(
                NodeKind::Conditional {
                    test: self.text(branch.test.span()).to_string(),
                    chained,
                },
                offset,
            )?;
            self.walk_statement(&branch.consequent)?;
            self.close(node, offset)?;

            match &branch.alternate {
                None => return Ok(()),
                Some(Statement::IfStatement(next)) => {
                    branch = &**next;
                    chained = true;
                }
                Some(alternate) => {
                    let offset = start(alternate.span());
                    let node = self.open(NodeKind::Else, offset)?;
                    self.walk_statement(alternate)?;
                    return self.close(node, offset);
                }
            }
        }
    }

    fn walk_expression(&mut self, expression: &Expression<'_>) -> ReconstructResult<()> {
        match expression {
            Expression::CallExpression(call) => match script::callee_name(call) {
                Some(name) if name == self.options.push => self.handle_push(call),
                Some(name) if name == self.options.render_list => self.handle_render_list(call),
                Some(name) if name == self.options.render_component => {
                    self.handle_component(call)
                }
                _ => {
                    self.walk_expression(&call.callee)?;
                    self.walk_arguments(&call.arguments)
                }
            },
            Expression::ConditionalExpression(c)
                if self.renders(&c.consequent) || self.renders(&c.alternate) =>
            {
                let offset = start(c.span);
                let node = self.open(
                    NodeKind::Conditional {
                        test: self.text(c.test.span()).to_string(),
                        chained: false,
                    },
                    offset,
                )?;
                self.walk_expression(&c.consequent)?;
                self.close(node, offset)?;
                let offset = start(c.alternate.span());
                let node = self.open(NodeKind::Else, offset)?;
                self.walk_expression(&c.alternate)?;
                self.close(node, offset)
            }
            Expression::ConditionalExpression(c) => {
                self.walk_expression(&c.test)?;
                self.walk_expression(&c.consequent)?;
                self.walk_expression(&c.alternate)
            }
            Expression::ArrowFunctionExpression(arrow) => {
                self.walk_statements(&arrow.body.statements)
            }
            Expression::FunctionExpression(function) => match &function.body {
                Some(body) => self.walk_statements(&body.statements),
                None => Ok(()),
            },
            Expression::ParenthesizedExpression(inner) => self.walk_expression(&inner.expression),
            Expression::NewExpression(call) => self.walk_arguments(&call.arguments),
            Expression::SequenceExpression(sequence) => sequence
                .expressions
                .iter()
                .try_for_each(|e| self.walk_expression(e)),
            Expression::ArrayExpression(array) => {
                array.elements.iter().try_for_each(|element| match element {
                    ArrayExpressionElement::SpreadElement(spread) => {
                        self.walk_expression(&spread.argument)
                    }
                    other => match other.as_expression() {
                        Some(e) => self.walk_expression(e),
                        None => Ok(()),
                    },
                })
            }
            Expression::AssignmentExpression(a) => self.walk_expression(&a.right),
            Expression::BinaryExpression(b) => {
                self.walk_expression(&b.left)?;
                self.walk_expression(&b.right)
            }
            Expression::LogicalExpression(b) => {
                self.walk_expression(&b.left)?;
                self.walk_expression(&b.right)
            }
            Expression::UnaryExpression(u) => self.walk_expression(&u.argument),
            Expression::AwaitExpression(a) => self.walk_expression(&a.argument),
            Expression::StaticMemberExpression(m) => self.walk_expression(&m.object),
            Expression::ComputedMemberExpression(m) => self.walk_expression(&m.object),
            Expression::ChainExpression(chain) => match &chain.expression {
                ChainElement::CallExpression(call) => {
                    self.walk_expression(&call.callee)?;
                    self.walk_arguments(&call.arguments)
                }
                _ => Ok(()),
            },
            Expression::ObjectExpression(object) => {
                object.properties.iter().try_for_each(|member| match member {
                    ObjectPropertyKind::ObjectProperty(p) => self.walk_expression(&p.value),
                    ObjectPropertyKind::SpreadProperty(s) => self.walk_expression(&s.argument),
                })
            }
            Expression::TemplateLiteral(template) => template
                .expressions
                .iter()
                .try_for_each(|e| self.walk_expression(e)),
            Expression::TaggedTemplateExpression(tagged) => tagged
                .quasi
                .expressions
                .iter()
                .try_for_each(|e| self.walk_expression(e)),
            _ => Ok(()),
        }
    }

    fn walk_arguments(&mut self, arguments: &[Argument<'_>]) -> ReconstructResult<()> {
        arguments.iter().try_for_each(|argument| match argument {
            Argument::SpreadElement(spread) => self.walk_expression(&spread.argument),
            other => match other.as_expression() {
                Some(e) => self.walk_expression(e),
                None => Ok(()),
            },
        })
    }

    /// Whether `expression` is a recognized render call, alone or in a
    /// sequence.
    fn renders(&self, expression: &Expression<'_>) -> bool {
        match unparenthesized(expression) {
            Expression::CallExpression(call) => script::callee_name(call).is_some_and(|name| {
                name == self.options.push
                    || name == self.options.render_list
                    || name == self.options.render_component
            }),
            Expression::SequenceExpression(sequence) => {
                sequence.expressions.iter().any(|e| self.renders(e))
            }
            _ => false,
        }
    }

    /// Positional argument `index` of `call`, which may not be a spread.
    fn argument<'b, 'a>(
        &self,
        call: &'b CallExpression<'a>,
        index: usize,
    ) -> ReconstructResult<Option<&'b Expression<'a>>> {
        match call.arguments.get(index) {
            None => Ok(None),
            Some(Argument::SpreadElement(spread)) => Err(ReconstructError::unsupported(
                format!("spread argument `{}`", self.text(spread.span)),
                start(spread.span),
            )),
            Some(other) => Ok(other.as_expression()),
        }
    }

    fn handle_push(&mut self, call: &CallExpression<'_>) -> ReconstructResult<()> {
        let offset = start(call.span);
        let (1, Some(argument)) = (call.arguments.len(), self.argument(call, 0)?) else {
            return Err(ReconstructError::unsupported(
                format!("`{}` with {} arguments", self.options.push, call.arguments.len()),
                offset,
            ));
        };
        match unparenthesized(argument) {
            Expression::TemplateLiteral(template) => {
                let markup = self.interleave(template);
                self.feed(&markup, start(template.span))
            }
            Expression::StringLiteral(literal) => {
                let mut markup = PseudoMarkup::new();
                markup.push_static(literal.value.as_str());
                self.feed(&markup, start(literal.span))
            }
            Expression::CallExpression(inner)
                if script::callee_name(inner) == Some(self.options.render_component.as_str()) =>
            {
                self.handle_component(inner)
            }
            // interpolations, rendered attributes, slot outlets ...
            Expression::CallExpression(inner) => {
                let mut markup = PseudoMarkup::new();
                markup.push_dynamic(self.text(inner.span));
                self.feed(&markup, start(inner.span))
            }
            other => {
                log::debug!(
                    "ignoring push of `{}` at byte {}",
                    self.text(other.span()),
                    other.span().start
                );
                self.append(NodeKind::Invalid, start(other.span())).map(drop)
            }
        }
    }

    /// Joins the quasis and substitutions of `template` in source order.
    fn interleave(&self, template: &TemplateLiteral<'_>) -> PseudoMarkup {
        let mut markup = PseudoMarkup::new();
        for (index, quasi) in template.quasis.iter().enumerate() {
            markup.push_static(quasi.value.raw.as_str());
            if let Some(expression) = template.expressions.get(index) {
                markup.push_dynamic(self.text(expression.span()));
            }
        }
        markup
    }

    /// Applies one pushed chunk of markup to the open-node stack.
    fn feed(&mut self, markup: &PseudoMarkup, offset: usize) -> ReconstructResult<()> {
        let tokens = markup::tokenize(markup)
            .map_err(|e| ReconstructError::malformed(format!("in `{markup}`: {e}"), offset))?;
        for token in tokens {
            match token {
                MarkupToken::Open {
                    tag,
                    attrs,
                    self_closing,
                } => {
                    let kind = NodeKind::Element { tag, attrs };
                    if self_closing {
                        self.append(kind, offset)?;
                    } else {
                        self.open(kind, offset)?;
                    }
                }
                MarkupToken::Close { tag } => {
                    if !self.top_is_element(&tag) {
                        self.end_implied();
                    }
                    if !self.top_is_element(&tag) {
                        return Err(ReconstructError::malformed(
                            format!(
                                "unexpected `</{tag}>` inside {}",
                                self.tree.kind(self.current())
                            ),
                            offset,
                        ));
                    }
                    self.stack.pop();
                }
                MarkupToken::Text(text) => {
                    let parent = self.current();
                    self.tree
                        .append_text(parent, &text)
                        .map_err(|e| ReconstructError::malformed(e.to_string(), offset))?;
                }
                MarkupToken::FragmentStart => {
                    self.append(
                        NodeKind::Comment {
                            marker: FragmentMarker::Start,
                        },
                        offset,
                    )?;
                }
                MarkupToken::FragmentEnd => {
                    self.append(
                        NodeKind::Comment {
                            marker: FragmentMarker::End,
                        },
                        offset,
                    )?;
                }
                MarkupToken::Comment(body) => {
                    log::trace!("skipping comment `{body}` at byte {offset}");
                }
            }
        }
        Ok(())
    }

    /// `(collection, callback)` of a list helper call.
    fn list_call<'b, 'a>(
        &self,
        call: &'b CallExpression<'a>,
        helper: &str,
    ) -> ReconstructResult<(&'b Expression<'a>, Callback<'b, 'a>)> {
        let collection = self.argument(call, 0)?;
        let callback = self.argument(call, 1)?.and_then(script::callback);
        match (collection, callback) {
            (Some(collection), Some(callback)) => Ok((collection, callback)),
            _ => Err(ReconstructError::unsupported(
                format!("`{helper}` without a callback"),
                start(call.span),
            )),
        }
    }

    fn handle_render_list(&mut self, call: &CallExpression<'_>) -> ReconstructResult<()> {
        let offset = start(call.span);
        let (collection, callback) = self.list_call(call, &self.options.render_list)?;
        let node = self.open(
            NodeKind::Iteration {
                left: self.binding(callback),
                right: self.text(collection.span()).to_string(),
            },
            offset,
        )?;
        self.walk_statements(&callback.body.statements)?;
        self.close(node, offset)
    }

    /// Source of the loop variables of `callback`: the parameter itself when
    /// there is one, a parenthesized list otherwise.
    fn binding(&self, callback: Callback<'_, '_>) -> String {
        let params = callback.params;
        let mut parts: Vec<&str> = params
            .items
            .iter()
            .map(|p| self.text(p.pattern.span()))
            .collect();
        if let Some(rest) = &params.rest {
            parts.push(self.text(rest.span));
        }
        match parts.as_slice() {
            [] => String::new(),
            [only] if params.rest.is_none() => only.to_string(),
            _ => format!("({})", parts.join(", ")),
        }
    }

    fn handle_component(&mut self, call: &CallExpression<'_>) -> ReconstructResult<()> {
        let offset = start(call.span);
        let Some(reference) = self.argument(call, 0)? else {
            return Err(ReconstructError::unsupported(
                format!("`{}` without a component", self.options.render_component),
                offset,
            ));
        };
        let props = self
            .argument(call, 1)?
            .map_or("null", |props| self.text(props.span()));
        let reference = self.text(reference.span());
        let node = self.open(
            NodeKind::Component {
                reference: reference.to_string(),
                props: props.to_string(),
            },
            offset,
        )?;
        log::trace!("component {reference} at byte {offset}");

        match self.argument(call, 2)? {
            None => {}
            Some(slots) if script::is_nullish(self.source, slots) => {}
            Some(slots) => match unparenthesized(slots) {
                Expression::ObjectExpression(object) => self.slots_object(object)?,
                Expression::CallExpression(c)
                    if script::callee_name(c) == Some(self.options.create_slots.as_str()) =>
                {
                    self.dynamic_slots(c)?
                }
                other => match self.slot_function(other) {
                    Some(function) => self.slot("default".to_string(), function, None, offset)?,
                    None => {
                        return Err(ReconstructError::unsupported(
                            format!("slots given as `{}`", self.text(other.span())),
                            start(other.span()),
                        ));
                    }
                },
            },
        }
        self.close(node, offset)
    }

    /// `{ default: _withCtx(...), header: ..., _: 1 }`
    fn slots_object(&mut self, object: &ObjectExpression<'_>) -> ReconstructResult<()> {
        for member in &object.properties {
            let property = match member {
                ObjectPropertyKind::ObjectProperty(property) => property,
                ObjectPropertyKind::SpreadProperty(spread) => {
                    return Err(ReconstructError::unsupported(
                        "spread in a slots object",
                        start(spread.span),
                    ));
                }
            };
            let name = match script::static_key(&property.key) {
                Some(name) if !property.computed => name,
                _ => self.text(property.key.span()),
            };
            // compiler flag, not a slot
            if name == "_" && !property.computed {
                continue;
            }
            let Some(function) = self.slot_function(&property.value) else {
                return Err(ReconstructError::unsupported(
                    format!("slot `{name}` is not a function"),
                    start(property.span),
                ));
            };
            self.slot(name.to_string(), function, None, start(property.span))?;
        }
        Ok(())
    }

    /// `_createSlots(base, [dynamic, ...])`
    fn dynamic_slots(&mut self, call: &CallExpression<'_>) -> ReconstructResult<()> {
        match self.argument(call, 0)? {
            None => {}
            Some(base) if script::is_nullish(self.source, base) => {}
            Some(base) => match unparenthesized(base) {
                Expression::ObjectExpression(object) => self.slots_object(object)?,
                other => {
                    return Err(ReconstructError::unsupported(
                        format!("static slots given as `{}`", self.text(other.span())),
                        start(other.span()),
                    ));
                }
            },
        }
        let elements = match self.argument(call, 1)?.map(unparenthesized) {
            None => return Ok(()),
            Some(Expression::ArrayExpression(array)) => &array.elements,
            Some(other) => {
                return Err(ReconstructError::unsupported(
                    format!("dynamic slots given as `{}`", self.text(other.span())),
                    start(other.span()),
                ));
            }
        };
        for element in elements {
            match element {
                ArrayExpressionElement::Elision(_) => {}
                ArrayExpressionElement::SpreadElement(spread) => {
                    return Err(ReconstructError::unsupported(
                        "spread in dynamic slots",
                        start(spread.span),
                    ));
                }
                other => {
                    if let Some(element) = other.as_expression() {
                        self.dynamic_slot(element, None)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn dynamic_slot(
        &mut self,
        element: &Expression<'_>,
        iteration: Option<Binding>,
    ) -> ReconstructResult<()> {
        match unparenthesized(element) {
            e if script::is_nullish(self.source, e) => Ok(()),
            Expression::ObjectExpression(descriptor) => {
                let offset = start(descriptor.span);
                let name = match script::property(descriptor, "name").map(unparenthesized) {
                    Some(Expression::StringLiteral(name)) => name.value.to_string(),
                    Some(name) => self.text(name.span()).to_string(),
                    None => {
                        return Err(ReconstructError::unsupported(
                            "dynamic slot without a name",
                            offset,
                        ));
                    }
                };
                let Some(function) =
                    script::property(descriptor, "fn").and_then(|f| self.slot_function(f))
                else {
                    return Err(ReconstructError::unsupported(
                        format!("dynamic slot `{name}` without a function"),
                        offset,
                    ));
                };
                self.slot(name, function, iteration, offset)
            }
            // `v-if` on a slot template
            Expression::ConditionalExpression(c) => {
                self.dynamic_slot(&c.consequent, iteration.clone())?;
                self.dynamic_slot(&c.alternate, iteration)
            }
            Expression::CallExpression(call)
                if script::callee_name(call) == Some(self.options.render_list_slots.as_str()) =>
            {
                let (collection, callback) =
                    self.list_call(call, &self.options.render_list_slots)?;
                let binding = Binding {
                    item: self.binding(callback),
                    collection: self.text(collection.span()).to_string(),
                };
                match callback.returned() {
                    Some(descriptor) => self.dynamic_slot(descriptor, Some(binding)),
                    None => Err(ReconstructError::unsupported(
                        "slot list callback returns nothing",
                        start(callback.span),
                    )),
                }
            }
            other => Err(ReconstructError::unsupported(
                format!("dynamic slot `{}`", self.text(other.span())),
                start(other.span()),
            )),
        }
    }

    /// The function rendering a slot, unwrapping the context helper.
    fn slot_function<'b, 'a>(&self, expression: &'b Expression<'a>) -> Option<Callback<'b, 'a>> {
        match unparenthesized(expression) {
            Expression::CallExpression(call)
                if script::callee_name(call) == Some(self.options.with_ctx.as_str()) =>
            {
                call.arguments
                    .first()
                    .and_then(|argument| argument.as_expression())
                    .and_then(script::callback)
            }
            other => script::callback(other),
        }
    }

    fn slot(
        &mut self,
        name: String,
        function: Callback<'_, '_>,
        iteration: Option<Binding>,
        offset: usize,
    ) -> ReconstructResult<()> {
        let scope = function
            .params
            .items
            .first()
            .map(|p| self.text(p.pattern.span()))
            .filter(|scope| *scope != "_")
            .map(str::to_string);
        log::trace!("slot `{name}` at byte {offset}");
        let node = self.open(
            NodeKind::Slot {
                name,
                scope,
                iteration,
            },
            offset,
        )?;
        self.walk_statements(&function.body.statements)?;
        self.close(node, offset)
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
