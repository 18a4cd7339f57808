//! Parsing compiled component modules and reading the few shapes the
//! reconstructor cares about out of the oxc AST.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    CallExpression, Declaration, ExportDefaultDeclarationKind, Expression, FormalParameters,
    Function, FunctionBody, ObjectExpression, ObjectPropertyKind, Program, PropertyKey, Statement,
    VariableDeclaration,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::error::{ReconstructError, ReconstructResult};

/// Parses `source` as an ES module. The first diagnostic is reported.
pub(crate) fn parse_module<'a>(
    allocator: &'a Allocator,
    source: &'a str,
) -> ReconstructResult<Program<'a>> {
    let parsed = Parser::new(allocator, source, SourceType::mjs()).parse();
    if let Some(error) = parsed.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, |label| label.offset());
        return Err(ReconstructError::syntax(error.message.to_string(), offset));
    }
    Ok(parsed.program)
}

/// Verbatim source of `span`.
pub(crate) fn slice(source: &str, span: Span) -> &str {
    source
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default()
}

pub(crate) fn start(span: Span) -> usize {
    span.start as usize
}

/// Parameters and body of an arrow function or function expression.
#[derive(Clone, Copy)]
pub(crate) struct Callback<'b, 'a> {
    pub params: &'b FormalParameters<'a>,
    pub body: &'b FunctionBody<'a>,
    /// Arrow with an expression body: the body holds one expression statement.
    pub expression: bool,
    pub span: Span,
}

impl<'b, 'a> Callback<'b, 'a> {
    fn of_function(function: &'b Function<'a>) -> Option<Self> {
        Some(Callback {
            params: &function.params,
            body: function.body.as_deref()?,
            expression: false,
            span: function.span,
        })
    }

    /// The value the callback produces: its expression body, or the argument
    /// of its first top-level `return`.
    pub fn returned(&self) -> Option<&'b Expression<'a>> {
        self.body.statements.iter().find_map(|statement| match statement {
            Statement::ExpressionStatement(s) if self.expression => Some(&s.expression),
            Statement::ReturnStatement(s) => s.argument.as_ref(),
            _ => None,
        })
    }
}

pub(crate) fn callback<'b, 'a>(expression: &'b Expression<'a>) -> Option<Callback<'b, 'a>> {
    match unparenthesized(expression) {
        Expression::ArrowFunctionExpression(arrow) => Some(Callback {
            params: &arrow.params,
            body: &arrow.body,
            expression: arrow.expression,
            span: arrow.span,
        }),
        Expression::FunctionExpression(function) => Callback::of_function(function),
        _ => None,
    }
}

/// The top-level render function of `program`: a function declaration, or a
/// `const` bound to a function, either of them possibly exported.
pub(crate) fn find_render_function<'b, 'a>(
    program: &'b Program<'a>,
    source: &str,
    names: &[String],
) -> Option<(String, Callback<'b, 'a>)> {
    let named = |function: &'b Function<'a>| {
        let id = function.id.as_ref()?;
        let name = id.name.as_str();
        if !names.iter().any(|n| n == name) {
            return None;
        }
        Some((name.to_string(), Callback::of_function(function)?))
    };
    let declared = |declaration: &'b VariableDeclaration<'a>| {
        declaration.declarations.iter().find_map(|declarator| {
            let name = slice(source, declarator.id.span());
            if !names.iter().any(|n| n == name) {
                return None;
            }
            Some((name.to_string(), callback(declarator.init.as_ref()?)?))
        })
    };

    program.body.iter().find_map(|statement| match statement {
        Statement::FunctionDeclaration(function) => named(&**function),
        Statement::VariableDeclaration(declaration) => declared(&**declaration),
        Statement::ExportNamedDeclaration(export) => match &export.declaration {
            Some(Declaration::FunctionDeclaration(function)) => named(&**function),
            Some(Declaration::VariableDeclaration(declaration)) => declared(&**declaration),
            _ => None,
        },
        Statement::ExportDefaultDeclaration(export) => match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => named(&**function),
            _ => None,
        },
        _ => None,
    })
}

pub(crate) fn unparenthesized<'b, 'a>(mut expression: &'b Expression<'a>) -> &'b Expression<'a> {
    while let Expression::ParenthesizedExpression(inner) = expression {
        expression = &inner.expression;
    }
    expression
}

/// Name of the plain identifier being called, if that is what is called.
pub(crate) fn callee_name<'b>(call: &'b CallExpression<'_>) -> Option<&'b str> {
    match unparenthesized(&call.callee) {
        Expression::Identifier(id) => Some(id.name.as_str()),
        _ => None,
    }
}

/// `null`, `undefined` or `void 0`.
pub(crate) fn is_nullish(source: &str, expression: &Expression<'_>) -> bool {
    match unparenthesized(expression) {
        Expression::NullLiteral(_) => true,
        Expression::Identifier(id) => id.name.as_str() == "undefined",
        other => slice(source, other.span()) == "void 0",
    }
}

/// Name of a non-computed property key.
pub(crate) fn static_key<'b>(key: &'b PropertyKey<'_>) -> Option<&'b str> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.as_str()),
        PropertyKey::StringLiteral(s) => Some(s.value.as_str()),
        _ => None,
    }
}

/// Value of the non-computed property `name` of an object literal.
pub(crate) fn property<'b, 'a>(
    object: &'b ObjectExpression<'a>,
    name: &str,
) -> Option<&'b Expression<'a>> {
    object.properties.iter().find_map(|member| match member {
        ObjectPropertyKind::ObjectProperty(p) if !p.computed && static_key(&p.key) == Some(name) => {
            Some(&p.value)
        }
        _ => None,
    })
}
