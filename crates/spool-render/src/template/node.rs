//! The template node model.
//!
//! Templates are built in code from a small set of nodes; parsing a surface
//! syntax into this model is left to whoever produces templates.
//!
//! ```rust
//! use spool_render::template::{Section, Template};
//!
//! let greeting = Template::new()
//!     .text("Hello, ")
//!     .reference("user.name")
//!     .section(
//!         Section::new("eq")
//!             .param_path("key", "user.role")
//!             .param("value", "admin")
//!             .block(Template::new().text(" (admin)")),
//!     );
//! assert_eq!(greeting.len(), 3);
//! ```

use std::rc::Rc;

use serde_json::Value;
use spool_stream::Context;

/// A helper parameter: a literal, or a path resolved against the context.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Literal(Value),
    Path(String),
}

impl Param {
    /// Resolves the parameter. Unresolvable paths become `null`.
    pub fn resolve(&self, ctx: &Context) -> Value {
        match self {
            Param::Literal(value) => value.clone(),
            Param::Path(path) => ctx.get(path).cloned().unwrap_or(Value::Null),
        }
    }
}

/// A helper invocation with parameters and named bodies.
#[derive(Debug, Clone)]
pub struct Section {
    pub helper: String,
    pub params: Vec<(String, Param)>,
    pub bodies: Vec<(String, Rc<Template>)>,
}

impl Section {
    pub fn new(helper: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
            params: Vec::new(),
            bodies: Vec::new(),
        }
    }

    /// Adds a literal parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), Param::Literal(value.into())));
        self
    }

    /// Adds a parameter resolved from the context at render time.
    pub fn param_path(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.params.push((name.into(), Param::Path(path.into())));
        self
    }

    /// Adds a named body.
    pub fn body(mut self, name: impl Into<String>, template: Template) -> Self {
        self.bodies.push((name.into(), Rc::new(template)));
        self
    }

    /// Adds the main `block` body.
    pub fn block(self, template: Template) -> Self {
        self.body("block", template)
    }

    /// Adds the alternate `else` body.
    pub fn otherwise(self, template: Template) -> Self {
        self.body("else", template)
    }
}

/// A node in a template.
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal text, written through the chunk's transforms.
    Text(String),
    /// Literal markup, written verbatim.
    Markup(String),
    /// A context path whose value is written as text. Missing paths write nothing.
    Reference(String),
    /// An inline expression evaluated by the template engine against the
    /// flattened context, e.g. `{{ name | upper }}`.
    Expr(String),
    /// A helper call.
    Section(Section),
    /// A registered template rendered inline, optionally scoped to a path.
    Partial {
        name: String,
        context: Option<String>,
    },
    /// Renders `block` when `path` is truthy (or falsy, when `negate`),
    /// otherwise the optional alternate.
    Conditional {
        path: String,
        negate: bool,
        block: Rc<Template>,
        otherwise: Option<Rc<Template>>,
    },
}

/// An ordered list of nodes.
#[derive(Debug, Clone, Default)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.node(Node::Text(text.into()))
    }

    pub fn markup(self, markup: impl Into<String>) -> Self {
        self.node(Node::Markup(markup.into()))
    }

    pub fn reference(self, path: impl Into<String>) -> Self {
        self.node(Node::Reference(path.into()))
    }

    pub fn expr(self, source: impl Into<String>) -> Self {
        self.node(Node::Expr(source.into()))
    }

    pub fn section(self, section: Section) -> Self {
        self.node(Node::Section(section))
    }

    pub fn partial(self, name: impl Into<String>) -> Self {
        self.node(Node::Partial {
            name: name.into(),
            context: None,
        })
    }

    /// Renders the partial with the value at `path` pushed onto the context.
    pub fn partial_with(self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.node(Node::Partial {
            name: name.into(),
            context: Some(path.into()),
        })
    }

    pub fn exists(self, path: impl Into<String>, block: Template) -> Self {
        self.conditional(path, false, block, None)
    }

    pub fn exists_else(self, path: impl Into<String>, block: Template, otherwise: Template) -> Self {
        self.conditional(path, false, block, Some(otherwise))
    }

    pub fn not_exists(self, path: impl Into<String>, block: Template) -> Self {
        self.conditional(path, true, block, None)
    }

    fn conditional(
        self,
        path: impl Into<String>,
        negate: bool,
        block: Template,
        otherwise: Option<Template>,
    ) -> Self {
        self.node(Node::Conditional {
            path: path.into(),
            negate,
            block: Rc::new(block),
            otherwise: otherwise.map(Rc::new),
        })
    }
}

/// Truthiness used by conditionals and boolean helper results.
///
/// `null`, `false`, `""` and `[]` are falsy; everything else (including `0`
/// and `{}`) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Renders a value as output text. Strings are written bare, `null` as
/// nothing, and compound values as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_appends_in_order() {
        let template = Template::new().text("a").reference("b").markup("<c>");
        assert!(matches!(template.nodes()[0], Node::Text(_)));
        assert!(matches!(template.nodes()[1], Node::Reference(_)));
        assert!(matches!(template.nodes()[2], Node::Markup(_)));
    }

    #[test]
    fn section_collects_params_and_bodies() {
        let section = Section::new("login")
            .param("retries", 3)
            .param_path("user", "username")
            .block(Template::new())
            .otherwise(Template::new());
        assert_eq!(section.params.len(), 2);
        let names: Vec<&str> = section.bodies.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["block", "else"]);
    }

    #[test]
    fn params_resolve_against_context() {
        let ctx = Context::new(json!({"username": "bob"}));
        assert_eq!(Param::Path("username".into()).resolve(&ctx), json!("bob"));
        assert_eq!(Param::Path("missing".into()).resolve(&ctx), Value::Null);
        assert_eq!(Param::Literal(json!(3)).resolve(&ctx), json!(3));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!(0)));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn display_values() {
        assert_eq!(display_value(&json!("x")), "x");
        assert_eq!(display_value(&json!(null)), "");
        assert_eq!(display_value(&json!(2)), "2");
        assert_eq!(display_value(&json!([1])), "[1]");
    }
}
