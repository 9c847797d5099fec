//! Expression engine abstraction.
//!
//! [`Node::Expr`](super::Node::Expr) nodes are evaluated by a
//! [`TemplateEngine`] against the flattened render context. The default
//! implementation is [`MiniJinjaEngine`], which gives expressions the full
//! Jinja filter and test vocabulary.

use minijinja::{Environment, Value};

use crate::error::EngineError;

/// Evaluates inline template expressions.
pub trait TemplateEngine {
    /// Renders `source` with `data` as the template context.
    fn render_expr(&self, source: &str, data: &serde_json::Value) -> Result<String, EngineError>;
}

/// MiniJinja-based expression engine.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use spool_render::template::{MiniJinjaEngine, TemplateEngine};
///
/// let engine = MiniJinjaEngine::new();
/// let output = engine
///     .render_expr("{{ name | upper }}", &json!({"name": "bob"}))
///     .unwrap();
/// assert_eq!(output, "BOB");
/// ```
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// Creates an engine with spool's filters registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        register_filters(&mut env);
        Self { env }
    }

    /// Returns the underlying environment for registering custom filters.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render_expr(&self, source: &str, data: &serde_json::Value) -> Result<String, EngineError> {
        let value = Value::from_serialize(data);
        Ok(self.env.render_str(source, value)?)
    }
}

/// Registers spool's filters with a MiniJinja environment.
pub fn register_filters(env: &mut Environment<'static>) {
    // Newline filter
    env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minijinja_engine_simple() {
        let engine = MiniJinjaEngine::new();
        let output = engine
            .render_expr("Hello, {{ name }}!", &json!({"name": "World"}))
            .unwrap();
        assert_eq!(output, "Hello, World!");
    }

    #[test]
    fn test_minijinja_engine_with_loop() {
        let engine = MiniJinjaEngine::new();
        let output = engine
            .render_expr(
                "{% for item in items %}{{ item }},{% endfor %}",
                &json!({"items": ["a", "b", "c"]}),
            )
            .unwrap();
        assert_eq!(output, "a,b,c,");
    }

    #[test]
    fn test_nl_filter() {
        let engine = MiniJinjaEngine::new();
        let output = engine.render_expr("{{ x | nl }}", &json!({"x": "line"})).unwrap();
        assert_eq!(output, "line\n");
    }

    #[test]
    fn test_minijinja_engine_syntax_error() {
        let engine = MiniJinjaEngine::new();
        let result = engine.render_expr("{{ unclosed", &serde_json::Value::Null);
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_filter() {
        let mut engine = MiniJinjaEngine::new();
        engine
            .environment_mut()
            .add_filter("shout", |value: String| format!("{value}!"));
        let output = engine.render_expr("{{ 'hey' | shout }}", &json!({})).unwrap();
        assert_eq!(output, "hey!");
    }
}
