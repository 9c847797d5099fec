//! Turns templates into executable [`Body`] closures.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::json;
use spool_stream::{Body, Chunk, Context, Result, StreamError};

use super::engine::{MiniJinjaEngine, TemplateEngine};
use super::node::{display_value, is_truthy, Node, Section, Template};
use crate::config::HelperErrorPolicy;
use crate::helper::{builtins, Bodies, Helper, HelperOutput, Params};

/// Everything a compiled body needs at execution time: helpers, partials,
/// the expression engine, and the helper error policy.
#[derive(Clone)]
pub(crate) struct Environment {
    pub(crate) helpers: HashMap<String, Rc<dyn Helper>>,
    pub(crate) templates: HashMap<String, Rc<Template>>,
    pub(crate) engine: Rc<dyn TemplateEngine>,
    pub(crate) helper_errors: HelperErrorPolicy,
    pub(crate) placeholder: String,
}

impl Default for Environment {
    fn default() -> Self {
        let helpers = builtins()
            .into_iter()
            .map(|(name, helper)| (name.to_string(), helper))
            .collect();
        Self {
            helpers,
            templates: HashMap::new(),
            engine: Rc::new(MiniJinjaEngine::new()),
            helper_errors: HelperErrorPolicy::default(),
            placeholder: String::new(),
        }
    }
}

impl Environment {
    pub(crate) fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub(crate) fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Checks that every helper and partial `template` references is
    /// registered, returning the first missing one.
    pub(crate) fn validate(&self, template: &Template) -> std::result::Result<(), String> {
        for node in template.nodes() {
            match node {
                Node::Section(section) => {
                    if !self.has_helper(&section.helper) {
                        return Err(format!("unknown helper `{}`", section.helper));
                    }
                    for (_, body) in &section.bodies {
                        self.validate(body)?;
                    }
                }
                Node::Partial { name, .. } => {
                    if !self.has_template(name) {
                        return Err(format!("unknown partial `{name}`"));
                    }
                }
                Node::Conditional {
                    block, otherwise, ..
                } => {
                    self.validate(block)?;
                    if let Some(otherwise) = otherwise {
                        self.validate(otherwise)?;
                    }
                }
                Node::Text(_) | Node::Markup(_) | Node::Reference(_) | Node::Expr(_) => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut helpers: Vec<&String> = self.helpers.keys().collect();
        helpers.sort();
        let mut templates: Vec<&String> = self.templates.keys().collect();
        templates.sort();
        f.debug_struct("Environment")
            .field("helpers", &helpers)
            .field("templates", &templates)
            .field("helper_errors", &self.helper_errors)
            .finish()
    }
}

/// Wraps `template` in a body that executes it against `env`.
pub(crate) fn compile(template: Rc<Template>, env: Rc<Environment>) -> Body {
    Rc::new(move |chunk: &mut Chunk, ctx: &Context| execute(&template, chunk, ctx, &env))
}

pub(crate) fn execute(
    template: &Template,
    chunk: &mut Chunk,
    ctx: &Context,
    env: &Rc<Environment>,
) -> Result<()> {
    for node in template.nodes() {
        match node {
            Node::Text(text) => {
                chunk.write(text)?;
            }
            Node::Markup(markup) => {
                chunk.write_raw(markup)?;
            }
            Node::Reference(path) => {
                if let Some(value) = ctx.get(path) {
                    chunk.write(&display_value(value))?;
                }
            }
            Node::Expr(source) => {
                let output = env
                    .engine
                    .render_expr(source, &ctx.to_value())
                    .map_err(StreamError::failed)?;
                chunk.write(&output)?;
            }
            Node::Section(section) => render_section(section, chunk, ctx, env)?,
            Node::Partial { name, context } => {
                let partial = env
                    .templates
                    .get(name)
                    .ok_or_else(|| StreamError::render(format!("unknown partial `{name}`")))?;
                let scoped = match context {
                    Some(path) => ctx.push(ctx.get(path).cloned().unwrap_or_default()),
                    None => ctx.clone(),
                };
                execute(partial, chunk, &scoped, env)?;
            }
            Node::Conditional {
                path,
                negate,
                block,
                otherwise,
            } => {
                let truthy = ctx.get(path).is_some_and(is_truthy);
                if truthy != *negate {
                    execute(block, chunk, ctx, env)?;
                } else if let Some(otherwise) = otherwise {
                    execute(otherwise, chunk, ctx, env)?;
                }
            }
        }
    }
    Ok(())
}

fn render_section(
    section: &Section,
    chunk: &mut Chunk,
    ctx: &Context,
    env: &Rc<Environment>,
) -> Result<()> {
    let name = section.helper.as_str();
    let helper = env
        .helpers
        .get(name)
        .cloned()
        .ok_or_else(|| StreamError::render("helper is not registered").in_helper(name))?;

    let mut bodies = Bodies::new();
    for (body_name, template) in &section.bodies {
        bodies.insert(body_name.clone(), compile(Rc::clone(template), Rc::clone(env)));
    }
    let params = Params::resolve(&section.params, ctx);
    let depth = chunk.tap_depth();

    match helper.call(chunk, ctx, &bodies, &params) {
        Ok(HelperOutput::Chunk) => Ok(()),
        Ok(HelperOutput::Value(value)) => {
            write_value(chunk, ctx, &bodies, &value).map_err(|err| err.in_helper(name))
        }
        Err(err) if err.is_contract_violation() => Err(err.in_helper(name)),
        Err(err) => match env.helper_errors {
            HelperErrorPolicy::Abort => Err(err.in_helper(name)),
            HelperErrorPolicy::Placeholder => {
                tracing::warn!(helper = name, error = %err, "helper failed, rendering placeholder");
                while chunk.tap_depth() > depth {
                    chunk.untap()?;
                }
                match bodies.get("error") {
                    Some(body) => {
                        chunk.render(body, &ctx.push(json!({ "error": err.to_string() })))?;
                    }
                    None => {
                        chunk.write(&env.placeholder)?;
                    }
                }
                Ok(())
            }
        },
    }
}

fn write_value(
    chunk: &mut Chunk,
    ctx: &Context,
    bodies: &Bodies,
    value: &serde_json::Value,
) -> Result<()> {
    let body = match value {
        serde_json::Value::Bool(true) => bodies.block(),
        serde_json::Value::Bool(false) => bodies.otherwise(),
        serde_json::Value::Null => None,
        other => {
            chunk.write(&display_value(other))?;
            None
        }
    };
    if let Some(body) = body {
        chunk.render(body, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use spool_stream::{RenderTree, StringSink};

    fn render(env: Environment, template: Template, data: Value) -> Result<String> {
        let sink = StringSink::new();
        let (tree, mut root) = RenderTree::start(sink.clone());
        let body = compile(Rc::new(template), Rc::new(env));
        root.render(&body, &Context::new(data))?;
        root.end()?;
        futures::executor::block_on(tree.run())?;
        Ok(sink.contents())
    }

    #[test]
    fn text_references_and_markup() {
        let template = Template::new()
            .markup("<p>")
            .text("Hi ")
            .reference("user.name")
            .reference("missing")
            .markup("</p>");
        let output = render(
            Environment::default(),
            template,
            serde_json::json!({"user": {"name": "bob"}}),
        )
        .unwrap();
        assert_eq!(output, "<p>Hi bob</p>");
    }

    #[test]
    fn expressions_see_flattened_context() {
        let template = Template::new().expr("{{ name | upper }}!");
        let output = render(Environment::default(), template, json!({"name": "bob"})).unwrap();
        assert_eq!(output, "BOB!");
    }

    #[test]
    fn boolean_helper_result_selects_body() {
        let section = |role: &str| {
            Section::new("eq")
                .param_path("key", "role")
                .param("value", role)
                .block(Template::new().text("yes"))
                .otherwise(Template::new().text("no"))
        };
        let template = Template::new().section(section("admin")).section(section("guest"));
        let output = render(Environment::default(), template, json!({"role": "admin"})).unwrap();
        assert_eq!(output, "yesno");
    }

    #[test]
    fn partials_render_with_scoped_context() {
        let mut env = Environment::default();
        env.templates.insert(
            "name".into(),
            Rc::new(Template::new().reference("first").text(" ").reference("last")),
        );
        let template = Template::new().partial_with("name", "author");
        let output = render(
            env,
            template,
            json!({"author": {"first": "Ada", "last": "Lovelace"}}),
        )
        .unwrap();
        assert_eq!(output, "Ada Lovelace");
    }

    #[test]
    fn conditionals() {
        let template = Template::new()
            .exists("items", Template::new().text("has items"))
            .not_exists("empty", Template::new().text(", none empty"))
            .exists_else(
                "flag",
                Template::new().text(" flag"),
                Template::new().text(" no flag"),
            );
        let output = render(
            Environment::default(),
            template,
            json!({"items": [1], "empty": [], "flag": false}),
        )
        .unwrap();
        assert_eq!(output, "has items, none empty no flag");
    }

    #[test]
    fn helper_failure_aborts_by_default() {
        let mut env = Environment::default();
        env.helpers.insert(
            "boom".into(),
            Rc::new(|_: &mut Chunk, _: &Context, _: &Bodies, _: &Params| -> Result<HelperOutput> {
                Err(StreamError::render("exploded"))
            }),
        );
        let err = render(env, Template::new().section(Section::new("boom")), json!({})).unwrap_err();
        assert!(matches!(err, StreamError::Helper { ref helper, .. } if helper == "boom"));
    }

    #[test]
    fn helper_failure_renders_error_body_under_placeholder_policy() {
        let mut env = Environment::default();
        env.helper_errors = HelperErrorPolicy::Placeholder;
        env.placeholder = "[n/a]".into();
        env.helpers.insert(
            "boom".into(),
            Rc::new(|chunk: &mut Chunk, _: &Context, _: &Bodies, _: &Params| -> Result<HelperOutput> {
                chunk.tap(|s| s.to_uppercase())?;
                Err(StreamError::render("exploded"))
            }),
        );
        let template = Template::new()
            .section(Section::new("boom"))
            .text(" ")
            .section(
                Section::new("boom").body("error", Template::new().text("failed: ").reference("error")),
            );
        let output = render(env, template, json!({})).unwrap();
        assert_eq!(output, "[n/a] failed: exploded");
    }

    #[test]
    fn validate_reports_missing_helpers_and_partials() {
        let env = Environment::default();
        let nested = Template::new().exists(
            "x",
            Template::new().section(Section::new("eq").block(Template::new().partial("nope"))),
        );
        assert_eq!(env.validate(&nested).unwrap_err(), "unknown partial `nope`");
        let missing = Template::new().section(Section::new("login"));
        assert_eq!(env.validate(&missing).unwrap_err(), "unknown helper `login`");
    }
}
