//! Helpers: named functions invoked by [`Section`](crate::template::Section) nodes.
//!
//! A helper receives the chunk to write into, the current context, the
//! section's compiled bodies and its resolved parameters. It either writes
//! to the chunk itself and returns [`HelperOutput::Chunk`], or returns a
//! value for the template executor to write.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use spool_render::{HelperOutput, Renderer, Section, Template};
//!
//! let mut renderer = Renderer::new();
//! renderer.add_helper("greet", |chunk, _ctx, _bodies, params| {
//!     let name = params.get_str("name").unwrap_or("stranger");
//!     chunk.write("Hello, ")?.write(name)?;
//!     Ok(HelperOutput::Chunk)
//! });
//! renderer.add_template(
//!     "page",
//!     Template::new().section(Section::new("greet").param_path("name", "user")),
//! );
//!
//! assert_eq!(renderer.render("page", &json!({"user": "bob"})).unwrap(), "Hello, bob");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{json, Map, Value};
use spool_stream::{Body, Chunk, Context, Result, StreamError};

use crate::template::Param;

/// What a helper produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HelperOutput {
    /// The helper wrote its output to the chunk.
    Chunk,
    /// A value for the executor to write. `true` renders the `block` body,
    /// `false` the `else` body, `null` nothing; anything else is written as
    /// text.
    Value(Value),
}

impl From<Value> for HelperOutput {
    fn from(value: Value) -> Self {
        HelperOutput::Value(value)
    }
}

impl From<bool> for HelperOutput {
    fn from(value: bool) -> Self {
        HelperOutput::Value(Value::Bool(value))
    }
}

/// A helper callable from templates.
///
/// Closures `Fn(&mut Chunk, &Context, &Bodies, &Params) -> Result<HelperOutput>`
/// implement this trait.
pub trait Helper {
    fn call(
        &self,
        chunk: &mut Chunk,
        ctx: &Context,
        bodies: &Bodies,
        params: &Params,
    ) -> Result<HelperOutput>;
}

impl<F> Helper for F
where
    F: Fn(&mut Chunk, &Context, &Bodies, &Params) -> Result<HelperOutput>,
{
    fn call(
        &self,
        chunk: &mut Chunk,
        ctx: &Context,
        bodies: &Bodies,
        params: &Params,
    ) -> Result<HelperOutput> {
        (self)(chunk, ctx, bodies, params)
    }
}

/// A section's compiled bodies, by name.
///
/// Cheap to clone, so asynchronous helpers can move them into a branch.
#[derive(Clone, Default)]
pub struct Bodies {
    bodies: HashMap<String, Body>,
}

impl Bodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, body: Body) {
        self.bodies.insert(name.into(), body);
    }

    pub fn get(&self, name: &str) -> Option<&Body> {
        self.bodies.get(name)
    }

    /// The main body.
    pub fn block(&self) -> Option<&Body> {
        self.get("block")
    }

    /// The alternate body.
    pub fn otherwise(&self) -> Option<&Body> {
        self.get("else")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl fmt::Debug for Bodies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.bodies.keys().collect();
        names.sort();
        f.debug_struct("Bodies").field("names", &names).finish()
    }
}

/// A section's parameters, resolved against the context at call time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Map<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn resolve(params: &[(String, Param)], ctx: &Context) -> Self {
        let values = params
            .iter()
            .map(|(name, param)| (name.clone(), param.resolve(ctx)))
            .collect();
        Self { values }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The parameter value, or `null` when absent.
    pub fn value(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Registers the built-in helpers.
pub(crate) fn builtins() -> Vec<(&'static str, Rc<dyn Helper>)> {
    vec![
        ("eq", Rc::new(eq) as Rc<dyn Helper>),
        ("upper", Rc::new(upper)),
        ("each", Rc::new(each)),
    ]
}

/// `eq`: selects `block` when params `key` and `value` are equal, else `else`.
fn eq(_chunk: &mut Chunk, _ctx: &Context, _bodies: &Bodies, params: &Params) -> Result<HelperOutput> {
    Ok((params.value("key") == params.value("value")).into())
}

/// `upper`: renders `block` with an uppercasing transform installed.
fn upper(chunk: &mut Chunk, ctx: &Context, bodies: &Bodies, _params: &Params) -> Result<HelperOutput> {
    if let Some(block) = bodies.block() {
        chunk.tap(|data| data.to_uppercase())?;
        chunk.render(block, ctx)?;
        chunk.untap()?;
    }
    Ok(HelperOutput::Chunk)
}

/// `each`: renders `block` once per item of the array param `of`. The item
/// is the current frame, with `$idx` and `$len` in the frame below it. An
/// empty or missing array renders `else`.
fn each(chunk: &mut Chunk, ctx: &Context, bodies: &Bodies, params: &Params) -> Result<HelperOutput> {
    let items: &[Value] = match params.get("of") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(StreamError::render(format!(
                "`each` expects an array for `of`, got {other}"
            )))
        }
    };

    if items.is_empty() {
        if let Some(otherwise) = bodies.otherwise() {
            chunk.render(otherwise, ctx)?;
        }
        return Ok(HelperOutput::Chunk);
    }

    let Some(block) = bodies.block() else {
        return Ok(HelperOutput::Chunk);
    };
    for (idx, item) in items.iter().enumerate() {
        let scoped = ctx
            .push(json!({ "$idx": idx, "$len": items.len() }))
            .push(item.clone());
        chunk.render(block, &scoped)?;
    }
    Ok(HelperOutput::Chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_stream::{RenderTree, StringSink};

    fn body(f: impl Fn(&mut Chunk, &Context) -> Result<()> + 'static) -> Body {
        Rc::new(f)
    }

    fn run(helper: &dyn Helper, ctx: &Context, bodies: &Bodies, params: &Params) -> (HelperOutput, String) {
        let sink = StringSink::new();
        let (_tree, mut chunk) = RenderTree::start(sink.clone());
        let output = helper.call(&mut chunk, ctx, bodies, params).unwrap();
        chunk.end().unwrap();
        (output, sink.contents())
    }

    #[test]
    fn eq_compares_params() {
        let mut params = Params::new();
        params.insert("key", "admin");
        params.insert("value", "admin");
        let (output, _) = run(&eq, &Context::empty(), &Bodies::new(), &params);
        assert_eq!(output, HelperOutput::Value(Value::Bool(true)));

        params.insert("value", "guest");
        let (output, _) = run(&eq, &Context::empty(), &Bodies::new(), &params);
        assert_eq!(output, HelperOutput::Value(Value::Bool(false)));
    }

    #[test]
    fn upper_taps_block_and_restores_stack() {
        let mut bodies = Bodies::new();
        bodies.insert(
            "block",
            body(|chunk, ctx| {
                let name = ctx.get("name").and_then(Value::as_str).unwrap_or_default();
                chunk.write("hi ")?.write(name)?;
                Ok(())
            }),
        );
        let ctx = Context::new(json!({"name": "bob"}));
        let (_, output) = run(&upper, &ctx, &bodies, &Params::new());
        assert_eq!(output, "HI BOB");
    }

    #[test]
    fn each_pushes_items_and_index() {
        let mut bodies = Bodies::new();
        bodies.insert(
            "block",
            body(|chunk, ctx| {
                let idx = ctx.get("$idx").and_then(Value::as_u64).unwrap_or_default();
                let name = ctx.get("name").and_then(Value::as_str).unwrap_or_default();
                chunk.write(&format!("{idx}:{name};"))?;
                Ok(())
            }),
        );
        let mut params = Params::new();
        params.insert("of", json!([{"name": "a"}, {"name": "b"}]));
        let (_, output) = run(&each, &Context::empty(), &bodies, &params);
        assert_eq!(output, "0:a;1:b;");
    }

    #[test]
    fn each_renders_else_for_empty_array() {
        let mut bodies = Bodies::new();
        bodies.insert("else", body(|chunk, _| chunk.write("none").map(|_| ())));
        let mut params = Params::new();
        params.insert("of", json!([]));
        let (_, output) = run(&each, &Context::empty(), &bodies, &params);
        assert_eq!(output, "none");
    }

    #[test]
    fn each_rejects_non_array() {
        let sink = StringSink::new();
        let (_tree, mut chunk) = RenderTree::start(sink);
        let mut params = Params::new();
        params.insert("of", 3);
        let err = each(&mut chunk, &Context::empty(), &Bodies::new(), &params).unwrap_err();
        assert!(err.to_string().contains("expects an array"));
    }

    #[test]
    fn closures_are_helpers() {
        let helper = |chunk: &mut Chunk, _: &Context, _: &Bodies, _: &Params| -> Result<HelperOutput> {
            chunk.write("closure")?;
            Ok(HelperOutput::Chunk)
        };
        let (_, output) = run(&helper, &Context::empty(), &Bodies::new(), &Params::new());
        assert_eq!(output, "closure");
    }
}
