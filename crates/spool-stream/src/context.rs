//! Layered, immutable render contexts.
//!
//! A [`Context`] is a stack of JSON frames over a bottom layer of globals.
//! [`Context::push`] never mutates: it returns a new view whose top frame is
//! the pushed value, so sibling renders that share a parent never see each
//! other's pushed values.
//!
//! # Lookup
//!
//! [`Context::get`] resolves dotted paths (`user.name`, `items.0`). The first
//! path segment is searched from the newest frame down to the globals; the
//! first frame that has the key owns the rest of the path. The path `.`
//! resolves to the newest frame itself.
//!
//! ```rust
//! use serde_json::json;
//! use spool_stream::Context;
//!
//! let base = Context::new(json!({"user": {"name": "bob"}, "role": "guest"}));
//! let scoped = base.push(json!({"role": "admin"}));
//!
//! assert_eq!(scoped.get("role"), Some(&json!("admin")));
//! assert_eq!(scoped.get("user.name"), Some(&json!("bob")));
//! assert_eq!(base.get("role"), Some(&json!("guest")));
//! ```

use std::rc::Rc;

use serde_json::{Map, Value};

#[derive(Debug)]
struct Frame {
    value: Value,
    parent: Option<Rc<Frame>>,
}

/// A cheap-to-clone view over layered context data.
#[derive(Debug, Clone)]
pub struct Context {
    head: Option<Rc<Frame>>,
    globals: Rc<Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self::empty()
    }
}

impl Context {
    /// Creates a context with a single frame.
    pub fn new(value: Value) -> Self {
        Self::empty().push(value)
    }

    /// Creates a context with no frames and no globals.
    pub fn empty() -> Self {
        Self {
            head: None,
            globals: Rc::new(Value::Null),
        }
    }

    /// Replaces the globals layer searched after every frame.
    pub fn with_globals(mut self, globals: Value) -> Self {
        self.globals = Rc::new(globals);
        self
    }

    /// Returns a new view with `value` as its newest frame.
    pub fn push(&self, value: impl Into<Value>) -> Context {
        Context {
            head: Some(Rc::new(Frame {
                value: value.into(),
                parent: self.head.clone(),
            })),
            globals: Rc::clone(&self.globals),
        }
    }

    /// Returns the newest frame, if any.
    pub fn current(&self) -> Option<&Value> {
        self.head.as_deref().map(|frame| &frame.value)
    }

    /// Number of pushed frames (globals excluded).
    pub fn depth(&self) -> usize {
        self.frames().count()
    }

    /// Resolves a dotted path against the frames, newest first, then globals.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path == "." || path == "this" {
            return self.current();
        }

        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let rest: Vec<&str> = segments.collect();

        let owner = self
            .frames()
            .chain(std::iter::once(self.globals.as_ref()))
            .find_map(|value| value.as_object().and_then(|map| map.get(first)))?;

        rest.into_iter().try_fold(owner, |value, segment| descend(value, segment))
    }

    /// Returns true if `path` resolves to a present, non-null value.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some_and(|value| !value.is_null())
    }

    /// Flattens the view into a single object, newer frames shadowing older.
    ///
    /// Non-object frames are skipped. Used to hand the context to expression
    /// engines that expect one flat mapping.
    pub fn to_value(&self) -> Value {
        let mut merged = Map::new();
        if let Value::Object(globals) = self.globals.as_ref() {
            merged.extend(globals.clone());
        }
        let frames: Vec<&Value> = self.frames().collect();
        for frame in frames.into_iter().rev() {
            if let Value::Object(map) = frame {
                merged.extend(map.clone());
            }
        }
        Value::Object(merged)
    }

    fn frames(&self) -> impl Iterator<Item = &Value> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
            .map(|frame| &frame.value)
    }
}

fn descend<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_does_not_leak_into_siblings() {
        let parent = Context::new(json!({"a": 1}));
        let left = parent.push(json!({"side": "left"}));
        let right = parent.push(json!({"side": "right"}));

        assert_eq!(left.get("side"), Some(&json!("left")));
        assert_eq!(right.get("side"), Some(&json!("right")));
        assert_eq!(parent.get("side"), None);
        assert_eq!(parent.depth(), 1);
        assert_eq!(left.depth(), 2);
    }

    #[test]
    fn nested_paths_and_indexes() {
        let ctx = Context::new(json!({"items": [{"name": "x"}, {"name": "y"}]}));
        assert_eq!(ctx.get("items.1.name"), Some(&json!("y")));
        assert_eq!(ctx.get("items.7.name"), None);
        assert_eq!(ctx.get("items.name"), None);
    }

    #[test]
    fn first_owner_wins_for_paths() {
        let ctx = Context::new(json!({"user": {"name": "bob", "id": 1}}))
            .push(json!({"user": {"name": "eve"}}));
        assert_eq!(ctx.get("user.name"), Some(&json!("eve")));
        // the newer frame owns `user`, so older keys under it are not visible
        assert_eq!(ctx.get("user.id"), None);
    }

    #[test]
    fn globals_are_searched_last() {
        let ctx = Context::new(json!({"title": "page"}))
            .with_globals(json!({"title": "site", "version": "1.0"}));
        assert_eq!(ctx.get("title"), Some(&json!("page")));
        assert_eq!(ctx.get("version"), Some(&json!("1.0")));
    }

    #[test]
    fn current_frame_and_dot_path() {
        let ctx = Context::new(json!({"a": 1})).push(json!("scalar"));
        assert_eq!(ctx.get("."), Some(&json!("scalar")));
        assert_eq!(ctx.current(), Some(&json!("scalar")));
        // scalar frames are skipped for keyed lookups
        assert_eq!(ctx.get("a"), Some(&json!(1)));
    }

    #[test]
    fn contains_ignores_null() {
        let ctx = Context::new(json!({"present": 0, "missing": null}));
        assert!(ctx.contains("present"));
        assert!(!ctx.contains("missing"));
        assert!(!ctx.contains("absent"));
    }

    #[test]
    fn to_value_flattens_newest_last() {
        let ctx = Context::new(json!({"a": 1, "b": 1}))
            .with_globals(json!({"g": true, "a": 0}))
            .push(json!({"b": 2}));
        assert_eq!(ctx.to_value(), json!({"a": 1, "b": 2, "g": true}));
    }

    #[test]
    fn empty_context_resolves_nothing() {
        let ctx = Context::empty();
        assert_eq!(ctx.get("anything"), None);
        assert_eq!(ctx.get(""), None);
        assert_eq!(ctx.current(), None);
    }
}
