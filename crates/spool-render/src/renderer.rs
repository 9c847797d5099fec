//! The renderer: template registry, helpers, data loading, and plugins.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};
use spool_data::{DataError, DataRegistry, ExtensionHandler};
use spool_stream::{Chunk, Context, OutputSink, RenderTree, StringSink};

use crate::config::{PluginErrorPolicy, RenderConfig};
use crate::error::{RenderError, RenderStage, TemplateRenderError};
use crate::helper::{Bodies, Helper, HelperOutput, Params};
use crate::plugin::{LifecycleEvent, Plugin, PluginHost, PluginManager, RenderState};
use crate::template::{compile, Environment, Template, TemplateEngine};

/// Renders registered templates through the chunk stream.
///
/// A renderer owns one [`DataRegistry`] and one [`PluginManager`]. Each
/// call to [`render`](Self::render) is one render pass:
///
/// ```text
/// parse-start → resolve + validate template → parse-complete
///   → load data dirs, serialize data → pre-render
///   → execute into the render tree, drive async branches to completion
///   → post-render (output may be rewritten) → complete
/// ```
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
/// use spool_render::{Renderer, Section, Template};
///
/// #[derive(Serialize)]
/// struct Page { title: String, tags: Vec<String> }
///
/// let mut renderer = Renderer::new();
/// renderer.add_template(
///     "page",
///     Template::new()
///         .reference("title")
///         .text(": ")
///         .section(
///             Section::new("each")
///                 .param_path("of", "tags")
///                 .block(Template::new().reference(".").text(" ")),
///         ),
/// );
///
/// let page = Page { title: "Spool".into(), tags: vec!["a".into(), "b".into()] };
/// assert_eq!(renderer.render("page", &page).unwrap(), "Spool: a b ");
/// ```
pub struct Renderer {
    env: Rc<Environment>,
    data: DataRegistry,
    plugins: PluginManager,
    config: RenderConfig,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Creates a renderer with the built-in helpers and JSON/YAML data handlers.
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    pub fn with_config(config: RenderConfig) -> Self {
        let env = Environment {
            helper_errors: config.helper_errors,
            placeholder: config.placeholder_text.clone(),
            ..Environment::default()
        };
        Self {
            env: Rc::new(env),
            data: DataRegistry::new(),
            plugins: PluginManager::new(),
            config,
        }
    }

    /// Replaces the expression engine used for [`Node::Expr`](crate::template::Node::Expr).
    pub fn set_engine<E>(&mut self, engine: E) -> &mut Self
    where
        E: TemplateEngine + 'static,
    {
        self.env_mut().engine = Rc::new(engine);
        self
    }

    /// Registers a template under `name`, replacing any existing one.
    ///
    /// Registered templates are also available as partials.
    pub fn add_template(&mut self, name: impl Into<String>, template: Template) -> &mut Self {
        let name = name.into();
        tracing::debug!(template = %name, nodes = template.len(), "registered template");
        self.env_mut().templates.insert(name, Rc::new(template));
        self
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.has_template(name)
    }

    pub fn template_count(&self) -> usize {
        self.env.templates.len()
    }

    /// Registers a helper function, replacing any existing helper of that name.
    pub fn add_helper<F>(&mut self, name: impl Into<String>, helper: F) -> &mut Self
    where
        F: Fn(&mut Chunk, &Context, &Bodies, &Params) -> spool_stream::Result<HelperOutput>
            + 'static,
    {
        self.insert_helper(name, Rc::new(helper))
    }

    /// Registers a shared helper.
    pub fn insert_helper(&mut self, name: impl Into<String>, helper: Rc<dyn Helper>) -> &mut Self {
        let name = name.into();
        if self.env_mut().helpers.insert(name.clone(), helper).is_some() {
            tracing::debug!(helper = %name, "overriding helper");
        }
        self
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.env.has_helper(name)
    }

    /// Registers a data extension handler. Last registration for an extension wins.
    pub fn add_extension_handler<H>(&mut self, extension: &str, handler: H) -> &mut Self
    where
        H: ExtensionHandler + 'static,
    {
        self.data.add_extension_handler(extension, handler);
        self
    }

    /// Adds a directory of data files loaded before every render.
    ///
    /// Files are keyed by their stem (or `$storeAs`) and visible to templates
    /// below the caller's data.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory doesn't exist.
    pub fn add_data_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RenderError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(DataError::DirectoryNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        self.config.data_dirs.push(path.to_path_buf());
        Ok(())
    }

    /// Constructs and attaches a plugin.
    ///
    /// `constructor` receives the renderer's [`PluginHost`] and may register
    /// helpers, templates and extension handlers through it. Those
    /// registrations, and any made in [`Plugin::on_attach`], are committed
    /// only if the plugin attaches successfully.
    ///
    /// # Errors
    ///
    /// [`RenderError::Plugin`] wrapping [`PluginError::DuplicateName`](crate::PluginError::DuplicateName)
    /// if a plugin of the same name is attached, or the attach hook's failure.
    pub fn attach_plugin<P, F>(&mut self, constructor: F) -> Result<(), RenderError>
    where
        P: Plugin + 'static,
        F: FnOnce(&mut PluginHost<'_>) -> P,
    {
        let mut host = PluginHost::new(&self.data, &self.env, &self.config);
        let plugin = constructor(&mut host);
        self.plugins.attach(Box::new(plugin), &mut host)?;

        let staged = host.into_staged();
        for (extension, handler) in staged.extension_handlers {
            self.data.insert_handler(&extension, handler);
        }
        let env = self.env_mut();
        for (name, helper) in staged.helpers {
            env.helpers.insert(name, helper);
        }
        for (name, template) in staged.templates {
            env.templates.insert(name, Rc::new(template));
        }
        Ok(())
    }

    /// Attaches an already constructed plugin.
    pub fn attach<P: Plugin + 'static>(&mut self, plugin: P) -> Result<(), RenderError> {
        self.attach_plugin(|_host| plugin)
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn data_registry(&self) -> &DataRegistry {
        &self.data
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders `name` with `data`, blocking until every branch has finished.
    ///
    /// # Errors
    ///
    /// [`RenderError::Template`] naming the failed stage.
    pub fn render<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        futures::executor::block_on(self.render_async(name, data))
    }

    /// Renders `name` with `data` on the current task.
    ///
    /// Asynchronous helper branches are driven by the returned future.
    pub async fn render_async<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        data: &T,
    ) -> Result<String, RenderError> {
        let sink = StringSink::new();
        let output = self.pass(name, data, sink.clone(), Some(sink)).await?;
        Ok(output.unwrap_or_default())
    }

    /// Renders `name` into `sink`, emitting output as soon as each in-order
    /// prefix is complete.
    ///
    /// Output is not captured, so post-render handlers see no output and
    /// cannot rewrite it.
    pub fn stream<T, S>(&mut self, name: &str, data: &T, sink: S) -> Result<(), RenderError>
    where
        T: Serialize + ?Sized,
        S: OutputSink + 'static,
    {
        futures::executor::block_on(self.pass(name, data, sink, None)).map(|_| ())
    }

    async fn pass<T, S>(
        &mut self,
        name: &str,
        data: &T,
        sink: S,
        capture: Option<StringSink>,
    ) -> Result<Option<String>, RenderError>
    where
        T: Serialize + ?Sized,
        S: OutputSink + 'static,
    {
        let mut state = RenderState::new(name);
        tracing::debug!(template = name, "render pass started");

        self.fire(LifecycleEvent::ParseStart, &mut state)?;
        let template = self.env.templates.get(name).cloned().ok_or_else(|| {
            TemplateRenderError::new(
                RenderStage::Parse,
                name,
                format!("template `{name}` is not registered"),
            )
        })?;
        self.env
            .validate(&template)
            .map_err(|message| TemplateRenderError::new(RenderStage::Parse, name, message))?;
        let body = compile(template, Rc::clone(&self.env));
        self.fire(LifecycleEvent::ParseComplete, &mut state)?;

        let mut globals = Map::new();
        for dir in &self.config.data_dirs {
            self.data
                .load_dir(dir, &mut globals)
                .map_err(|err| TemplateRenderError::new(RenderStage::DataLoad, name, err))?;
        }
        let data = serde_json::to_value(data)
            .map_err(|err| TemplateRenderError::new(RenderStage::DataLoad, name, err))?;

        self.fire(LifecycleEvent::PreRender, &mut state)?;
        globals.extend(state.globals().clone());
        let ctx = Context::new(data).with_globals(Value::Object(globals));

        let (tree, mut root) = RenderTree::start(sink);
        root.render(&body, &ctx)
            .and_then(|root| root.end())
            .map_err(|err| TemplateRenderError::from_stream(name, err))?;
        tree.run()
            .await
            .map_err(|err| TemplateRenderError::from_stream(name, err))?;
        tracing::debug!(template = name, chunks = tree.chunk_count(), "render tree drained");

        if let Some(capture) = capture {
            state.set_output(capture.take());
        }
        self.fire(LifecycleEvent::PostRender, &mut state)?;
        self.fire(LifecycleEvent::Complete, &mut state)?;
        Ok(state.take_output())
    }

    /// Dispatches `event`, applying the configured plugin error policy.
    fn fire(&mut self, event: LifecycleEvent, state: &mut RenderState) -> Result<(), RenderError> {
        state.record(event);
        let Err(err) = self.plugins.dispatch(event, state) else {
            return Ok(());
        };

        match self.config.plugin_errors {
            PluginErrorPolicy::Abort => {
                let origin = err.plugin_name().map(str::to_string);
                let mut failure =
                    TemplateRenderError::new(RenderStage::PluginEvent(event), state.template(), err);
                if let Some(origin) = origin {
                    failure = failure.with_origin(origin);
                }
                Err(failure.into())
            }
            PluginErrorPolicy::Continue => {
                tracing::warn!(%event, error = %err, "plugin handler failed, continuing");
                Ok(())
            }
        }
    }

    fn env_mut(&mut self) -> &mut Environment {
        Rc::make_mut(&mut self.env)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("env", &self.env)
            .field("data", &self.data)
            .field("plugins", &self.plugins)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HelperErrorPolicy;
    use crate::template::Section;
    use serde_json::json;

    #[test]
    fn test_render_missing_template_is_parse_error() {
        let mut renderer = Renderer::new();
        let err = renderer.render("nope", &json!({})).unwrap_err();
        assert_eq!(err.stage(), Some(RenderStage::Parse));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_render_unknown_helper_is_parse_error() {
        let mut renderer = Renderer::new();
        renderer.add_template("page", Template::new().section(Section::new("missing")));
        let err = renderer.render("page", &json!({})).unwrap_err();
        assert_eq!(err.stage(), Some(RenderStage::Parse));
    }

    #[test]
    fn test_render_helper_failure_names_helper() {
        let mut renderer = Renderer::new();
        renderer.add_helper("fail", |_chunk, _ctx, _bodies, _params| {
            Err(spool_stream::StreamError::render("no backend"))
        });
        renderer.add_template("page", Template::new().text("a").section(Section::new("fail")));
        match renderer.render("page", &json!({})).unwrap_err() {
            RenderError::Template(err) => {
                assert_eq!(err.stage, RenderStage::Helper);
                assert_eq!(err.origin.as_deref(), Some("fail"));
                assert_eq!(err.template, "page");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_render_placeholder_policy_from_config() {
        let config = RenderConfig::new()
            .helper_errors(HelperErrorPolicy::Placeholder)
            .placeholder_text("?");
        let mut renderer = Renderer::with_config(config);
        renderer.add_helper("fail", |_chunk, _ctx, _bodies, _params| {
            Err(spool_stream::StreamError::render("no backend"))
        });
        renderer.add_template(
            "page",
            Template::new().text("[").section(Section::new("fail")).text("]"),
        );
        assert_eq!(renderer.render("page", &json!({})).unwrap(), "[?]");
    }

    #[test]
    fn test_render_serializes_structs() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }
        let mut renderer = Renderer::new();
        renderer.add_template("page", Template::new().text("hi ").reference("name"));
        assert_eq!(renderer.render("page", &User { name: "bob" }).unwrap(), "hi bob");
    }

    #[test]
    fn test_stream_writes_to_sink() {
        let mut renderer = Renderer::new();
        renderer.add_template(
            "page",
            Template::new().section(
                Section::new("upper").block(Template::new().text("loud ").markup("<br>")),
            ),
        );
        let sink = StringSink::new();
        renderer.stream("page", &json!({}), sink.clone()).unwrap();
        assert_eq!(sink.contents(), "LOUD <br>");
    }

    #[test]
    fn test_add_data_dir_rejects_missing_directory() {
        let mut renderer = Renderer::new();
        let err = renderer.add_data_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, RenderError::Data(DataError::DirectoryNotFound { .. })));
        assert!(renderer.config().data_dirs.is_empty());
    }

    #[test]
    fn test_custom_engine() {
        struct Echo;
        impl TemplateEngine for Echo {
            fn render_expr(
                &self,
                source: &str,
                _data: &Value,
            ) -> Result<String, crate::error::EngineError> {
                Ok(format!("<{source}>"))
            }
        }
        let mut renderer = Renderer::new();
        renderer.set_engine(Echo);
        renderer.add_template("page", Template::new().expr("x"));
        assert_eq!(renderer.render("page", &json!({})).unwrap(), "<x>");
    }
}
