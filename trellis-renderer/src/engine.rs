//! [`Renderer`]: the entry point that ties loaders, the function table, and
//! the template cache together.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tera::Value;

use trellis_cache::{Cache, TlruCache};
use trellis_core::config::DEFAULT_CACHE_CAPACITY;
use trellis_core::{Config, Loader, LoaderSet};

use crate::composer::{Composer, Composition};
use crate::error::RenderError;
use crate::funcs::FuncSet;
use crate::markup::Template;

/// Composes, caches, and executes templates.
///
/// A `Renderer` is `Send + Sync`; share it behind an `Arc` to render from
/// many threads. Caching is off until enabled through [`Renderer::set_caching`]
/// or the config.
pub struct Renderer {
    loaders: LoaderSet,
    funcs: FuncSet,
    cache: Arc<dyn Cache<Template>>,
    autoescape: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer with no loaders, caching off, and autoescaping off.
    pub fn new() -> Self {
        Self {
            loaders: LoaderSet::new(),
            funcs: FuncSet::new(),
            cache: Arc::new(TlruCache::new(DEFAULT_CACHE_CAPACITY).with_caching(false)),
            autoescape: false,
        }
    }

    /// Renderer described by `config`: a directory loader over its template
    /// dirs, a cache of its capacity and enable flag, and its escaping mode.
    pub fn from_config(config: &Config) -> Self {
        let cache = TlruCache::new(config.cache.capacity).with_caching(config.cache.enabled);
        let mut renderer = Self::new()
            .with_cache(cache)
            .with_autoescape(config.autoescape);
        if let Some(dirs) = config.dir_loader() {
            renderer.add_loader(dirs);
        }
        renderer
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    /// Append a loader. Loaders are consulted in the order they were added.
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.add_loader(loader);
        self
    }

    pub fn add_loader(&mut self, loader: impl Loader + 'static) {
        self.loaders.push(loader);
    }

    /// Replace the cache. Entries in the previous cache are not carried over.
    pub fn with_cache(mut self, cache: impl Cache<Template> + 'static) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Use a cache that is also held elsewhere.
    pub fn with_shared_cache(mut self, cache: Arc<dyn Cache<Template>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.funcs.add_function(name, function);
        self
    }

    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Value, &HashMap<String, Value>) -> tera::Result<Value> + Send + Sync + 'static,
    {
        self.funcs.add_filter(name, filter);
        self
    }

    pub fn with_functions(mut self, funcs: &FuncSet) -> Self {
        self.funcs.merge(funcs);
        self
    }

    pub fn with_autoescape(mut self, on: bool) -> Self {
        self.autoescape = on;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Turn caching on or off. Turning it off leaves existing entries in
    /// place; they are ignored until caching is turned back on.
    pub fn set_caching(&self, on: bool) {
        self.cache.set_caching(on);
    }

    pub fn caching(&self) -> bool {
        self.cache.on()
    }

    pub fn cache(&self) -> &Arc<dyn Cache<Template>> {
        &self.cache
    }

    pub fn loaders(&self) -> &LoaderSet {
        &self.loaders
    }

    pub fn funcs(&self) -> &FuncSet {
        &self.funcs
    }

    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    pub fn composer(&self) -> Composer<'_> {
        Composer::new(&self.loaders, &self.funcs).autoescape(self.autoescape)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Render `name` with `data` into `out`.
    pub fn render<W, T>(&self, out: W, name: &str, data: &T) -> Result<(), RenderError>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        self.fetch(name)?.execute(out, data)
    }

    pub fn render_to_string<T>(&self, name: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize + ?Sized,
    {
        self.fetch(name)?.render(data)
    }

    /// The composed template for `name`, from the cache when caching is on.
    pub fn fetch(&self, name: &str) -> Result<Template, RenderError> {
        if self.cache.on() {
            if let Some(template) = self.cache.get(name) {
                tracing::debug!(template = name, "cache hit");
                return Ok(template);
            }
            tracing::debug!(template = name, "cache miss");
        }
        self.assemble(name)
    }

    /// Rewrite the chain for `name` without parsing it. Never cached.
    pub fn compose(&self, name: &str) -> Result<Composition, RenderError> {
        self.composer().compose(name)
    }

    /// Every name the loaders can see, sorted.
    pub fn list_templates(&self) -> Result<Vec<String>, trellis_core::LoadError> {
        self.loaders.list_templates()
    }

    fn assemble(&self, name: &str) -> Result<Template, RenderError> {
        let template = self.composer().assemble(name)?;
        if self.cache.on() {
            self.cache.add(name, template.clone());
        }
        Ok(template)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("loaders", &self.loaders)
            .field("funcs", &self.funcs)
            .field("caching", &self.cache.on())
            .field("autoescape", &self.autoescape)
            .finish()
    }
}
