//! Executor boundary: turns composed node sources into one Tera namespace.
//!
//! Composed nodes still use the brace directives for blocks. Before Tera
//! sees them they are lowered:
//!
//! | Composed source                           | Tera                                   |
//! |-------------------------------------------|----------------------------------------|
//! | `{{ define "BLOCK_3" }}…{{ end }}`        | separate template named `BLOCK_3`      |
//! | `{{ template "BLOCK_3" . }}`              | `{% include "BLOCK_3" %}`              |
//! | `{{ template "BLOCK_3" .Data }}`          | block call with `Data` as the context  |
//!
//! Whatever is left outside define blocks becomes the template named after
//! the node. All templates share one [`Tera`] instance, so blocks defined by
//! any node are visible to every other node.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Weak};

use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::directive::{self, Directive, Piece};
use crate::error::{describe, RenderError};
use crate::funcs::FuncSet;

/// Name of the built-in function that renders a block with a narrowed context.
pub const BLOCK_CALL_FN: &str = "__trellis_block";

/// Variable holding a non-object context, e.g. `{{ dot }}` inside a block
/// called with `.Title`.
pub const DOT_VAR: &str = "dot";

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

fn syntax(template: &str, message: impl Into<String>) -> RenderError {
    RenderError::Syntax {
        template: template.to_owned(),
        message: message.into(),
    }
}

fn current<'b>(top: &'b mut String, open: &'b mut Option<(String, String)>) -> &'b mut String {
    match open {
        Some((_, body)) => body,
        None => top,
    }
}

/// Tera path for a context expression: `.Data.Items` → `Data.Items`.
fn context_path(expr: &str) -> &str {
    expr.trim_start_matches('$').trim_start_matches('.')
}

fn block_call(block: &str, context: Option<&str>) -> String {
    match context.map(context_path) {
        None | Some("") => format!("{{% include \"{block}\" %}}"),
        Some(path) => format!("{{{{ {BLOCK_CALL_FN}(name=\"{block}\", ctx={path}) }}}}"),
    }
}

/// Split one node into `(name, source)` pairs for Tera: the node itself
/// first, then each define block in source order.
fn lower(name: &str, source: &str) -> Result<Vec<(String, String)>, RenderError> {
    let mut top = String::with_capacity(source.len());
    let mut open: Option<(String, String)> = None;
    let mut blocks = Vec::new();

    for piece in directive::scan(source) {
        match piece {
            Piece::Text(text) => current(&mut top, &mut open).push_str(text),
            Piece::Tag(tag) => match tag.directive() {
                Some(Directive::Define { name: block, .. }) => {
                    if let Some((outer, _)) = &open {
                        return Err(syntax(
                            name,
                            format!("define \"{block}\" nested inside define \"{outer}\""),
                        ));
                    }
                    open = Some((block.to_owned(), String::new()));
                }
                Some(Directive::End) => match open.take() {
                    Some(block) => blocks.push(block),
                    None => return Err(syntax(name, "{{ end }} without an open define")),
                },
                Some(Directive::Template { name: block, context }) => {
                    current(&mut top, &mut open).push_str(&block_call(block, context));
                }
                _ => current(&mut top, &mut open).push_str(tag.raw()),
            },
        }
    }

    if let Some((block, _)) = open {
        return Err(syntax(name, format!("define \"{block}\" is never closed")));
    }

    let mut templates = Vec::with_capacity(blocks.len() + 1);
    templates.push((name.to_owned(), top));
    templates.extend(blocks);
    Ok(templates)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Parses nodes one at a time into a shared namespace. The first node parsed
/// becomes the root of the resulting [`Template`].
pub struct TemplateBuilder {
    tera: Tera,
    root: Option<String>,
    names: Vec<String>,
}

impl TemplateBuilder {
    /// A fresh namespace with `funcs` registered on it.
    pub fn new(funcs: &FuncSet, autoescape: bool) -> Self {
        let mut tera = Tera::default();
        if autoescape {
            // Every name ends with "", so every template escapes.
            tera.autoescape_on(vec![""]);
        } else {
            tera.autoescape_on(vec![]);
        }
        funcs.register(&mut tera);
        Self {
            tera,
            root: None,
            names: Vec::new(),
        }
    }

    /// Lower and parse one node.
    pub fn parse(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        let templates = lower(name, source)?;
        let added: Vec<String> = templates.iter().map(|(n, _)| n.clone()).collect();
        self.tera
            .add_raw_templates(templates)
            .map_err(|e| syntax(name, describe(&e)))?;
        if self.root.is_none() {
            self.root = Some(name.to_owned());
        }
        self.names.extend(added);
        Ok(())
    }

    /// Seal the namespace. `requested` names the template in errors.
    pub fn build(self, requested: &str) -> Result<Template, RenderError> {
        let root = self.root.ok_or_else(|| RenderError::NilTemplate {
            name: requested.to_owned(),
        })?;
        let mut tera = self.tera;
        let names = self.names;
        let compiled = Arc::new_cyclic(|weak: &Weak<Compiled>| {
            tera.register_function(
                BLOCK_CALL_FN,
                BlockCall {
                    compiled: weak.clone(),
                },
            );
            Compiled { tera, root, names }
        });
        Ok(Template { compiled })
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

struct Compiled {
    tera: Tera,
    root: String,
    names: Vec<String>,
}

/// A composed, executable template. Clones share the parsed namespace.
#[derive(Clone)]
pub struct Template {
    compiled: Arc<Compiled>,
}

impl Template {
    /// Name of the root node (the chain's root ancestor).
    pub fn name(&self) -> &str {
        &self.compiled.root
    }

    /// Every template in the namespace: nodes and blocks, in parse order.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.compiled.names.iter().map(String::as_str)
    }

    /// Render the root with `data` straight into `out`. Unit or `None` render
    /// with an empty context; a non-object value is available as `dot`.
    pub fn execute<W, T>(&self, out: W, data: &T) -> Result<(), RenderError>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(data)?;
        let context = context_for(value).map_err(|e| self.execute_err(&e))?;
        self.compiled
            .tera
            .render_to(&self.compiled.root, &context, out)
            .map_err(|e| self.execute_err(&e))
    }

    /// Render the root into a `String`.
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, RenderError> {
        let mut buf = Vec::new();
        self.execute(&mut buf, data)?;
        String::from_utf8(buf).map_err(|e| RenderError::Execute {
            template: self.compiled.root.clone(),
            message: e.to_string(),
        })
    }

    /// Whether both handles point at the same parsed namespace.
    pub fn ptr_eq(a: &Template, b: &Template) -> bool {
        Arc::ptr_eq(&a.compiled, &b.compiled)
    }

    fn execute_err(&self, err: &tera::Error) -> RenderError {
        RenderError::Execute {
            template: self.compiled.root.clone(),
            message: describe(err),
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("root", &self.compiled.root)
            .field("templates", &self.compiled.names)
            .finish()
    }
}

/// Context for a data value: object keys become top-level variables, null is
/// empty, and anything else is bound to [`DOT_VAR`].
fn context_for(value: Value) -> tera::Result<Context> {
    match value {
        Value::Null => Ok(Context::new()),
        object @ Value::Object(_) => Context::from_value(object),
        other => {
            let mut context = Context::new();
            context.insert(DOT_VAR, &other);
            Ok(context)
        }
    }
}

/// Renders a block with the value passed as `ctx` as its whole context.
struct BlockCall {
    compiled: Weak<Compiled>,
}

impl tera::Function for BlockCall {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let block = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("block call needs a string `name` argument"))?;
        let ctx = args.get("ctx").cloned().unwrap_or(Value::Null);
        let compiled = self
            .compiled
            .upgrade()
            .ok_or_else(|| tera::Error::msg("composed template is no longer alive"))?;
        let context = context_for(ctx)?;
        compiled.tera.render(block, &context).map(Value::String)
    }

    fn is_safe(&self) -> bool {
        true
    }
}
