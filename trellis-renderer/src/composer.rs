//! Inheritance resolution.
//!
//! [`Composer::assemble`] turns a template name into one composed
//! [`Template`]:
//!
//! 1. Build the [`Chain`] by following `extends` upward; ancestors are
//!    appended before descendants, so the root ancestor comes first.
//! 2. Expand every `include` with the raw source of its target.
//! 3. Give every `define` a synthetic `BLOCK_<n>` name, one counter per
//!    assembly, in chain order.
//! 4. Point every `template` at its synthetic name, or drop it when the
//!    block was never defined.
//! 5. Parse every node into one namespace rooted at the first node. The root
//!    ancestor's top-level markup is the document skeleton; descendants only
//!    contribute blocks.
//!
//! The passes run strictly in this order across the whole chain. All working
//! state lives in the call, so concurrent assemblies never interact.

use std::collections::BTreeMap;

use trellis_core::{Loader, LoaderSet};

use crate::directive::{self, Directive};
use crate::error::RenderError;
use crate::funcs::FuncSet;
use crate::markup::{Template, TemplateBuilder};

/// Prefix of every synthetic block name.
pub const BLOCK_PREFIX: &str = "BLOCK_";

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// One template's contribution to a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub source: String,
}

/// Nodes from the root ancestor to the requested template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    nodes: Vec<Node>,
}

impl Chain {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// The root ancestor, whose markup is the document skeleton.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// The requested template.
    pub fn leaf(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn rewrite_each<F>(&mut self, mut f: F) -> Result<(), RenderError>
    where
        F: FnMut(&str, &Directive<'_>) -> Result<Option<String>, RenderError>,
    {
        for node in &mut self.nodes {
            let name = node.name.as_str();
            node.source = directive::rewrite(&node.source, |d| f(name, d))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Block table
// ---------------------------------------------------------------------------

/// User block names mapped to their synthetic names.
///
/// Redefining a name points it at the newer synthetic block; that is how a
/// descendant's define overrides its ancestor's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTable {
    names: BTreeMap<String, String>,
    next: usize,
}

impl BlockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next synthetic name for `name`.
    pub fn define(&mut self, name: &str) -> String {
        let synthetic = format!("{BLOCK_PREFIX}{}", self.next);
        self.next += 1;
        self.names.insert(name.to_owned(), synthetic.clone());
        synthetic
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    /// How many synthetic names have been handed out.
    pub fn allocated(&self) -> usize {
        self.next
    }

    /// Current `(user name, synthetic name)` pairs, sorted by user name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A fully rewritten chain and the blocks it defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub chain: Chain,
    pub blocks: BlockTable,
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Resolves template names through a loader set. Cheap to create; holds only
/// borrows.
pub struct Composer<'a> {
    loaders: &'a LoaderSet,
    funcs: &'a FuncSet,
    autoescape: bool,
}

impl<'a> Composer<'a> {
    pub fn new(loaders: &'a LoaderSet, funcs: &'a FuncSet) -> Self {
        Self {
            loaders,
            funcs,
            autoescape: false,
        }
    }

    pub fn autoescape(mut self, on: bool) -> Self {
        self.autoescape = on;
        self
    }

    /// Build the ancestor chain for `name` with extends directives removed.
    pub fn chain(&self, name: &str) -> Result<Chain, RenderError> {
        let mut chain = Chain::default();
        let mut path = Vec::new();
        self.add(&mut chain, &mut path, name)?;
        Ok(chain)
    }

    /// Build the chain and run the include, define, and template passes.
    pub fn compose(&self, name: &str) -> Result<Composition, RenderError> {
        let mut chain = self.chain(name)?;

        chain.rewrite_each(|within, d| match d {
            Directive::Include(target) => self
                .loaders
                .load(target)
                .map(Some)
                .map_err(|_| RenderError::IncludeMissing {
                    name: (*target).to_owned(),
                    included_from: within.to_owned(),
                }),
            _ => Ok(None),
        })?;

        let mut blocks = BlockTable::new();
        chain.rewrite_each(|within, d| match d {
            Directive::Define { name: block, .. } => {
                let synthetic = blocks.define(block);
                tracing::debug!(template = within, block = *block, %synthetic, "block defined");
                Ok(Some(format!("{{{{ define \"{synthetic}\" }}}}")))
            }
            _ => Ok(None),
        })?;

        chain.rewrite_each(|within, d| match d {
            Directive::Template { name: block, context } => {
                let rewritten = match blocks.resolve(block) {
                    Some(synthetic) => {
                        format!("{{{{ template \"{synthetic}\" {} }}}}", context.unwrap_or("."))
                    }
                    None => {
                        tracing::debug!(template = within, block = *block, "dropping unresolved block reference");
                        String::new()
                    }
                };
                Ok(Some(rewritten))
            }
            _ => Ok(None),
        })?;

        Ok(Composition { chain, blocks })
    }

    /// Compose `name` and parse every node into one executable template.
    pub fn assemble(&self, name: &str) -> Result<Template, RenderError> {
        let Composition { chain, blocks } = self.compose(name)?;
        tracing::debug!(
            template = name,
            chain = ?chain.names(),
            blocks = blocks.allocated(),
            "assembling"
        );
        let mut builder = TemplateBuilder::new(self.funcs, self.autoescape);
        for node in chain.nodes() {
            builder.parse(&node.name, &node.source)?;
        }
        builder.build(name)
    }

    fn load(&self, name: &str) -> Result<String, RenderError> {
        self.loaders.load(name).map_err(|_| RenderError::NoTemplate {
            name: name.to_owned(),
        })
    }

    fn add(&self, chain: &mut Chain, path: &mut Vec<String>, name: &str) -> Result<(), RenderError> {
        if path.iter().any(|p| p == name) {
            let mut cycle = path.clone();
            cycle.push(name.to_owned());
            return Err(RenderError::CyclicExtends {
                name: name.to_owned(),
                chain: cycle,
            });
        }

        let source = self.load(name)?;
        if source.is_empty() {
            return Err(RenderError::EmptyTemplate {
                name: name.to_owned(),
            });
        }

        let parent = directive::directives(&source).find_map(|d| match d {
            Directive::Extends(parent) => Some(parent.to_owned()),
            _ => None,
        });

        let source = match parent {
            Some(parent) => {
                path.push(name.to_owned());
                self.add(chain, path, &parent)?;
                path.pop();
                directive::replace(&source, |d| {
                    matches!(d, Directive::Extends(_)).then(String::new)
                })
            }
            None => source,
        };

        chain.nodes.push(Node {
            name: name.to_owned(),
            source,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::MapLoader;

    fn loaders(templates: &[(&str, &str)]) -> LoaderSet {
        let mut set = LoaderSet::new();
        set.push(templates.iter().copied().collect::<MapLoader>());
        set
    }

    #[test]
    fn chain_is_root_first() {
        let set = loaders(&[
            ("a", r#"{{ extends "b" }}A"#),
            ("b", r#"{{ extends 'c' }}B"#),
            ("c", "C"),
        ]);
        let funcs = FuncSet::new();
        let chain = Composer::new(&set, &funcs).chain("a").unwrap();
        assert_eq!(chain.names(), vec!["c", "b", "a"]);
        assert_eq!(chain.root().unwrap().source, "C");
        assert_eq!(chain.leaf().unwrap().source, "A");
    }

    #[test]
    fn every_extends_tag_is_stripped() {
        let set = loaders(&[
            ("a", r#"{{ extends "b" }}x{{ extends "zzz" }}y"#),
            ("b", "B"),
        ]);
        let funcs = FuncSet::new();
        let chain = Composer::new(&set, &funcs).chain("a").unwrap();
        assert_eq!(chain.names(), vec!["b", "a"]);
        assert_eq!(chain.leaf().unwrap().source, "xy");
    }

    #[test]
    fn missing_and_empty_templates() {
        let set = loaders(&[("empty", ""), ("orphan", r#"{{ extends "gone" }}"#)]);
        let funcs = FuncSet::new();
        let composer = Composer::new(&set, &funcs);
        assert!(matches!(composer.chain("nope"), Err(RenderError::NoTemplate { .. })));
        assert!(matches!(composer.chain("empty"), Err(RenderError::EmptyTemplate { .. })));
        match composer.chain("orphan") {
            Err(RenderError::NoTemplate { name }) => assert_eq!(name, "gone"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cycles_are_reported_with_path() {
        let set = loaders(&[
            ("a", r#"{{ extends "b" }}"#),
            ("b", r#"{{ extends "c" }}"#),
            ("c", r#"{{ extends "a" }}"#),
            ("self", r#"{{ extends "self" }}"#),
        ]);
        let funcs = FuncSet::new();
        let composer = Composer::new(&set, &funcs);
        match composer.chain("a") {
            Err(RenderError::CyclicExtends { name, chain }) => {
                assert_eq!(name, "a");
                assert_eq!(chain, vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            composer.chain("self"),
            Err(RenderError::CyclicExtends { .. })
        ));
    }

    #[test]
    fn defines_numbered_across_whole_chain() {
        let set = loaders(&[
            ("base", r#"{{ define "x" }}1{{ end }}{{ define "y" }}2{{ end }}"#),
            ("child", r#"{{ extends "base" }}{{ define "x" "html" }}3{{ end }}"#),
        ]);
        let funcs = FuncSet::new();
        let comp = Composer::new(&set, &funcs).compose("child").unwrap();
        assert_eq!(comp.blocks.allocated(), 3);
        assert_eq!(comp.blocks.resolve("x"), Some("BLOCK_2"));
        assert_eq!(comp.blocks.resolve("y"), Some("BLOCK_1"));
        assert_eq!(
            comp.chain.nodes()[1].source,
            r#"{{ define "BLOCK_2" }}3{{ end }}"#
        );
    }

    #[test]
    fn template_pass_resolves_or_drops() {
        let set = loaders(&[(
            "t",
            r#"{{ define "known" }}k{{ end }}[{{ template "known" }}][{{ template "known" .Data }}][{{ template "unknown" . }}]"#,
        )]);
        let funcs = FuncSet::new();
        let comp = Composer::new(&set, &funcs).compose("t").unwrap();
        assert_eq!(
            comp.chain.nodes()[0].source,
            r#"{{ define "BLOCK_0" }}k{{ end }}[{{ template "BLOCK_0" . }}][{{ template "BLOCK_0" .Data }}][]"#
        );
    }

    #[test]
    fn include_is_raw_and_not_rescanned_for_includes() {
        let set = loaders(&[
            ("page", r#"<{{ include "frag" }}>"#),
            ("frag", r#"{{ define "f" }}F{{ end }}{{ include "deeper" }}"#),
        ]);
        let funcs = FuncSet::new();
        let comp = Composer::new(&set, &funcs).compose("page").unwrap();
        assert_eq!(
            comp.chain.nodes()[0].source,
            r#"<{{ define "BLOCK_0" }}F{{ end }}{{ include "deeper" }}>"#
        );
    }

    #[test]
    fn missing_include_aborts() {
        let set = loaders(&[("page", r#"{{ include "ghost" }}"#)]);
        let funcs = FuncSet::new();
        let err = Composer::new(&set, &funcs).compose("page").unwrap_err();
        assert!(err.is_not_found());
        match err {
            RenderError::IncludeMissing { name, included_from } => {
                assert_eq!(name, "ghost");
                assert_eq!(included_from, "page");
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
