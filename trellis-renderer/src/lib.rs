//! # trellis-renderer
//!
//! Template inheritance on top of Tera. A template may `extends` a parent,
//! `include` raw fragments, `define` named blocks, and call them with
//! `template`. The most-derived definition of a block wins, and the root
//! ancestor's markup is the page skeleton.
//!
//! ## Usage
//!
//! ```rust
//! use trellis_core::MapLoader;
//! use trellis_renderer::Renderer;
//!
//! let renderer = Renderer::new().with_loader(
//!     MapLoader::new()
//!         .with("base.html", r#"<main>{{ template "body" }}</main>"#)
//!         .with(
//!             "page.html",
//!             r#"{{ extends "base.html" }}{{ define "body" }}hi {{ who }}{{ end }}"#,
//!         ),
//! );
//! renderer.set_caching(true);
//!
//! let html = renderer
//!     .render_to_string("page.html", &serde_json::json!({ "who": "there" }))
//!     .unwrap();
//! assert_eq!(html, "<main>hi there</main>");
//! ```

pub mod composer;
pub mod directive;
pub mod engine;
pub mod error;
pub mod funcs;
pub mod markup;

pub use composer::{BlockTable, Chain, Composer, Composition, Node, BLOCK_PREFIX};
pub use engine::Renderer;
pub use error::RenderError;
pub use funcs::{FilterFn, FuncSet, HelperFn};
pub use markup::{Template, DOT_VAR};
pub use trellis_cache::{Cache, TlruCache};
