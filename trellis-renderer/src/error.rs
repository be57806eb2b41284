//! Error types for trellis-renderer.

use thiserror::Error;

/// All errors that can arise while composing or executing a template.
///
/// Every variant aborts the request that produced it; there is no partial
/// result.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No loader could produce source for the name.
    #[error("no template named {name}")]
    NoTemplate { name: String },

    /// A loader returned source of zero length.
    #[error("empty template named {name}")]
    EmptyTemplate { name: String },

    /// An `include` target could not be loaded.
    #[error("no template named {name} (included from {included_from})")]
    IncludeMissing { name: String, included_from: String },

    /// The extends chain revisits a template.
    #[error("cyclic extends: {}", chain.join(" -> "))]
    CyclicExtends { name: String, chain: Vec<String> },

    /// The executor rejected a node's rewritten source.
    #[error("syntax error in template {template}: {message}")]
    Syntax { template: String, message: String },

    /// Assembly produced no root template.
    #[error("nil template named {name}")]
    NilTemplate { name: String },

    /// The executor failed while rendering.
    #[error("failed to execute template {template}: {message}")]
    Execute { template: String, message: String },

    /// The render data could not be turned into an executor context.
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RenderError {
    /// True for the "nothing to load" family: a missing template or a
    /// missing include target.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RenderError::NoTemplate { .. } | RenderError::IncludeMissing { .. }
        )
    }
}

/// Flatten a Tera error and its causes into one line.
pub(crate) fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
