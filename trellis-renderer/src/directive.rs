//! Directive scanner.
//!
//! Splits template source into plain text and `{{ ... }}` tags, and
//! classifies the tags the composer cares about:
//!
//! | Form                                   | [`Directive`]                 |
//! |----------------------------------------|-------------------------------|
//! | `{{ extends "name" }}`                 | [`Directive::Extends`]        |
//! | `{{ include "name" }}`                 | [`Directive::Include`]        |
//! | `{{ define "name" ["kind"] }}`         | [`Directive::Define`]         |
//! | `{{ template "name" [context] }}`      | [`Directive::Template`]       |
//! | `{{ end }}`                            | [`Directive::End`]            |
//!
//! `extends` and `include` accept double quotes, single quotes, or a bare
//! name. Every other tag is markup for the executor and is reproduced
//! byte-for-byte by [`rewrite`].

use std::convert::Infallible;

/// One scanned fragment of template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Tag(Tag<'a>),
}

/// A `{{ ... }}` tag: the full raw text and the part between the braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    raw: &'a str,
    body: &'a str,
}

impl<'a> Tag<'a> {
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn body(&self) -> &'a str {
        self.body
    }

    /// Classify the tag, or `None` if it is ordinary markup.
    pub fn directive(&self) -> Option<Directive<'a>> {
        classify(self.body)
    }
}

/// A composition directive found in a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    Extends(&'a str),
    Include(&'a str),
    /// `kind` is accepted and carried but has no effect.
    Define { name: &'a str, kind: Option<&'a str> },
    Template { name: &'a str, context: Option<&'a str> },
    End,
}

/// Split `src` into text and tags. An unterminated `{{` is left as text, and
/// a tag always starts at the last `{{` before its `}}`.
pub fn scan(src: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = src;
    while let Some(first) = rest.find("{{") {
        let Some(len) = rest[first + 2..].find("}}") else {
            break;
        };
        let close = first + 2 + len;
        let open = rest[first + 2..close]
            .rfind("{{")
            .map_or(first, |inner| first + 2 + inner);
        if open > 0 {
            pieces.push(Piece::Text(&rest[..open]));
        }
        pieces.push(Piece::Tag(Tag {
            raw: &rest[open..close + 2],
            body: &rest[open + 2..close],
        }));
        rest = &rest[close + 2..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    pieces
}

/// Every directive in `src`, in source order.
pub fn directives(src: &str) -> impl Iterator<Item = Directive<'_>> {
    scan(src).into_iter().filter_map(|piece| match piece {
        Piece::Tag(tag) => tag.directive(),
        Piece::Text(_) => None,
    })
}

/// Rebuild `src`, letting `f` replace directive tags.
///
/// `f` returns `Ok(Some(text))` to substitute the tag, `Ok(None)` to keep it
/// unchanged, or an error to abort. Replacement text is not rescanned.
pub fn rewrite<E, F>(src: &str, mut f: F) -> Result<String, E>
where
    F: FnMut(&Directive<'_>) -> Result<Option<String>, E>,
{
    let mut out = String::with_capacity(src.len());
    for piece in scan(src) {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Tag(tag) => {
                let replacement = match tag.directive() {
                    Some(directive) => f(&directive)?,
                    None => None,
                };
                match replacement {
                    Some(text) => out.push_str(&text),
                    None => out.push_str(tag.raw()),
                }
            }
        }
    }
    Ok(out)
}

/// Infallible form of [`rewrite`].
pub fn replace<F>(src: &str, mut f: F) -> String
where
    F: FnMut(&Directive<'_>) -> Option<String>,
{
    match rewrite::<Infallible, _>(src, |d| Ok(f(d))) {
        Ok(out) => out,
        Err(never) => match never {},
    }
}

fn classify(body: &str) -> Option<Directive<'_>> {
    let body = body.trim();
    let (keyword, rest) = match body.find(char::is_whitespace) {
        Some(i) => (&body[..i], body[i..].trim()),
        None => (body, ""),
    };
    match keyword {
        "extends" => loose_name(rest).map(Directive::Extends),
        "include" => loose_name(rest).map(Directive::Include),
        "define" => {
            let (name, tail) = quoted(rest)?;
            let kind = match tail.trim() {
                "" => None,
                other => Some(define_kind(other)?),
            };
            Some(Directive::Define { name, kind })
        }
        "template" => {
            let (name, tail) = quoted(rest)?;
            let context = match tail.trim() {
                "" => None,
                ctx if !ctx.contains(char::is_whitespace) => Some(ctx),
                _ => return None,
            };
            Some(Directive::Template { name, context })
        }
        "end" if rest.is_empty() => Some(Directive::End),
        _ => None,
    }
}

/// `"name"`, `'name'`, or a bare name with no spaces or quotes.
fn loose_name(s: &str) -> Option<&str> {
    if s.starts_with(['"', '\'']) {
        let (name, tail) = quoted(s)?;
        return tail.trim().is_empty().then_some(name);
    }
    let bare = !s.is_empty() && !s.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'');
    bare.then_some(s)
}

/// Leading quoted string and the text after its closing quote.
fn quoted(s: &str) -> Option<(&str, &str)> {
    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &s[1..];
    let close = inner.find(quote)?;
    let name = &inner[..close];
    if name.is_empty() {
        return None;
    }
    Some((name, &inner[close + 1..]))
}

/// Optional second define token: alphanumeric, optionally double-quoted.
fn define_kind(s: &str) -> Option<&str> {
    let kind = s.strip_prefix('"').and_then(|k| k.strip_suffix('"')).unwrap_or(s);
    kind.chars().all(|c| c.is_ascii_alphanumeric()).then_some(kind)
}
