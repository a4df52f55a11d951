//! Expansion of `{{ ... }}` actions in template files.
//!
//! The action set is fixed:
//!
//! | action | output |
//! |---|---|
//! | `generation_message` | the context header |
//! | `from_image <ref>` | the `FROM` directive for `<ref>` |
//! | `get "<key>"` | the value of `<key>`, empty when unset |
//! | `<path>`, `.<path>`, `.Values.<path>` | the value at a dotted path |
//!
//! There are no conditionals, loops, or partials.

pub mod lexer;

use std::path::{Path, PathBuf};

use imagesmith_common::error::{ImagesmithError, Result};
use serde_yaml::Value;

use self::lexer::{Action, Segment, Token};
use crate::context::{RenderContext, display_value};
use crate::origin::ImageRef;

/// Renders the template at `template_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the template is invalid.
pub fn render_file(template_path: &Path, context: &mut RenderContext) -> Result<String> {
    let source = std::fs::read_to_string(template_path)
        .map_err(|e| ImagesmithError::io(template_path, e))?;
    render_str(&source, template_path, context)
}

/// Renders `template_path` and writes the result to `output_path`.
///
/// # Errors
///
/// Returns an error if rendering fails or the output cannot be written.
pub fn write_file(
    template_path: &Path,
    output_path: &Path,
    context: &mut RenderContext,
) -> Result<()> {
    let rendered = render_file(template_path, context)?;
    std::fs::write(output_path, rendered).map_err(|e| ImagesmithError::io(output_path, e))
}

/// Renders template source text. `name` is used in error messages only.
///
/// # Errors
///
/// Returns [`ImagesmithError::Template`] for malformed actions, unknown
/// functions or values, and wrong argument counts.
pub fn render_str(source: &str, name: &Path, context: &mut RenderContext) -> Result<String> {
    let fail = |message: String| ImagesmithError::Template {
        path: name.to_path_buf(),
        message,
    };

    let segments = lexer::segments(source).map_err(fail)?;
    let mut out = String::with_capacity(source.len());
    let mut trim_next = false;

    for segment in segments {
        match segment {
            Segment::Text(text) => {
                if trim_next {
                    out.push_str(text.trim_start());
                } else {
                    out.push_str(text);
                }
                trim_next = false;
            }
            Segment::Comment {
                trim_left,
                trim_right,
            } => {
                if trim_left {
                    out.truncate(out.trim_end().len());
                }
                trim_next = trim_right;
            }
            Segment::Action(action) => {
                if action.trim_left {
                    out.truncate(out.trim_end().len());
                }
                out.push_str(&evaluate(&action, context).map_err(fail)?);
                trim_next = action.trim_right;
            }
        }
    }

    Ok(out)
}

fn evaluate(action: &Action, context: &mut RenderContext) -> std::result::Result<String, String> {
    let (head, args) = match action.tokens.split_first() {
        Some((Token::Word(head), args)) => (head.as_str(), args),
        Some((Token::StringLiteral(literal), [])) => return Ok(literal.clone()),
        _ => return Err("action must start with a function or value name".into()),
    };

    match head {
        "generation_message" => {
            expect_args(head, args, 0)?;
            Ok(context.header().to_owned())
        }
        "from_image" => {
            expect_args(head, args, 1)?;
            match &args[0] {
                Token::StringLiteral(key) => Ok(context.resolve_origin(ImageRef::Key(key))),
                Token::Word(path) => {
                    let value = lookup(context, path)?
                        .ok_or_else(|| format!("no value at {path}"))?;
                    Ok(context.resolve_origin(ImageRef::Value(&value)))
                }
            }
        }
        "get" => {
            expect_args(head, args, 1)?;
            let key = match &args[0] {
                Token::StringLiteral(key) => key.clone(),
                Token::Word(path) => match lookup(context, path)? {
                    Some(Value::String(key)) => key,
                    other => return Err(format!("get: key {path} is not a string: {other:?}")),
                },
            };
            Ok(context.value(&key).map(display_value).unwrap_or_default())
        }
        path => {
            if !args.is_empty() {
                return Err(format!("{path} is a value, not a function"));
            }
            Ok(lookup(context, path)?
                .as_ref()
                .map(display_value)
                .unwrap_or_default())
        }
    }
}

fn expect_args(function: &str, args: &[Token], count: usize) -> std::result::Result<(), String> {
    if args.len() == count {
        Ok(())
    } else {
        Err(format!(
            "{function} takes {count} argument(s), got {}",
            args.len()
        ))
    }
}

/// Resolves a dotted path against the context.
///
/// An unknown top-level key is an error; a missing nested key is `None`.
fn lookup(context: &RenderContext, path: &str) -> std::result::Result<Option<Value>, String> {
    let trimmed = path.trim_start_matches('.');
    let trimmed = trimmed.strip_prefix("Values.").unwrap_or(trimmed);
    let mut parts = trimmed.split('.');

    let head = parts
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| format!("invalid path {path}"))?;
    let mut current = context
        .value(head)
        .ok_or_else(|| format!("unknown function or value {head}"))?;

    for part in parts {
        let Value::Mapping(mapping) = current else {
            return Ok(None);
        };
        let next = mapping
            .get(part)
            .or_else(|| mapping.get(part.to_lowercase().as_str()));
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }

    Ok(Some(current.clone()))
}

/// Output path for a template: the same relative path without `.tmpl`.
#[must_use]
pub fn output_name(template: &Path, suffix: &str) -> PathBuf {
    let text = template.to_string_lossy();
    PathBuf::from(text.strip_suffix(suffix).unwrap_or(&text))
}
