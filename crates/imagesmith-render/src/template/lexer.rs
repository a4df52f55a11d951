//! Tokenization of template source using `nom`.
//!
//! Splits a template into literal text and `{{ ... }}` actions, and breaks
//! each action into words and string literals. `{{-` and `-}}` trim the
//! whitespace on that side of the action; `{{/* ... */}}` is a comment.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    multi::many0,
    sequence::delimited,
};

/// A piece of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied to the output unchanged.
    Text(&'a str),
    /// An action to evaluate.
    Action(Action),
    /// A `{{/* ... */}}` comment.
    Comment {
        /// Whether the comment trims whitespace before it.
        trim_left: bool,
        /// Whether the comment trims whitespace after it.
        trim_right: bool,
    },
}

/// The contents of one `{{ ... }}` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Words and literals inside the braces.
    pub tokens: Vec<Token>,
    /// Whether `{{-` trims whitespace before the action.
    pub trim_left: bool,
    /// Whether `-}}` trims whitespace after the action.
    pub trim_right: bool,
}

/// A token inside an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A function name or dotted value path.
    Word(String),
    /// A double-quoted string literal.
    StringLiteral(String),
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Splits `input` into text and action segments.
///
/// # Errors
///
/// Returns a message describing the first malformed action.
pub fn segments(input: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut rest = input;
    let mut out = Vec::new();

    while !rest.is_empty() {
        let Some(start) = rest.find(OPEN) else {
            out.push(Segment::Text(rest));
            break;
        };
        if start > 0 {
            out.push(Segment::Text(&rest[..start]));
        }

        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(format!(
                "unterminated action starting at byte {}",
                input.len() - rest.len() + start
            ));
        };
        out.push(parse_block(&after_open[..end])?);
        rest = &after_open[end + CLOSE.len()..];
    }

    Ok(out)
}

/// Parses what sits between `{{` and `}}`.
fn parse_block(body: &str) -> Result<Segment<'static>, String> {
    let (body, trim_left) = match body.strip_prefix("- ") {
        Some(stripped) => (stripped, true),
        None => (body, false),
    };
    let (body, trim_right) = match body.strip_suffix(" -") {
        Some(stripped) => (stripped, true),
        None => (body, false),
    };

    let trimmed = body.trim();
    if trimmed.starts_with("/*") && trimmed.ends_with("*/") {
        return Ok(Segment::Comment {
            trim_left,
            trim_right,
        });
    }

    match tokens(trimmed) {
        Ok(("", tokens)) if !tokens.is_empty() => Ok(Segment::Action(Action {
            tokens,
            trim_left,
            trim_right,
        })),
        Ok(("", _)) => Err("empty action".into()),
        Ok((remaining, _)) => Err(format!("unexpected input in action: {remaining:?}")),
        Err(e) => Err(format!("malformed action {trimmed:?}: {e}")),
    }
}

fn tokens(input: &str) -> IResult<&str, Vec<Token>> {
    let (input, tokens) = many0(delimited(multispace0, token, multispace0)).parse(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, tokens))
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((string_literal, word)).parse(input)
}

const fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

const fn is_word_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

/// Parses a function name or value path such as `base_image.name`.
fn word(input: &str) -> IResult<&str, Token> {
    let (input, first) = take_while1(is_word_start)(input)?;
    let (input, rest) = take_while(is_word_continue)(input)?;
    Ok((input, Token::Word(format!("{first}{rest}"))))
}

/// Parses a double-quoted string literal with basic escape support.
fn string_literal(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = input.char_indices();
    loop {
        match chars.next() {
            Some((idx, '"')) => {
                let remaining = &input[idx + 1..];
                return Ok((remaining, Token::StringLiteral(result)));
            }
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, c)) => result.push(c),
                None => return Err(unterminated(input)),
            },
            Some((_, c)) => result.push(c),
            None => return Err(unterminated(input)),
        }
    }
}

fn unterminated(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char))
}
