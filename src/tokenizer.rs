//! Command-line tokenizer for chat commands.
//!
//! Splits a raw command string into argument tokens:
//!
//! - runs of spaces separate tokens (tabs and other whitespace are literal)
//! - `'...'` and `"..."` group text containing spaces; a quote only opens at
//!   the start of a token and only the matching delimiter closes it
//! - `\x` appends `x` literally, whatever it is
//! - inline markup (`<font ...>text</font>`) produced by the chat client is
//!   copied into the current token verbatim, so quotes, spaces and
//!   backslashes inside it are never interpreted

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    /// Everything after a `<` up to and including the first close tag.
    static ref MARKUP_SPAN: Regex = Regex::new(r"^.*?</.*?>").expect("Invalid Regex");
    /// A leading open tag, a trailing close tag, or a `</a><b>` seam.
    static ref OUTER_MARKUP: Regex =
        Regex::new(r"^<[^>]+>|</[^>]+><[^/][^>]*>|</[^>]+>$").expect("Invalid Regex");
}

/// Reasons a command string cannot be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A `<` with no close tag after it.
    #[error("HTML parsing failure")]
    Markup,
    /// The input ends with a lone backslash.
    #[error("Unexpected end of line")]
    UnexpectedEndOfLine,
    /// A quoted token was never closed.
    #[error("Expected {0}")]
    UnterminatedQuote(char),
}

/// Split `input` into tokens.
///
/// Empty or all-space input yields an empty vector. Empty quoted strings
/// (`''`) do not produce a token.
pub fn tokenize(input: &str) -> Result<Vec<String>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut pos = 0;

    while let Some(ch) = input[pos..].chars().next() {
        pos += ch.len_utf8();

        match ch {
            '<' => {
                let span = MARKUP_SPAN
                    .find(&input[pos..])
                    .ok_or(SyntaxError::Markup)?;
                current.push('<');
                current.push_str(span.as_str());
                pos += span.end();
            }
            '\\' => {
                let escaped = input[pos..]
                    .chars()
                    .next()
                    .ok_or(SyntaxError::UnexpectedEndOfLine)?;
                current.push(escaped);
                pos += escaped.len_utf8();
            }
            '\'' | '"' => match quote {
                None if current.is_empty() => quote = Some(ch),
                Some(active) if active == ch => quote = None,
                _ => current.push(ch),
            },
            ' ' if quote.is_none() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if let Some(active) = quote {
        return Err(SyntaxError::UnterminatedQuote(active));
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Remove the rich-text framing the client wraps around chat input.
///
/// Strips a leading open tag, a trailing close tag, and every `</x><y>` pair
/// where one markup run ends and the next begins. Inner content is untouched.
pub fn strip_outer_markup(input: &str) -> Cow<'_, str> {
    OUTER_MARKUP.replace_all(input, "")
}

/// Quote a token so that [`tokenize`] reads it back as a single token.
///
/// Only tokens containing a space are quoted.
pub fn quote_token(token: &str) -> Cow<'_, str> {
    if token.contains(' ') {
        Cow::Owned(format!("\"{token}\""))
    } else {
        Cow::Borrowed(token)
    }
}

/// Join tokens back into a command string, quoting where needed.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote_token(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
