//! Parser for the fielded query dialect.
//!
//! Grammar (keywords are upper case):
//!
//! ```text
//! query   := or
//! or      := and ("OR" and)*
//! and     := unary (["AND"] unary)*        adjacent terms are ANDed
//! unary   := "NOT" unary | primary
//! primary := "(" or ")" | field ":" value | value
//! value   := '"' phrase '"' | word | word "*"
//! ```
//!
//! Terms without a field search the default `text` field.

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    error::{Error as NomError, ErrorKind},
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult,
};

use super::error::{SearchError, SearchResult};

/// Field searched by terms that do not name one.
pub const DEFAULT_FIELD: &str = "text";

/// Deepest nesting of groups and negations a query may use.
pub const MAX_NESTING: usize = 64;

const KEYWORDS: &[&str] = &["AND", "OR", "NOT"];

/// Parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Matches nothing; produced by an empty query string.
    Empty,
    Term {
        field: String,
        text: String,
    },
    Prefix {
        field: String,
        prefix: String,
    },
    Phrase {
        field: String,
        words: Vec<String>,
    },
    And(Vec<SearchQuery>),
    Or(Vec<SearchQuery>),
    Not(Box<SearchQuery>),
}

/// Parses a query string.
pub fn parse_query(input: &str) -> SearchResult<SearchQuery> {
    if input.trim().is_empty() {
        return Ok(SearchQuery::Empty);
    }
    check_nesting(input)?;
    match all_consuming(terminated(or_expr, multispace0))(input) {
        Ok((_, query)) => Ok(query),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SearchError::BadQuery {
            message: describe(e.input),
            position: Some(input.len() - e.input.len()),
        }),
        Err(nom::Err::Incomplete(_)) => Err(SearchError::BadQuery {
            message: "incomplete query".to_string(),
            position: None,
        }),
    }
}

/// Rejects queries whose groups and negations nest deeper than
/// [`MAX_NESTING`]. The parser recurses once per level.
fn check_nesting(input: &str) -> SearchResult<()> {
    // Unresolved NOTs per open group; the outermost entry is the query itself.
    let mut pending: Vec<usize> = vec![0];
    let mut chars = input.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            '(' => pending.push(0),
            ')' => {
                if pending.len() > 1 {
                    pending.pop();
                }
                // The closed group is the operand of the NOTs before it.
                if let Some(top) = pending.last_mut() {
                    *top = 0;
                }
            }
            '"' => {
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
                if let Some(top) = pending.last_mut() {
                    *top = 0;
                }
            }
            c if is_word_char(c) => {
                let mut end = pos + c.len_utf8();
                while let Some(&(next, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    end = next + c.len_utf8();
                    chars.next();
                }
                if let Some(top) = pending.last_mut() {
                    match &input[pos..end] {
                        "NOT" => *top += 1,
                        "AND" | "OR" => {}
                        _ => *top = 0,
                    }
                }
            }
            _ => {}
        }
        let depth = pending.len() - 1 + pending.iter().sum::<usize>();
        if depth > MAX_NESTING {
            return Err(SearchError::BadQuery {
                message: format!("query nests deeper than {MAX_NESTING} levels"),
                position: Some(pos),
            });
        }
    }
    Ok(())
}

fn describe(rest: &str) -> String {
    match rest.trim_start().chars().next() {
        None => "unexpected end of query".to_string(),
        Some(c) => format!("unexpected '{c}'"),
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | ':' | '"')
}

/// Parse a bare word, skipping leading whitespace
fn word(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, take_while1(is_word_char))(input)
}

/// Parse a word that is not a keyword
fn plain_word(input: &str) -> IResult<&str, &str> {
    let (rest, w) = word(input)?;
    if KEYWORDS.contains(&w) {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag)));
    }
    Ok((rest, w))
}

/// Parse the given keyword as a whole word
fn keyword<'a>(kw: &str, input: &'a str) -> IResult<&'a str, &'a str> {
    let (rest, w) = word(input)?;
    if w == kw {
        Ok((rest, w))
    } else {
        Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag)))
    }
}

fn kw_and(input: &str) -> IResult<&str, &str> {
    keyword("AND", input)
}

fn kw_or(input: &str) -> IResult<&str, &str> {
    keyword("OR", input)
}

fn kw_not(input: &str) -> IResult<&str, &str> {
    keyword("NOT", input)
}

enum Value<'a> {
    Word(&'a str),
    Phrase(&'a str),
}

/// Parse a quoted phrase
fn phrase(input: &str) -> IResult<&str, &str> {
    preceded(
        multispace0,
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
    )(input)
}

fn value(input: &str) -> IResult<&str, Value<'_>> {
    alt((map(phrase, Value::Phrase), map(plain_word, Value::Word)))(input)
}

fn leaf(field: &str, value: Value<'_>) -> SearchQuery {
    let field = field.to_string();
    match value {
        Value::Phrase(text) => SearchQuery::Phrase {
            field,
            words: text.split_whitespace().map(str::to_lowercase).collect(),
        },
        Value::Word(w) => match w.strip_suffix('*') {
            Some(prefix) if !prefix.is_empty() => SearchQuery::Prefix {
                field,
                prefix: prefix.to_lowercase(),
            },
            _ => SearchQuery::Term {
                field,
                text: w.to_lowercase(),
            },
        },
    }
}

fn group(input: &str) -> IResult<&str, SearchQuery> {
    delimited(
        preceded(multispace0, char('(')),
        or_expr,
        preceded(multispace0, char(')')),
    )(input)
}

fn field_term(input: &str) -> IResult<&str, SearchQuery> {
    map(
        separated_pair(plain_word, char(':'), value),
        |(field, v)| leaf(field, v),
    )(input)
}

fn bare_term(input: &str) -> IResult<&str, SearchQuery> {
    map(value, |v| leaf(DEFAULT_FIELD, v))(input)
}

fn primary(input: &str) -> IResult<&str, SearchQuery> {
    alt((group, field_term, bare_term))(input)
}

fn unary(input: &str) -> IResult<&str, SearchQuery> {
    alt((
        map(preceded(kw_not, unary), |q| {
            SearchQuery::Not(Box::new(q))
        }),
        primary,
    ))(input)
}

fn and_expr(input: &str) -> IResult<&str, SearchQuery> {
    let (mut input, first) = unary(input)?;
    let mut parts = vec![first];
    loop {
        let (after_keyword, explicit) = match kw_and(input) {
            Ok((rest, _)) => (rest, true),
            Err(nom::Err::Error(_)) => (input, false),
            Err(e) => return Err(e),
        };
        match unary(after_keyword) {
            Ok((rest, q)) => {
                parts.push(q);
                input = rest;
            }
            // A dangling AND is an error; anything else ends the conjunction.
            Err(nom::Err::Error(e)) if explicit => return Err(nom::Err::Failure(e)),
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, collapse(parts, SearchQuery::And)))
}

fn or_expr(input: &str) -> IResult<&str, SearchQuery> {
    map(separated_list1(kw_or, and_expr), |parts| {
        collapse(parts, SearchQuery::Or)
    })(input)
}

fn collapse(mut parts: Vec<SearchQuery>, wrap: fn(Vec<SearchQuery>) -> SearchQuery) -> SearchQuery {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        wrap(parts)
    }
}
