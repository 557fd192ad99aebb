//! Parser for the grid's filter expression language.
//!
//! ```text
//! expr  := term (('~and~' | '~or~') term)*
//! term  := '(' expr ')' | member '~' operator ['~' value]
//! value := 'quoted' | number | true | false | null | datetime'YYYY-MM-DDTHH:MM:SS'
//! ```
//!
//! `and`/`or` at the same nesting level combine left to right, so
//! `a~and~b~or~c` reads as `(a and b) or c`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::query_parser::GridParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterLogic {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    IsEqualTo,
    IsNotEqualTo,
    IsLessThan,
    IsLessThanOrEqualTo,
    IsGreaterThan,
    IsGreaterThanOrEqualTo,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
}

impl FilterOperator {
    fn parse(token: &str) -> Option<Self> {
        Some(match token.to_ascii_lowercase().as_str() {
            "eq" => Self::IsEqualTo,
            "neq" | "ne" => Self::IsNotEqualTo,
            "lt" => Self::IsLessThan,
            "lte" | "le" => Self::IsLessThanOrEqualTo,
            "gt" => Self::IsGreaterThan,
            "gte" | "ge" => Self::IsGreaterThanOrEqualTo,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "contains" => Self::Contains,
            "doesnotcontain" => Self::DoesNotContain,
            "isnull" => Self::IsNull,
            "isnotnull" => Self::IsNotNull,
            "isempty" => Self::IsEmpty,
            "isnotempty" => Self::IsNotEmpty,
            _ => return None,
        })
    }

    /// Operators that carry no value term.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::IsEmpty | Self::IsNotEmpty
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescriptor {
    pub member: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Descriptor(FilterDescriptor),
    Composite {
        logic: FilterLogic,
        filters: Vec<FilterNode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
    Quoted(String),
    DateTime(String),
}

struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn error(position: usize, message: impl Into<String>) -> GridParseError {
        GridParseError::InvalidFilter {
            position,
            message: message.into(),
        }
    }

    fn quoted(&mut self, start: usize) -> Result<String, GridParseError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\'')) => {
                    if matches!(self.chars.peek(), Some((_, '\''))) {
                        self.chars.next();
                        text.push('\'');
                    } else {
                        return Ok(text);
                    }
                }
                Some((_, c)) => text.push(c),
                None => return Err(Self::error(start, "unterminated string literal")),
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, GridParseError> {
        let mut tokens = Vec::new();
        while let Some(&(position, c)) = self.chars.peek() {
            match c {
                '~' => {
                    self.chars.next();
                }
                '(' => {
                    self.chars.next();
                    tokens.push((position, Token::Open));
                }
                ')' => {
                    self.chars.next();
                    tokens.push((position, Token::Close));
                }
                '\'' => {
                    self.chars.next();
                    tokens.push((position, Token::Quoted(self.quoted(position)?)));
                }
                _ => {
                    let mut end = self.input.len();
                    while let Some(&(i, c)) = self.chars.peek() {
                        if matches!(c, '~' | '(' | ')' | '\'') {
                            end = i;
                            break;
                        }
                        self.chars.next();
                    }
                    let word = self.input[position..end].trim();
                    if word.eq_ignore_ascii_case("datetime")
                        && matches!(self.chars.peek(), Some((_, '\'')))
                    {
                        self.chars.next();
                        tokens.push((position, Token::DateTime(self.quoted(position)?)));
                    } else if !word.is_empty() {
                        tokens.push((position, Token::Word(word.to_string())));
                    }
                }
            }
        }
        Ok(tokens)
    }
}

/// Deepest parenthesis nesting a filter may use.
pub const MAX_FILTER_DEPTH: usize = 32;

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.cursor).map_or(self.end, |(p, _)| *p)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(_, token)| token.clone());
        self.cursor += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> GridParseError {
        Lexer::error(self.position(), message)
    }

    fn logic(&self) -> Option<FilterLogic> {
        match self.peek() {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("and") => Some(FilterLogic::And),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("or") => Some(FilterLogic::Or),
            _ => None,
        }
    }

    fn expression(&mut self) -> Result<FilterNode, GridParseError> {
        let mut node = self.term()?;
        while let Some(logic) = self.logic() {
            self.cursor += 1;
            let rhs = self.term()?;
            node = match node {
                FilterNode::Composite {
                    logic: current,
                    mut filters,
                } if current == logic => {
                    filters.push(rhs);
                    FilterNode::Composite { logic, filters }
                }
                lhs => FilterNode::Composite {
                    logic,
                    filters: vec![lhs, rhs],
                },
            };
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<FilterNode, GridParseError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Open) => {
                if self.depth >= MAX_FILTER_DEPTH {
                    return Err(Lexer::error(
                        position,
                        format!("filter nesting exceeds {MAX_FILTER_DEPTH} levels"),
                    ));
                }
                self.depth += 1;
                let node = self.expression()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::Close) => Ok(node),
                    _ => Err(Lexer::error(position, "unbalanced parenthesis")),
                }
            }
            Some(Token::Word(member)) => self.descriptor(member),
            Some(_) => Err(Lexer::error(position, "expected a member name")),
            None => Err(self.error("unexpected end of filter")),
        }
    }

    fn descriptor(&mut self, member: String) -> Result<FilterNode, GridParseError> {
        let operator = match self.advance() {
            Some(Token::Word(op)) => {
                FilterOperator::parse(&op).ok_or(GridParseError::UnknownFilterOperator(op))?
            }
            _ => return Err(self.error(format!("expected an operator after '{member}'"))),
        };
        let value = if operator.is_unary() {
            FilterValue::Null
        } else {
            self.value()?
        };
        Ok(FilterNode::Descriptor(FilterDescriptor {
            member,
            operator,
            value,
        }))
    }

    fn value(&mut self) -> Result<FilterValue, GridParseError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Quoted(text)) => Ok(FilterValue::String(text)),
            Some(Token::DateTime(text)) => parse_datetime(&text)
                .map(FilterValue::DateTime)
                .ok_or_else(|| Lexer::error(position, format!("invalid datetime '{text}'"))),
            Some(Token::Word(word)) => parse_word(&word)
                .ok_or_else(|| Lexer::error(position, format!("invalid value '{word}'"))),
            _ => Err(Lexer::error(position, "expected a value")),
        }
    }
}

fn parse_word(word: &str) -> Option<FilterValue> {
    if word.eq_ignore_ascii_case("null") {
        Some(FilterValue::Null)
    } else if word.eq_ignore_ascii_case("true") {
        Some(FilterValue::Bool(true))
    } else if word.eq_ignore_ascii_case("false") {
        Some(FilterValue::Bool(false))
    } else if let Ok(integer) = word.parse::<i64>() {
        Some(FilterValue::Integer(integer))
    } else {
        word.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(FilterValue::Float)
    }
}

pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    // The grid writes `datetime'2024-05-01T13-45-00'` literals with dashes in the time
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H-%M-%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parse a filter expression.
///
/// # Errors
/// Returns [`GridParseError`] for malformed expressions and unknown operators.
pub fn parse_filter(input: &str) -> Result<FilterNode, GridParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: input.len(),
        depth: 0,
    };
    let node = parser.expression()?;
    if parser.peek().is_some() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(node)
}
