//! A `nom`-based tokenizer for path expressions.
//!
//! The lexer runs in two modes. Outside brackets it recognizes step
//! separators and field names; inside any bracket it recognizes the filter
//! vocabulary (literals, operators, `@` references). Bracket depth is tracked
//! across nested brackets, and quoted strings are consumed whole so a `]`
//! inside a string literal never closes a bracket.

use crate::error::PathError;
use nom::{
    IResult, Input, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{eof, map, opt, peek, recognize},
    error::{Error as NomError, ErrorKind},
    sequence::{pair, terminated},
};
use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Path punctuation
    Dollar,
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    LBracket,
    RBracket,
    Star,
    // Filter punctuation
    LParen,
    RParen,
    Colon,
    Comma,
    Question,
    At,
    // Operators
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    // Literals and names
    Name,
    String,
    Number,
    True,
    False,
    Null,
    Eof,
}

impl TokenKind {
    /// How the token reads in a syntax error.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Dollar => "'$'",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::Dot => "'.'",
            TokenKind::DoubleDot => "'..'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Star => "'*'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Question => "'?'",
            TokenKind::At => "'@'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::And => "'&&'",
            TokenKind::Or => "'||'",
            TokenKind::Not => "'!'",
            TokenKind::Name => "a name",
            TokenKind::String => "a quoted string",
            TokenKind::Number => "a number",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Null => "'null'",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A lexical token. `text` holds the unescaped content for strings and the
/// source text for everything else; `position` is the byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

// --- Main Public Tokenizer ---

pub fn tokenize(path: &str) -> Result<Vec<Token>, PathError> {
    let mut input = Span::new(path);
    let mut tokens = Vec::new();
    let mut depth = 0usize;

    input = skip_whitespace(input);
    if let Ok((rest, marker)) = root_marker(input) {
        tokens.push(Token::new(TokenKind::Dollar, "$", marker.location_offset()));
        input = rest;
    }

    loop {
        input = skip_whitespace(input);
        if input.fragment().is_empty() {
            break;
        }

        let parsed = if depth == 0 {
            path_token(input)
        } else {
            filter_token(input)
        };
        let (rest, token) = parsed.map_err(|_| unexpected(path, input))?;

        match token.kind {
            TokenKind::LBracket => depth += 1,
            TokenKind::RBracket => depth -= 1,
            TokenKind::Number => check_number_boundary(path, &token, rest)?,
            _ => {}
        }
        tokens.push(token);
        input = rest;
    }

    if depth > 0 {
        return Err(PathError::syntax(path, path.len(), "unmatched '['"));
    }
    tokens.push(Token::new(TokenKind::Eof, "", path.len()));
    Ok(tokens)
}

// --- Error Classification ---

fn unexpected(path: &str, at: Span<'_>) -> PathError {
    let message = match at.fragment().chars().next() {
        Some('\'' | '"') => "unterminated string literal".to_string(),
        Some(']') => "unmatched ']'".to_string(),
        Some('-') => "invalid numeric literal".to_string(),
        Some(c) => format!("unexpected character '{}'", c),
        None => "unexpected end of input".to_string(),
    };
    PathError::syntax(path, at.location_offset(), message)
}

/// A number must not run straight into a name character or a second dot
/// (`12ab`, `1.`, `1.2.3`).
fn check_number_boundary(path: &str, token: &Token, rest: Span<'_>) -> Result<(), PathError> {
    match rest.fragment().chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => Err(PathError::syntax(
            path,
            token.position,
            format!("invalid numeric literal '{}{}'", token.text, c),
        )),
        _ => Ok(()),
    }
}

// --- Combinators ---

fn skip_whitespace(input: Span<'_>) -> Span<'_> {
    let result: IResult<Span<'_>, Span<'_>> = multispace0(input);
    result.map_or(input, |(rest, _)| rest)
}

fn punct<'a>(
    kind: TokenKind,
    symbol: &'static str,
) -> impl Parser<Span<'a>, Output = Token, Error = NomError<Span<'a>>> {
    map(tag(symbol), move |s: Span<'a>| {
        Token::new(kind, *s.fragment(), s.location_offset())
    })
}

/// `$` is only a root marker at the very start and when followed by a
/// separator, a bracket, or the end of input. Elsewhere it is a name character.
fn root_marker(input: Span<'_>) -> IResult<Span<'_>, Span<'_>> {
    terminated(
        tag("$"),
        peek(alt((eof, tag("/"), tag("."), tag("["), multispace0_nonempty))),
    )
    .parse(input)
}

fn multispace0_nonempty(input: Span<'_>) -> IResult<Span<'_>, Span<'_>> {
    take_while1(|c: char| c.is_whitespace()).parse(input)
}

// --- Path Mode ---

fn path_token(input: Span<'_>) -> IResult<Span<'_>, Token> {
    alt((
        punct(TokenKind::DoubleSlash, "//"),
        punct(TokenKind::Slash, "/"),
        punct(TokenKind::DoubleDot, ".."),
        punct(TokenKind::Dot, "."),
        punct(TokenKind::LBracket, "["),
        punct(TokenKind::Star, "*"),
        quoted,
        bare_name,
    ))
    .parse(input)
}

fn bare_name(input: Span<'_>) -> IResult<Span<'_>, Token> {
    map(
        take_while1(|c: char| {
            !matches!(c, '/' | '.' | '[' | ']' | '\'' | '"' | '*') && !c.is_whitespace()
        }),
        |s: Span<'_>| Token::new(TokenKind::Name, *s.fragment(), s.location_offset()),
    )
    .parse(input)
}

// --- Filter Mode ---

fn filter_token(input: Span<'_>) -> IResult<Span<'_>, Token> {
    alt((operator, punctuation, number, quoted, identifier)).parse(input)
}

fn operator(input: Span<'_>) -> IResult<Span<'_>, Token> {
    alt((
        punct(TokenKind::EqEq, "=="),
        punct(TokenKind::NotEq, "!="),
        punct(TokenKind::LtEq, "<="),
        punct(TokenKind::GtEq, ">="),
        punct(TokenKind::Lt, "<"),
        punct(TokenKind::Gt, ">"),
        punct(TokenKind::And, "&&"),
        punct(TokenKind::Or, "||"),
        punct(TokenKind::Not, "!"),
    ))
    .parse(input)
}

fn punctuation(input: Span<'_>) -> IResult<Span<'_>, Token> {
    alt((
        punct(TokenKind::LBracket, "["),
        punct(TokenKind::RBracket, "]"),
        punct(TokenKind::LParen, "("),
        punct(TokenKind::RParen, ")"),
        punct(TokenKind::Colon, ":"),
        punct(TokenKind::Comma, ","),
        punct(TokenKind::Star, "*"),
        punct(TokenKind::Question, "?"),
        punct(TokenKind::At, "@"),
        punct(TokenKind::Dot, "."),
    ))
    .parse(input)
}

fn number(input: Span<'_>) -> IResult<Span<'_>, Token> {
    map(
        recognize((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        |s: Span<'_>| Token::new(TokenKind::Number, *s.fragment(), s.location_offset()),
    )
    .parse(input)
}

fn identifier(input: Span<'_>) -> IResult<Span<'_>, Token> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
        )),
        |s: Span<'_>| {
            let kind = match *s.fragment() {
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                "null" => TokenKind::Null,
                _ => TokenKind::Name,
            };
            Token::new(kind, *s.fragment(), s.location_offset())
        },
    )
    .parse(input)
}

// --- Shared ---

/// A single- or double-quoted string with backslash escapes.
fn quoted(input: Span<'_>) -> IResult<Span<'_>, Token> {
    let fragment = *input.fragment();
    let mut chars = fragment.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('\'' | '"'))) => c,
        _ => return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char))),
    };

    let mut text = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            text.push(match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            let (rest, matched) = input.take_split(i + c.len_utf8());
            return Ok((
                rest,
                Token::new(TokenKind::String, text, matched.location_offset()),
            ));
        } else {
            text.push(c);
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
}
