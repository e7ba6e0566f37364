//! A `nom`-based grammar over the token stream, producing a [`Query`].
//!
//! The lexer has already settled quoting and bracket modes, so every parser
//! here consumes whole [`Token`]s. An error keeps the tokens it stopped at,
//! which is where [`PathError::Syntax`] takes its offset from.

use crate::ast::*;
use crate::error::PathError;
use crate::lexer::{Token, TokenKind, tokenize};
use nom::{
    IResult, Input, Needed, Parser,
    branch::alt,
    combinator::{cut, map, opt, peek},
    error::{ErrorKind, ParseError},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use std::iter::Enumerate;
use std::slice::Iter;

// --- Main Public Parsers ---

pub fn parse_query(input: &str) -> Result<Query, PathError> {
    let tokens = tokenize(input)?;
    let parsed = terminated(query, expect(TokenKind::Eof, "a path step")).parse(Tokens::new(&tokens));
    let query = finish(input, parsed)?;
    log::trace!("Parsed path '{}' into {} step(s)", input, query.steps.len());
    Ok(query)
}

/// Parses a standalone filter expression (the text between `[?(` and `)]`).
pub fn parse_filter(input: &str) -> Result<Expr, PathError> {
    let wrapped = format!("[?({})]", input);
    let tokens = tokenize(&wrapped)?;
    let parsed = delimited(
        (
            token(TokenKind::LBracket),
            token(TokenKind::Question),
            token(TokenKind::LParen),
        ),
        or_expr,
        (
            expect(TokenKind::RParen, "')'"),
            expect(TokenKind::RBracket, "']'"),
            expect(TokenKind::Eof, "end of expression"),
        ),
    )
    .parse(Tokens::new(&tokens));
    finish(&wrapped, parsed)
}

fn finish<O>(source: &str, result: PResult<'_, O>) -> Result<O, PathError> {
    match result {
        Ok((_, output)) => Ok(output),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.into_path_error(source)),
        Err(nom::Err::Incomplete(_)) => Err(PathError::syntax(
            source,
            source.len(),
            "unexpected end of input",
        )),
    }
}

// --- Token Input ---

/// The token stream as a `nom` input. It always ends with an `Eof` token.
#[derive(Debug, Clone, Copy)]
struct Tokens<'t> {
    tokens: &'t [Token],
}

impl<'t> Tokens<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens }
    }

    fn first(&self) -> Option<&'t Token> {
        self.tokens.first()
    }

    fn starts_with(&self, kind: TokenKind) -> bool {
        self.first().is_some_and(|t| t.kind == kind)
    }
}

impl<'t> Input for Tokens<'t> {
    type Item = &'t Token;
    type Iter = Iter<'t, Token>;
    type IterIndices = Enumerate<Iter<'t, Token>>;

    fn input_len(&self) -> usize {
        self.tokens.len()
    }

    fn take(&self, index: usize) -> Self {
        Self::new(&self.tokens[..index])
    }

    fn take_from(&self, index: usize) -> Self {
        Self::new(&self.tokens[index..])
    }

    fn take_split(&self, index: usize) -> (Self, Self) {
        let (prefix, suffix) = self.tokens.split_at(index);
        (Self::new(suffix), Self::new(prefix))
    }

    fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(Self::Item) -> bool,
    {
        self.tokens.iter().position(|t| predicate(t))
    }

    fn iter_elements(&self) -> Self::Iter {
        self.tokens.iter()
    }

    fn iter_indices(&self) -> Self::IterIndices {
        self.tokens.iter().enumerate()
    }

    fn slice_index(&self, count: usize) -> Result<usize, Needed> {
        if self.tokens.len() >= count {
            Ok(count)
        } else {
            Err(Needed::new(count - self.tokens.len()))
        }
    }
}

// --- Errors ---

#[derive(Debug)]
enum Reason {
    Expected(&'static str),
    Invalid(String),
}

/// Where the grammar gave up, and why.
#[derive(Debug)]
struct SyntaxError<'t> {
    at: Tokens<'t>,
    reason: Reason,
}

impl<'t> SyntaxError<'t> {
    fn expected(at: Tokens<'t>, what: &'static str) -> Self {
        Self {
            at,
            reason: Reason::Expected(what),
        }
    }

    fn invalid(at: Tokens<'t>, message: String) -> Self {
        Self {
            at,
            reason: Reason::Invalid(message),
        }
    }

    fn into_path_error(self, source: &str) -> PathError {
        let token = self.at.first();
        let position = token.map_or(source.len(), |t| t.position);
        let message = match self.reason {
            Reason::Expected(what) => {
                let found = match token {
                    Some(t) if t.kind != TokenKind::Eof => format!("'{}'", t.text),
                    _ => "end of input".to_string(),
                };
                format!("expected {}, found {}", what, found)
            }
            Reason::Invalid(message) => message,
        };
        PathError::syntax(source, position, message)
    }
}

impl<'t> ParseError<Tokens<'t>> for SyntaxError<'t> {
    fn from_error_kind(input: Tokens<'t>, _kind: ErrorKind) -> Self {
        Self::expected(input, "a valid path")
    }

    fn append(_: Tokens<'t>, _: ErrorKind, other: Self) -> Self {
        other
    }

    /// Keeps the branch that got further; on a tie the later branch wins.
    fn or(self, other: Self) -> Self {
        if self.at.input_len() < other.at.input_len() {
            self
        } else {
            other
        }
    }
}

type PResult<'t, O> = IResult<Tokens<'t>, O, SyntaxError<'t>>;

// --- Token Primitives ---

fn token<'t>(kind: TokenKind) -> impl Fn(Tokens<'t>) -> PResult<'t, &'t Token> {
    expect(kind, kind.describe())
}

fn expect<'t>(kind: TokenKind, what: &'static str) -> impl Fn(Tokens<'t>) -> PResult<'t, &'t Token> {
    move |input: Tokens<'t>| match input.first() {
        Some(t) if t.kind == kind => Ok((input.take_from(1), t)),
        _ => Err(nom::Err::Error(SyntaxError::expected(input, what))),
    }
}

/// Always fails; the last branch of an `alt` that names what was wanted.
fn fail_expected<'t, O>(what: &'static str) -> impl Fn(Tokens<'t>) -> PResult<'t, O> {
    move |input: Tokens<'t>| Err(nom::Err::Error(SyntaxError::expected(input, what)))
}

fn name_token(input: Tokens<'_>) -> PResult<'_, String> {
    map(alt((token(TokenKind::Name), token(TokenKind::String))), |t| {
        t.text.clone()
    })
    .parse(input)
}

fn expect_name<'t>(what: &'static str) -> impl Fn(Tokens<'t>) -> PResult<'t, String> {
    move |input: Tokens<'t>| alt((name_token, fail_expected(what))).parse(input)
}

fn integer(input: Tokens<'_>) -> PResult<'_, i64> {
    let (rest, t) = token(TokenKind::Number).parse(input)?;
    match t.text.parse::<i64>() {
        Ok(i) => Ok((rest, i)),
        Err(_) => Err(nom::Err::Failure(SyntaxError::invalid(
            input,
            format!("invalid numeric literal '{}': expected an integer", t.text),
        ))),
    }
}

// --- Path Parsers ---

/// What a bracket turned out to hold.
enum Bracket {
    Index(i64),
    Slice { start: Option<i64>, end: Option<i64> },
    Wildcard,
    Field(String),
    Filter(Expr),
}

fn query(input: Tokens<'_>) -> PResult<'_, Query> {
    let (input, _) = opt(token(TokenKind::Dollar)).parse(input)?;
    // An optional leading separator; `//` and `..` are steps in their own right.
    let (input, _) = opt(separator).parse(input)?;
    let (input, groups) = many0(terminated(step_group, cut(step_end))).parse(input)?;
    Ok((
        input,
        Query {
            steps: groups.into_iter().flatten().collect(),
        },
    ))
}

fn separator(input: Tokens<'_>) -> PResult<'_, &Token> {
    alt((token(TokenKind::Slash), token(TokenKind::Dot))).parse(input)
}

/// A separator, the start of a `//` or `..` step, or the end of the path.
fn step_end(input: Tokens<'_>) -> PResult<'_, ()> {
    alt((
        map(separator, |_| ()),
        map(
            peek(alt((
                token(TokenKind::DoubleSlash),
                token(TokenKind::DoubleDot),
                token(TokenKind::Eof),
            ))),
            |_| (),
        ),
        fail_expected("'/' or '.'"),
    ))
    .parse(input)
}

/// A step and the brackets after it. Index, slice and filter brackets become
/// predicates of the step; `[*]` and `['name']` open a step of their own.
fn step_group(input: Tokens<'_>) -> PResult<'_, Vec<Step>> {
    let (input, first) = step(input)?;
    let (input, brackets) = many0(bracket).parse(input)?;

    let mut steps = vec![first];
    for bracket in brackets {
        let predicate = match bracket {
            Bracket::Index(i) => Predicate::Index(i),
            Bracket::Slice { start, end } => Predicate::Slice { start, end },
            Bracket::Filter(expr) => Predicate::Filter(expr),
            Bracket::Wildcard => {
                steps.push(Step::new(Selector::Wildcard));
                continue;
            }
            Bracket::Field(name) => {
                steps.push(Step::new(Selector::Field(name)));
                continue;
            }
        };
        if let Some(last) = steps.last_mut() {
            last.predicates.push(predicate);
        }
    }
    Ok((input, steps))
}

fn step(input: Tokens<'_>) -> PResult<'_, Step> {
    alt((
        map(name_token, |name| Step::new(Selector::Field(name))),
        map(token(TokenKind::Star), |_| Step::new(Selector::Wildcard)),
        map(
            preceded(
                token(TokenKind::DoubleSlash),
                cut(expect_name("a field name after '//'")),
            ),
            |name| Step::new(Selector::Recursive(name)),
        ),
        preceded(token(TokenKind::DoubleDot), cut(after_double_dot)),
        map(bracket, leading_bracket),
    ))
    .parse(input)
}

/// `..name` descends; a bare `..` before `/` or the end is the parent step.
fn after_double_dot(input: Tokens<'_>) -> PResult<'_, Step> {
    alt((
        map(name_token, |name| Step::new(Selector::Recursive(name))),
        map(
            peek(alt((token(TokenKind::Slash), token(TokenKind::Eof)))),
            |_| Step::new(Selector::Parent),
        ),
        fail_expected("a field name after '..'"),
    ))
    .parse(input)
}

/// A bracket that starts a step selects from the previous step's result.
fn leading_bracket(bracket: Bracket) -> Step {
    let selector = match bracket {
        Bracket::Index(i) => Selector::Index(i),
        Bracket::Slice { start, end } => Selector::Slice { start, end },
        Bracket::Wildcard => Selector::Wildcard,
        Bracket::Field(name) => Selector::Field(name),
        Bracket::Filter(expr) => {
            return Step {
                selector: Selector::Current,
                predicates: vec![Predicate::Filter(expr)],
            };
        }
    };
    Step::new(selector)
}

fn bracket(input: Tokens<'_>) -> PResult<'_, Bracket> {
    preceded(
        token(TokenKind::LBracket),
        cut(terminated(bracket_body, expect(TokenKind::RBracket, "']'"))),
    )
    .parse(input)
}

fn bracket_body(input: Tokens<'_>) -> PResult<'_, Bracket> {
    alt((
        map(
            preceded(
                token(TokenKind::Question),
                cut(delimited(
                    expect(TokenKind::LParen, "'(' after '?'"),
                    or_expr,
                    expect(TokenKind::RParen, "')' to close the filter"),
                )),
            ),
            Bracket::Filter,
        ),
        map(token(TokenKind::Star), |_| Bracket::Wildcard),
        map(token(TokenKind::String), |t| Bracket::Field(t.text.clone())),
        index_or_slice,
        fail_expected("an index, slice, '*', name or filter"),
    ))
    .parse(input)
}

fn index_or_slice(input: Tokens<'_>) -> PResult<'_, Bracket> {
    let (rest, start) = opt(integer).parse(input)?;
    let (rest, colon) = opt(token(TokenKind::Colon)).parse(rest)?;
    if colon.is_none() {
        return match start {
            Some(i) => Ok((rest, Bracket::Index(i))),
            None => Err(nom::Err::Error(SyntaxError::expected(input, "an index"))),
        };
    }

    let (rest, end) = opt(integer).parse(rest)?;
    if rest.starts_with(TokenKind::Colon) {
        return Err(nom::Err::Failure(SyntaxError::invalid(
            rest,
            "slice accepts at most one ':'".to_string(),
        )));
    }
    Ok((rest, Bracket::Slice { start, end }))
}

// --- Filter Expression Parsers (in order of precedence) ---

fn build_binary_expr_parser<'t, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(Tokens<'t>) -> PResult<'t, Expr>
where
    F: Parser<Tokens<'t>, Output = Expr, Error = SyntaxError<'t>> + Clone,
    G: Parser<Tokens<'t>, Output = BinaryOperator, Error = SyntaxError<'t>> + Clone,
{
    move |input: Tokens<'t>| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) =
            many0(pair(op_parser.clone(), cut(sub_expr_parser.clone()))).parse(input)?;

        for (op, right) in remainder {
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok((input, left))
    }
}

fn or_op(input: Tokens<'_>) -> PResult<'_, BinaryOperator> {
    map(token(TokenKind::Or), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: Tokens<'_>) -> PResult<'_, BinaryOperator> {
    map(token(TokenKind::And), |_| BinaryOperator::And).parse(input)
}

fn comparison_op(input: Tokens<'_>) -> PResult<'_, BinaryOperator> {
    alt((
        map(token(TokenKind::EqEq), |_| BinaryOperator::Equals),
        map(token(TokenKind::NotEq), |_| BinaryOperator::NotEquals),
        map(token(TokenKind::LtEq), |_| BinaryOperator::LessThanOrEqual),
        map(token(TokenKind::GtEq), |_| BinaryOperator::GreaterThanOrEqual),
        map(token(TokenKind::Lt), |_| BinaryOperator::LessThan),
        map(token(TokenKind::Gt), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn or_expr(input: Tokens<'_>) -> PResult<'_, Expr> {
    build_binary_expr_parser(and_expr, or_op)(input)
}

fn and_expr(input: Tokens<'_>) -> PResult<'_, Expr> {
    build_binary_expr_parser(unary_expr, and_op)(input)
}

fn unary_expr(input: Tokens<'_>) -> PResult<'_, Expr> {
    alt((
        map(preceded(token(TokenKind::Not), cut(unary_expr)), |operand| {
            Expr::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            }
        }),
        preceded(
            token(TokenKind::LParen),
            cut(terminated(or_expr, expect(TokenKind::RParen, "')'"))),
        ),
        comparison,
    ))
    .parse(input)
}

/// Comparisons are leaves: `a < b < c` does not parse.
fn comparison(input: Tokens<'_>) -> PResult<'_, Expr> {
    let (input, left) = operand(input)?;
    let (input, rest) = opt(pair(comparison_op, cut(operand))).parse(input)?;
    let expr = match rest {
        Some((op, right)) => Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        None => left,
    };
    Ok((input, expr))
}

fn operand(input: Tokens<'_>) -> PResult<'_, Expr> {
    alt((
        map(literal, Expr::Literal),
        field_ref,
        function_call,
        fail_expected("a literal, '@' reference or function call"),
    ))
    .parse(input)
}

// --- Operand Parsers ---

fn literal(input: Tokens<'_>) -> PResult<'_, Literal> {
    alt((
        map(token(TokenKind::Null), |_| Literal::Null),
        map(token(TokenKind::True), |_| Literal::Bool(true)),
        map(token(TokenKind::False), |_| Literal::Bool(false)),
        map(token(TokenKind::String), |t| Literal::String(t.text.clone())),
        number,
    ))
    .parse(input)
}

fn number(input: Tokens<'_>) -> PResult<'_, Literal> {
    let (rest, t) = token(TokenKind::Number).parse(input)?;
    match t.text.parse::<f64>() {
        Ok(n) => Ok((rest, Literal::Number(n))),
        Err(_) => Err(nom::Err::Failure(SyntaxError::invalid(
            input,
            format!("invalid numeric literal '{}'", t.text),
        ))),
    }
}

fn field_ref(input: Tokens<'_>) -> PResult<'_, Expr> {
    map(
        preceded(token(TokenKind::At), many0(ref_segment)),
        Expr::FieldRef,
    )
    .parse(input)
}

fn ref_segment(input: Tokens<'_>) -> PResult<'_, PathSegment> {
    alt((
        map(
            preceded(
                token(TokenKind::Dot),
                cut(expect_name("a field name after '.'")),
            ),
            PathSegment::Key,
        ),
        preceded(
            token(TokenKind::LBracket),
            cut(terminated(
                alt((
                    map(token(TokenKind::String), |t| PathSegment::Key(t.text.clone())),
                    map(integer, PathSegment::Index),
                    fail_expected("an index or quoted name"),
                )),
                expect(TokenKind::RBracket, "']'"),
            )),
        ),
    ))
    .parse(input)
}

fn function_call(input: Tokens<'_>) -> PResult<'_, Expr> {
    let (input, name) = terminated(token(TokenKind::Name), token(TokenKind::LParen)).parse(input)?;
    let (input, args) = cut(terminated(
        separated_list0(token(TokenKind::Comma), operand),
        expect(TokenKind::RParen, "')' to close the arguments"),
    ))
    .parse(input)?;
    Ok((
        input,
        Expr::Call {
            name: name.text.clone(),
            args,
        },
    ))
}
