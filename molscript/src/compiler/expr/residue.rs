//! 残基说明：`[名字][序列号[-序列号]][:链[:模型]][.原子][%替代位置][/模型]`
//!
//! 每个出现的部分都算数；`*` 与全由 `?` 组成的部分不产生条件。
//! 输出是第一个条件，之后每个条件跟一个 `and`；没有任何条件时输出 `all`。

use super::{Cursor, Rule, lexeme};
use crate::compiler::scanner::{SEQUENCE_WILDCARD, seqcode};
use crate::error::{CompileError, ErrorKind};
use crate::token::{Tok, Token, TokenValue};

/// 能开始一个残基说明的 token
pub(super) fn starts_spec(kind: Tok) -> bool {
    matches!(
        kind,
        Tok::Identifier
            | Tok::Times
            | Tok::Integer
            | Tok::SeqCode
            | Tok::LeftSquare
            | Tok::Colon
            | Tok::Per
            | Tok::Percent
            | Tok::Divide
    )
}

#[derive(Debug, Default)]
struct Spec {
    terms: Vec<Vec<Token>>,
    parts: usize,
}

impl Spec {
    fn term(&mut self, tokens: Vec<Token>) {
        self.terms.push(tokens);
        self.parts += 1;
    }

    fn unspecified(&mut self) {
        self.parts += 1;
    }

    fn into_postfix(self) -> Vec<Token> {
        if self.terms.is_empty() {
            return vec![Token::new(Tok::All)];
        }
        let mut out = Vec::new();
        for (i, term) in self.terms.into_iter().enumerate() {
            out.extend(term);
            if i > 0 {
                out.push(Token::new(Tok::OpAnd));
            }
        }
        out
    }
}

fn is_wildcard(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c == '?')
}

/// 关键字、标识符、数字都可以当作名字用，字符串不行
fn name_text(token: &Token) -> Option<String> {
    (!token.is(Tok::String) && token.text_value().is_some()).then(|| lexeme(token))
}

pub(super) fn residue_spec(cur: Cursor<'_>) -> Rule<'_> {
    let start = cur;
    let mut spec = Spec::default();
    let cur = name(cur, &mut spec)?;
    let cur = sequence(cur, &mut spec)?;
    let cur = chain(cur, &mut spec)?;
    let cur = atom(cur, &mut spec)?;
    let cur = alternate(cur, &mut spec)?;
    let cur = model(cur, &mut spec)?;
    if spec.parts == 0 {
        return Err(start.error(ErrorKind::ResidueSpecificationExpected));
    }
    Ok((spec.into_postfix(), cur))
}

fn name<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    let Some(token) = cur.peek() else {
        return Ok(cur);
    };
    match token.kind() {
        Tok::Times => {
            spec.unspecified();
            Ok(cur.advance())
        }
        Tok::LeftSquare => bracketed_names(cur, spec),
        Tok::Identifier => {
            let text = lexeme(token);
            if !is_wildcard(&text) {
                spec.term(vec![name_token(&text)]);
            }
            Ok(cur.advance())
        }
        _ => Ok(cur),
    }
}

fn name_token(name: &str) -> Token {
    let kind = if name.contains(['*', '?']) {
        Tok::SpecNamePattern
    } else {
        Tok::SpecName
    };
    Token::text(kind, name)
}

/// `[ALA,GLY]`：方括号内的文字拼接后按逗号拆分，各名字之间取 `or`
fn bracketed_names<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    let close = cur
        .matching(Tok::LeftSquare, Tok::RightSquare)
        .ok_or_else(|| cur.at(cur.tokens.len()).error(ErrorKind::EndOfCommandUnexpected))?;
    let text: String = cur.slice(cur.pos + 1, close).iter().map(lexeme).collect();
    let mut names = text.split(',').map(str::trim).filter(|s| !s.is_empty());
    let Some(first) = names.next() else {
        return Err(cur.error(ErrorKind::ResidueSpecificationExpected));
    };
    let mut term = vec![name_token(first)];
    for name in names {
        term.push(name_token(name));
        term.push(Token::new(Tok::OpOr));
    }
    spec.term(term);
    Ok(cur.at(close + 1))
}

/// 序列号编码；超出 `0..=SEQUENCE_WILDCARD` 的整数无法编码
fn sequence_code(cur: Cursor<'_>) -> Result<Option<i32>, CompileError> {
    let Some(token) = cur.peek() else {
        return Ok(None);
    };
    match token.kind() {
        Tok::Integer if (0..=SEQUENCE_WILDCARD).contains(&token.int()) => {
            Ok(Some(seqcode(token.int(), '\0')))
        }
        Tok::Integer => Err(cur.error(ErrorKind::NumberExpected)),
        Tok::SeqCode => Ok(Some(token.int())),
        _ => Ok(None),
    }
}

/// `12`、`12^A`、`10-20`
fn sequence<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    let Some(lo) = sequence_code(cur)? else {
        return Ok(cur);
    };
    let text = cur.peek().map(lexeme).unwrap_or_default();
    let next = cur.advance();
    if next.peek_kind() == Some(Tok::Minus) {
        let hi_at = next.at(next.pos() + 1);
        if let Some(hi) = sequence_code(hi_at)? {
            spec.term(vec![Token::with_value(
                Tok::SpecSeqcodeRange,
                TokenValue::Range(lo, hi),
            )]);
            return Ok(hi_at.advance());
        }
    }
    spec.term(vec![Token::with_int_value(
        Tok::SpecSeqcode,
        lo,
        TokenValue::Text(text),
    )]);
    Ok(next)
}

fn chain<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    if cur.peek_kind() != Some(Tok::Colon) {
        return Ok(cur);
    }
    let at = cur.advance();
    match at.peek() {
        Some(token) if token.is(Tok::Times) => spec.unspecified(),
        Some(token) => match name_text(token) {
            Some(id) if is_wildcard(&id) => spec.unspecified(),
            Some(id) => spec.term(vec![Token::text(Tok::SpecChain, id)]),
            None => return Err(at.error(ErrorKind::InvalidChainSpecification)),
        },
        None => return Err(at.error(ErrorKind::InvalidChainSpecification)),
    }
    let next = at.advance();
    // `:A:2` 链之后的模型号
    match (next.peek_kind(), next.peek_nth(1)) {
        (Some(Tok::Colon), Some(model)) if model.is(Tok::Integer) => {
            spec.term(vec![Token::with_int(Tok::SpecModel, model.int())]);
            Ok(next.at(next.pos() + 2))
        }
        _ => Ok(next),
    }
}

fn atom<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    if cur.peek_kind() != Some(Tok::Per) {
        return Ok(cur);
    }
    let at = cur.advance();
    match at.peek() {
        Some(token) if token.is(Tok::Times) => spec.unspecified(),
        Some(token) => match name_text(token) {
            Some(name) if is_wildcard(&name) => spec.unspecified(),
            Some(name) => spec.term(vec![Token::text(Tok::SpecAtom, primed(name))]),
            None => return Err(at.error(ErrorKind::InvalidAtomSpecification)),
        },
        None => return Err(at.error(ErrorKind::InvalidAtomSpecification)),
    }
    Ok(at.advance())
}

/// 核酸原子名 `C1*` 写作 `C1'`
fn primed(mut name: String) -> String {
    let digit_before_star = name
        .strip_suffix('*')
        .is_some_and(|stem| stem.ends_with(|c: char| c.is_ascii_digit()));
    if digit_before_star {
        name.pop();
        name.push('\'');
    }
    name
}

fn alternate<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    if cur.peek_kind() != Some(Tok::Percent) {
        return Ok(cur);
    }
    let at = cur.advance();
    match at.peek() {
        Some(token) if token.is(Tok::Times) => spec.unspecified(),
        Some(token) => match name_text(token) {
            Some(loc) => spec.term(vec![Token::text(Tok::SpecAlternate, loc)]),
            None => return Err(at.error(ErrorKind::InvalidAtomSpecification)),
        },
        None => return Err(at.error(ErrorKind::InvalidAtomSpecification)),
    }
    Ok(at.advance())
}

fn model<'a>(cur: Cursor<'a>, spec: &mut Spec) -> Result<Cursor<'a>, CompileError> {
    if cur.peek_kind() != Some(Tok::Divide) {
        return Ok(cur);
    }
    let at = cur.advance();
    match at.peek() {
        Some(token) if token.is(Tok::Times) => spec.unspecified(),
        Some(token) if token.is(Tok::Integer) => {
            spec.term(vec![Token::with_int(Tok::SpecModel, token.int())]);
        }
        Some(token) if token.is(Tok::Decimal) && token.int() != Token::NO_INT => {
            spec.term(vec![token.retyped(Tok::SpecModel2)]);
        }
        _ => return Err(at.error(ErrorKind::InvalidModelSpecification)),
    }
    Ok(at.advance())
}
