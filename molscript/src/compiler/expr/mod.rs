//! # 表达式编译
//!
//! 原子选择表达式：中缀 → 后缀。
//!
//! ## 设计说明
//!
//! - 每条文法规则都是纯函数 `Cursor -> Result<(Vec<Token>, Cursor)>`，
//!   [`Cursor`] 是 `Copy` 的，规则之间不共享可变状态
//! - 优先级：`or`/`xor`/`toggle`（以及按命令开启的逗号）→ `and` → `not` → 基本子句
//! - 输出先操作数后运算符，括号消失；`[...]` 选择器跟在操作数之后原样复制
//! - 函数（`within`、`connected`、`substructure`）先输出参数，再输出
//!   整数字段为参数个数的函数 token

mod clauses;
mod residue;

use std::collections::HashSet;

use crate::error::{CompileError, ErrorKind};
use crate::token::{Tok, Token, TokenValue};

/// 文法规则的返回值：输出的后缀 token 与推进后的游标
pub(crate) type Rule<'a> = Result<(Vec<Token>, Cursor<'a>), CompileError>;

/// 在一条命令的 token 序列上移动的游标
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    tokens: &'a [Token],
    offsets: &'a [usize],
    end_offset: usize,
    /// 已声明的变量与 `define` 过的集合名（小写），它们不按残基名处理
    known_names: &'a HashSet<String>,
    pos: usize,
    comma_is_or: bool,
    /// 命令本身的逗号语义，括号内恢复为它
    verb_comma_is_or: bool,
}

impl<'a> Cursor<'a> {
    pub fn new(
        tokens: &'a [Token],
        offsets: &'a [usize],
        end_offset: usize,
        known_names: &'a HashSet<String>,
        comma_is_or: bool,
    ) -> Self {
        Self {
            tokens,
            offsets,
            end_offset,
            known_names,
            pos: 0,
            comma_is_or,
            verb_comma_is_or: comma_is_or,
        }
    }

    pub fn at(self, pos: usize) -> Self {
        Self { pos, ..self }
    }

    pub fn pos(self) -> usize {
        self.pos
    }

    pub fn at_end(self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek(self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(self) -> Option<Tok> {
        self.peek().map(Token::kind)
    }

    pub fn peek_nth(self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    pub fn advance(self) -> Self {
        self.at(self.pos + 1)
    }

    fn with_comma_or(self, on: bool) -> Self {
        Self {
            comma_is_or: on,
            ..self
        }
    }

    /// 当前 token 的源码偏移（末尾时为命令结束处）
    pub fn offset(self) -> usize {
        self.offsets
            .get(self.pos)
            .copied()
            .unwrap_or(self.end_offset)
    }

    pub fn error(self, kind: ErrorKind) -> CompileError {
        CompileError::new(kind, self.offset())
    }

    /// 末尾报"命令意外结束"，否则报给定的错误
    pub fn fail(self, kind: ErrorKind) -> CompileError {
        if self.at_end() {
            self.error(ErrorKind::EndOfCommandUnexpected)
        } else {
            self.error(kind)
        }
    }

    /// 要求当前 token 为 `kind` 并越过它
    pub fn expect(self, kind: Tok) -> Result<Self, CompileError> {
        if self.peek_kind() == Some(kind) {
            Ok(self.advance())
        } else {
            Err(self.fail(ErrorKind::TokenExpected(kind.name().to_string())))
        }
    }

    fn is_known_name(self, name: &str) -> bool {
        self.known_names.contains(&name.to_lowercase())
    }

    /// 当前位置是 `open`，返回与之配对的 `close` 的下标
    fn matching(self, open: Tok, close: Tok) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if token.is(open) {
                depth += 1;
            } else if token.is(close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    fn slice(self, from: usize, to: usize) -> &'a [Token] {
        &self.tokens[from..to]
    }
}

/// token 的原始文字（关键字取规范名，字符串取内容）
pub(crate) fn lexeme(token: &Token) -> String {
    match token.value() {
        TokenValue::Text(s) => s.clone(),
        _ => token.to_string(),
    }
}

/// 完整的原子表达式
pub(crate) fn expression(cur: Cursor<'_>) -> Rule<'_> {
    clause_or(cur)
}

/// 编译命令中从游标处开始的整段原子表达式，外加起止标记
///
/// 表达式之后还有剩余 token 时报"表达式应在此结束"。
pub(crate) fn atom_expression(cur: Cursor<'_>) -> Result<Vec<Token>, CompileError> {
    if cur.at_end() {
        return Ok(Vec::new());
    }
    let (postfix, rest) = expression(cur)?;
    if !rest.at_end() {
        return Err(rest.error(ErrorKind::EndOfExpressionExpected));
    }
    Ok(wrap(postfix))
}

fn wrap(postfix: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(postfix.len() + 2);
    out.push(Token::new(Tok::ExpressionBegin));
    out.extend(postfix);
    out.push(Token::new(Tok::ExpressionEnd));
    out
}

/// 数学表达式与嵌入式命令：保留中缀，只编译其中的分组
///
/// `{...}` 总是编译（哈希字面量 `{"k": v}` 与 `{}` 原样保留）；
/// `with_parens` 为真时 `(...)` 也按原子表达式编译。
pub(crate) fn embedded_groups(
    cur: Cursor<'_>,
    with_parens: bool,
) -> Result<Vec<Token>, CompileError> {
    let mut out = Vec::new();
    let mut cur = cur;
    while let Some(token) = cur.peek() {
        match token.kind() {
            Tok::LeftBrace if is_hash_literal(cur) => {
                let close = cur
                    .matching(Tok::LeftBrace, Tok::RightBrace)
                    .ok_or_else(|| cur.at(cur.tokens.len()).error(ErrorKind::EndOfCommandUnexpected))?;
                out.extend_from_slice(cur.slice(cur.pos, close + 1));
                cur = cur.at(close + 1);
            }
            Tok::LeftBrace => {
                let (group, next) = brace_group(cur)?;
                if group.first().is_some_and(|t| t.is(Tok::CoordinateBegin)) {
                    out.extend(group);
                } else {
                    out.extend(wrap(group));
                }
                cur = next;
            }
            Tok::LeftParen if with_parens => {
                let (inner, next) = clause_or(cur.advance())?;
                let next = next.expect(Tok::RightParen)?;
                out.extend(wrap(inner));
                cur = next;
            }
            _ => {
                out.push(token.clone());
                cur = cur.advance();
            }
        }
    }
    Ok(out)
}

fn is_hash_literal(cur: Cursor<'_>) -> bool {
    match (cur.peek_nth(1).map(Token::kind), cur.peek_nth(2).map(Token::kind)) {
        (Some(Tok::RightBrace), _) => true,
        (Some(Tok::String), Some(Tok::Colon)) => true,
        _ => false,
    }
}

fn clause_or(cur: Cursor<'_>) -> Rule<'_> {
    let (mut out, mut cur) = clause_and(cur)?;
    loop {
        let op = match cur.peek_kind() {
            Some(kind @ (Tok::OpOr | Tok::OpXor | Tok::OpToggle)) => kind,
            Some(Tok::Comma) if cur.comma_is_or => Tok::OpOr,
            _ => break,
        };
        let (rhs, next) = clause_and(cur.advance())?;
        out.extend(rhs);
        out.push(Token::new(op));
        cur = next;
    }
    Ok((out, cur))
}

fn clause_and(cur: Cursor<'_>) -> Rule<'_> {
    let (mut out, mut cur) = clause_not(cur)?;
    while cur.peek_kind() == Some(Tok::OpAnd) {
        let (rhs, next) = clause_not(cur.advance())?;
        out.extend(rhs);
        out.push(Token::new(Tok::OpAnd));
        cur = next;
    }
    Ok((out, cur))
}

fn clause_not(cur: Cursor<'_>) -> Rule<'_> {
    if cur.peek_kind() == Some(Tok::OpNot) {
        let (mut out, next) = clause_not(cur.advance())?;
        out.push(Token::new(Tok::OpNot));
        return Ok((out, next));
    }
    clause_primary(cur)
}

fn clause_primary(cur: Cursor<'_>) -> Rule<'_> {
    let Some(token) = cur.peek() else {
        return Err(cur.error(ErrorKind::EndOfCommandUnexpected));
    };
    let (mut out, cur) = match token.kind() {
        Tok::All
        | Tok::None
        | Tok::Bitset
        | Tok::PredefinedSet
        | Tok::Centroid
        | Tok::String
        | Tok::ObjectId => (vec![token.clone()], cur.advance()),
        Tok::Decimal => (vec![model_literal(cur, token)?], cur.advance()),
        Tok::LeftParen => {
            let outer = cur.comma_is_or;
            let inner_cur = cur.advance().with_comma_or(cur.verb_comma_is_or);
            let (inner, next) = clause_or(inner_cur)?;
            let next = next.expect(Tok::RightParen)?;
            (inner, next.with_comma_or(outer))
        }
        Tok::LeftBrace => brace_group(cur)?,
        Tok::Define => variable(cur)?,
        Tok::Within => clauses::within(cur)?,
        Tok::Connected => clauses::connected(cur)?,
        Tok::Substructure => clauses::substructure(cur)?,
        Tok::Cell => clauses::cell(cur)?,
        kind if kind.is_atom_property() => clauses::comparator(cur)?,
        Tok::Identifier if cur.is_known_name(&lexeme(token)) => {
            (vec![token.clone()], cur.advance())
        }
        kind if residue::starts_spec(kind) => residue::residue_spec(cur)?,
        kind if kind.is_command() => {
            return Err(cur.error(ErrorKind::InvalidExpressionToken(lexeme(token))));
        }
        _ => {
            return Err(cur.error(ErrorKind::UnrecognizedExpressionToken(lexeme(token))));
        }
    };
    let cur = item_selectors(cur, &mut out)?;
    Ok((out, cur))
}

/// 操作数之后的 `[...]` 原样复制
fn item_selectors<'a>(
    mut cur: Cursor<'a>,
    out: &mut Vec<Token>,
) -> Result<Cursor<'a>, CompileError> {
    while cur.peek_kind() == Some(Tok::LeftSquare) {
        let close = cur
            .matching(Tok::LeftSquare, Tok::RightSquare)
            .ok_or_else(|| cur.at(cur.tokens.len()).error(ErrorKind::EndOfCommandUnexpected))?;
        out.extend_from_slice(cur.slice(cur.pos, close + 1));
        cur = cur.at(close + 1);
    }
    Ok(cur)
}

/// 单独出现的 `m.n` 是模型号
fn model_literal(cur: Cursor<'_>, token: &Token) -> Result<Token, CompileError> {
    if token.int() == Token::NO_INT {
        return Err(cur.error(ErrorKind::InvalidModelSpecification));
    }
    Ok(Token::with_int_value(
        Tok::SpecModel2,
        token.int(),
        token.value().clone(),
    ))
}

/// `@name`、`@name[i]`、`@1`
fn variable(cur: Cursor<'_>) -> Rule<'_> {
    let cur = cur.advance();
    let Some(token) = cur.peek() else {
        return Err(cur.error(ErrorKind::EndOfCommandUnexpected));
    };
    let deref = match token.kind() {
        Tok::Integer => Token::with_int(Tok::Define, token.int()),
        kind if kind != Tok::String && token.text_value().is_some() => {
            Token::text(Tok::Define, lexeme(token))
        }
        _ => return Err(cur.error(ErrorKind::NumberOrVariableNameExpected)),
    };
    let mut out = vec![deref];
    let cur = item_selectors(cur.advance(), &mut out)?;
    Ok((out, cur))
}

/// `{...}`：坐标（至少两个数值部分）或选择集合
fn brace_group(cur: Cursor<'_>) -> Rule<'_> {
    let close = cur
        .matching(Tok::LeftBrace, Tok::RightBrace)
        .ok_or_else(|| cur.at(cur.tokens.len()).error(ErrorKind::EndOfCommandUnexpected))?;
    if let Some(parts) = coordinate_parts(cur.slice(cur.pos + 1, close)) {
        if parts.len() > 4 {
            return Err(cur.error(ErrorKind::CoordinateExpected));
        }
        let arity = parts.len() as i32;
        let mut out = Vec::with_capacity(parts.len() + 2);
        out.push(Token::with_int(Tok::CoordinateBegin, arity));
        out.extend(parts);
        out.push(Token::new(Tok::CoordinateEnd));
        return Ok((out, cur.at(close + 1)));
    }
    let outer = cur.comma_is_or;
    let (inner, next) = clause_or(cur.advance().with_comma_or(cur.verb_comma_is_or))?;
    let next = next.expect(Tok::RightBrace)?;
    Ok((inner, next.with_comma_or(outer)))
}

/// 数值部分：`[-]数字`、`[-]a/b`、`@变量`，可用逗号分隔；少于两个部分返回 `None`
fn coordinate_parts(tokens: &[Token]) -> Option<Vec<Token>> {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind() {
            Tok::Comma if !parts.is_empty() => {
                i += 1;
                continue;
            }
            Tok::Define => {
                let name = tokens.get(i + 1).filter(|t| t.is(Tok::Identifier))?;
                parts.push(Token::text(Tok::Define, lexeme(name)));
                i += 2;
                continue;
            }
            _ => {}
        }
        let negative = token.is(Tok::Minus);
        if negative {
            i += 1;
        }
        let mut value = tokens.get(i)?.number()?;
        let mut part = tokens[i].clone();
        i += 1;
        if tokens.get(i).is_some_and(|t| t.is(Tok::Divide)) {
            let denominator = tokens.get(i + 1)?.number()?;
            if denominator == 0.0 {
                return None;
            }
            value /= denominator;
            part = Token::with_value(Tok::Decimal, TokenValue::Number(value));
            i += 2;
        }
        if negative {
            part = match part.kind() {
                Tok::Integer => Token::integer(-part.int()),
                _ => Token::with_value(Tok::Decimal, TokenValue::Number(-value)),
            };
        }
        parts.push(part);
    }
    (parts.len() >= 2).then_some(parts)
}
