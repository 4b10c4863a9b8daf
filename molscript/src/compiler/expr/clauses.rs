//! 带专门语法的子句：`within(...)`、`connected(...)`、`substructure(...)`、
//! `cell=...` 与比较子句 `property OP value`。

use super::{Cursor, Rule, brace_group, clause_or, lexeme, variable};
use crate::error::{CompileError, ErrorKind};
use crate::token::{Tok, Token, TokenValue};

/// `within` 第一个参数可用的关键字（规范名）
const WITHIN_KEYWORDS: &[&str] = &[
    "plane",
    "hkl",
    "group",
    "chain",
    "molecule",
    "site",
    "model",
    "structure",
    "element",
    "atomtype",
    "boundbox",
    "coord",
    "sequence",
];

/// 数值参数：可带负号；其后必须是参数分隔符
fn numeric_argument(cur: Cursor<'_>) -> Option<(Token, Cursor<'_>)> {
    let (token, next) = numeric_value(cur)?;
    matches!(next.peek_kind(), Some(Tok::Comma | Tok::RightParen) | None).then_some((token, next))
}

/// 函数参数：数字、字符串、对象、`true`/`false`，否则是原子表达式（逗号不作 `or`）
fn function_argument(cur: Cursor<'_>) -> Rule<'_> {
    let cur = cur.with_comma_or(false);
    if let Some((token, next)) = numeric_argument(cur) {
        return Ok((vec![token], next));
    }
    let Some(token) = cur.peek() else {
        return Err(cur.error(ErrorKind::EndOfCommandUnexpected));
    };
    let ends_here = matches!(
        cur.peek_nth(1).map(Token::kind),
        Some(Tok::Comma | Tok::RightParen) | None
    );
    let literal = match token.kind() {
        Tok::String | Tok::ObjectId => true,
        Tok::Identifier => {
            let name = lexeme(token).to_lowercase();
            name == "true" || name == "false"
        }
        _ => false,
    };
    if literal && ends_here {
        return Ok((vec![token.clone()], cur.advance()));
    }
    clause_or(cur)
}

/// `(` 参数 {`,` 参数} `)`；`first` 解析第一个参数
fn argument_list<'a>(
    cur: Cursor<'a>,
    first: fn(Cursor<'a>) -> Rule<'a>,
) -> Result<(Vec<Token>, i32, Cursor<'a>), CompileError> {
    let outer = cur.comma_is_or;
    let cur = cur.expect(Tok::LeftParen)?;
    if cur.peek_kind() == Some(Tok::RightParen) {
        return Ok((Vec::new(), 0, cur.advance().with_comma_or(outer)));
    }
    let (mut out, mut cur) = first(cur)?;
    let mut count = 1;
    while cur.peek_kind() == Some(Tok::Comma) {
        let (arg, next) = function_argument(cur.advance())?;
        out.extend(arg);
        count += 1;
        cur = next;
    }
    let cur = cur.expect(Tok::RightParen)?;
    Ok((out, count, cur.with_comma_or(outer)))
}

/// `within(距离或关键字, 参数...)`
pub(super) fn within(cur: Cursor<'_>) -> Rule<'_> {
    let head = cur;
    let function = cur.peek().cloned().unwrap_or_else(|| Token::new(Tok::Within));
    let (mut out, count, next) = argument_list(cur.advance(), within_first)?;
    if count < 2 {
        return Err(head.error(ErrorKind::BadArgumentCount));
    }
    out.push(function.rekeyed(count));
    Ok((out, next))
}

fn within_first(cur: Cursor<'_>) -> Rule<'_> {
    let cur = cur.with_comma_or(false);
    if let Some((token, next)) = numeric_argument(cur) {
        return Ok((vec![token], next));
    }
    let Some(token) = cur.peek() else {
        return Err(cur.error(ErrorKind::EndOfCommandUnexpected));
    };
    match token.kind() {
        Tok::Define => variable(cur),
        Tok::String => Ok((vec![token.clone()], cur.advance())),
        _ if token.kind() != Tok::Identifier
            && WITHIN_KEYWORDS.contains(&lexeme(token).as_str()) =>
        {
            Ok((vec![token.clone()], cur.advance()))
        }
        _ => Err(cur.error(ErrorKind::UnrecognizedParameter(
            "WITHIN".to_string(),
            lexeme(token),
        ))),
    }
}

/// `connected`、`connected(...)`，最多 5 个参数
pub(super) fn connected(cur: Cursor<'_>) -> Rule<'_> {
    let head = cur;
    let function = cur.peek().cloned().unwrap_or_else(|| Token::new(Tok::Connected));
    let cur = cur.advance();
    if cur.peek_kind() != Some(Tok::LeftParen) {
        return Ok((vec![function.rekeyed(0)], cur));
    }
    let (mut out, count, next) = argument_list(cur, function_argument)?;
    if count > 5 {
        return Err(head.error(ErrorKind::BadArgumentCount));
    }
    out.push(function.rekeyed(count));
    Ok((out, next))
}

/// `substructure("pattern"[, 集合])`，别名 `search`、`smiles`
pub(super) fn substructure(cur: Cursor<'_>) -> Rule<'_> {
    let head = cur;
    let function = cur
        .peek()
        .cloned()
        .unwrap_or_else(|| Token::new(Tok::Substructure));
    let (mut out, count, next) = argument_list(cur.advance(), pattern_argument)?;
    if !(1..=2).contains(&count) {
        return Err(head.error(ErrorKind::BadArgumentCount));
    }
    out.push(function.rekeyed(count));
    Ok((out, next))
}

fn pattern_argument(cur: Cursor<'_>) -> Rule<'_> {
    match cur.peek() {
        Some(token) if token.is(Tok::String) => Ok((vec![token.clone()], cur.advance())),
        Some(token) if token.is(Tok::Define) => variable(cur),
        Some(token) => Err(cur.error(ErrorKind::InvalidExpressionToken(lexeme(token)))),
        None => Err(cur.error(ErrorKind::EndOfCommandUnexpected)),
    }
}

/// `cell=555` 或 `cell={1 1 1}`
pub(super) fn cell(cur: Cursor<'_>) -> Rule<'_> {
    let function = cur.peek().cloned().unwrap_or_else(|| Token::new(Tok::Cell));
    let cur = cur.advance();
    let cur = match cur.peek_kind() {
        Some(Tok::Assign | Tok::OpEq) => cur.advance(),
        _ => return Err(cur.fail(ErrorKind::TokenExpected("=".to_string()))),
    };
    let (mut out, next) = match cur.peek() {
        Some(token) if token.is(Tok::Integer) => (vec![token.clone()], cur.advance()),
        Some(token) if token.is(Tok::LeftBrace) => {
            let (group, next) = brace_group(cur)?;
            if !group.first().is_some_and(|t| t.is(Tok::CoordinateBegin)) {
                return Err(cur.error(ErrorKind::CoordinateExpected));
            }
            (group, next)
        }
        _ => return Err(cur.fail(ErrorKind::NumberExpected)),
    };
    out.push(function.rekeyed(1));
    Ok((out, next))
}

/// `property OP value`，输出 `property value OP`
pub(super) fn comparator(cur: Cursor<'_>) -> Rule<'_> {
    let Some(property) = cur.peek() else {
        return Err(cur.error(ErrorKind::EndOfCommandUnexpected));
    };
    let cur = cur.advance();
    let op = match cur.peek_kind() {
        Some(Tok::Assign) => Tok::OpEq,
        Some(kind) if kind.is_comparator() => kind,
        _ => {
            return Err(cur.fail(ErrorKind::TokenExpected(
                "== != < > <= >=".to_string(),
            )));
        }
    };
    let is_string = property.kind().is_string_property();
    if is_string && !matches!(op, Tok::OpEq | Tok::OpNe) {
        return Err(cur.error(ErrorKind::InvalidExpressionToken(op.name().to_string())));
    }
    let cur = cur.advance();

    let (value, next) = if let Some((token, next)) = numeric_value(cur) {
        (vec![token], next)
    } else {
        match cur.peek() {
            Some(token) if token.is(Tok::Define) => variable(cur)?,
            Some(token) if token.is(Tok::String) => (vec![token.clone()], cur.advance()),
            Some(token) if is_string && token.text_value().is_some() => {
                (vec![Token::string(lexeme(token))], cur.advance())
            }
            _ => return Err(cur.fail(ErrorKind::NumberOrVariableNameExpected)),
        }
    };

    let mut out = vec![property.clone()];
    out.extend(value);
    out.push(Token::new(op));
    Ok((out, next))
}

fn numeric_value(cur: Cursor<'_>) -> Option<(Token, Cursor<'_>)> {
    let negative = cur.peek_kind() == Some(Tok::Minus);
    let num = if negative { cur.advance() } else { cur };
    let token = num.peek()?;
    let value = token.number()?;
    let token = match (negative, token.kind()) {
        (false, _) => token.clone(),
        (true, Tok::Integer) => Token::integer(-token.int()),
        (true, _) => Token::with_value(Tok::Decimal, TokenValue::Number(-value)),
    };
    Some((token, num.advance()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::super::expression;
    use super::*;

    fn kw(kind: Tok, name: &str) -> Token {
        Token::text(kind, name)
    }

    fn compile(tokens: &[Token]) -> Result<Vec<Token>, CompileError> {
        let offsets: Vec<usize> = (0..tokens.len()).collect();
        let known = HashSet::new();
        let cur = Cursor::new(tokens, &offsets, tokens.len(), &known, true);
        let (out, rest) = expression(cur)?;
        assert!(rest.at_end());
        Ok(out)
    }

    fn listing(tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_within_distance() {
        // within(5.0, ala)
        let tokens = [
            kw(Tok::Within, "within"),
            Token::new(Tok::LeftParen),
            Token::with_int_value(Tok::Decimal, 5_000_000, TokenValue::Number(5.0)),
            Token::new(Tok::Comma),
            Token::identifier("ala"),
            Token::new(Tok::RightParen),
        ];
        let out = compile(&tokens).unwrap();
        assert_eq!(listing(&out), "5 spec_name(ala) within(2)");
    }

    #[test]
    fn test_within_args_do_not_treat_comma_as_or() {
        // within(group, ala, true)
        let tokens = [
            kw(Tok::Within, "within"),
            Token::new(Tok::LeftParen),
            kw(Tok::Group, "group"),
            Token::new(Tok::Comma),
            Token::identifier("ala"),
            Token::new(Tok::Comma),
            Token::identifier("true"),
            Token::new(Tok::RightParen),
        ];
        let out = compile(&tokens).unwrap();
        assert_eq!(listing(&out), "group spec_name(ala) true within(3)");
    }

    #[test]
    fn test_within_unknown_keyword() {
        let tokens = [
            kw(Tok::Within, "within"),
            Token::new(Tok::LeftParen),
            Token::identifier("foo"),
            Token::new(Tok::Comma),
            Token::identifier("ala"),
            Token::new(Tok::RightParen),
        ];
        let err = compile(&tokens).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::UnrecognizedParameter("WITHIN".to_string(), "foo".to_string())
        );
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_within_needs_two_arguments() {
        let tokens = [
            kw(Tok::Within, "within"),
            Token::new(Tok::LeftParen),
            Token::integer(5),
            Token::new(Tok::RightParen),
        ];
        let err = compile(&tokens).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArgumentCount);
    }

    #[test]
    fn test_connected_forms() {
        let bare = [kw(Tok::Connected, "connected")];
        assert_eq!(listing(&compile(&bare).unwrap()), "connected(0)");

        // connected(1, 2, "single", hoh)
        let tokens = [
            kw(Tok::Connected, "connected"),
            Token::new(Tok::LeftParen),
            Token::integer(1),
            Token::new(Tok::Comma),
            Token::integer(2),
            Token::new(Tok::Comma),
            Token::string("single"),
            Token::new(Tok::Comma),
            Token::identifier("hoh"),
            Token::new(Tok::RightParen),
        ];
        let out = compile(&tokens).unwrap();
        assert_eq!(
            listing(&out),
            "1 2 \"single\" spec_name(hoh) connected(4)"
        );
    }

    #[test]
    fn test_substructure_requires_pattern() {
        let ok = [
            kw(Tok::Substructure, "smiles"),
            Token::new(Tok::LeftParen),
            Token::string("CCO"),
            Token::new(Tok::RightParen),
        ];
        assert_eq!(
            listing(&compile(&ok).unwrap()),
            "\"CCO\" substructure(1 smiles)"
        );

        let bad = [
            kw(Tok::Substructure, "substructure"),
            Token::new(Tok::LeftParen),
            Token::integer(3),
            Token::new(Tok::RightParen),
        ];
        let err = compile(&bad).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidExpressionToken("3".to_string()));
    }

    #[test]
    fn test_comparator_order() {
        // atomno >= -3
        let tokens = [
            kw(Tok::AtomProperty, "atomno"),
            Token::new(Tok::OpGe),
            Token::new(Tok::Minus),
            Token::integer(3),
        ];
        let out = compile(&tokens).unwrap();
        assert_eq!(listing(&out), "property(atomno) -3 >=");
    }

    #[test]
    fn test_string_comparator() {
        // element = C
        let tokens = [
            kw(Tok::StringProperty, "element"),
            Token::new(Tok::Assign),
            Token::identifier("C"),
        ];
        let out = compile(&tokens).unwrap();
        assert_eq!(listing(&out), "strproperty(element) \"C\" ==");

        let ordered = [
            kw(Tok::StringProperty, "element"),
            Token::new(Tok::OpLt),
            Token::identifier("C"),
        ];
        let err = compile(&ordered).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidExpressionToken("<".to_string()));
    }

    #[test]
    fn test_comparator_value_may_be_variable() {
        let tokens = [
            kw(Tok::AtomProperty, "resno"),
            Token::new(Tok::OpLt),
            Token::new(Tok::Define),
            Token::identifier("n"),
        ];
        let out = compile(&tokens).unwrap();
        assert_eq!(listing(&out), "property(resno) @(n) <");
    }

    #[test]
    fn test_comparator_missing_value() {
        let tokens = [kw(Tok::AtomProperty, "resno"), Token::new(Tok::OpLt)];
        let err = compile(&tokens).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EndOfCommandUnexpected);
    }

    #[test]
    fn test_cell() {
        let tokens = [
            kw(Tok::Cell, "cell"),
            Token::new(Tok::Assign),
            Token::integer(555),
        ];
        assert_eq!(listing(&compile(&tokens).unwrap()), "555 cell(1)");
    }
}
