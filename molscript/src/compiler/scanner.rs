//! # 字符扫描
//!
//! 纯函数：给定源码与位置，识别下一个词素及其长度。
//!
//! 扫描器不查注册表：标识符/关键字统一返回 [`Lexeme::Word`]，
//! 由组装器结合上下文解析。扫描器从不吞掉正负号，`-` 总是单独的 token。

use crate::error::{CompileError, ErrorKind};
use crate::token::{AtomSet, Tok, Token, TokenValue};

/// `*^c` 中"任意残基号"的编码
pub const SEQUENCE_WILDCARD: i32 = 0x007F_FFFF;

/// 扫描上下文
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ScanContext {
    /// 当前处于原子表达式中：允许序列号编码、`*` 通配名、`ala12^b` 写法
    pub atom_expression: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lexeme {
    /// 空格、制表符、续行
    Whitespace,
    Comment,
    /// `#jc`：当前语句整体作废
    DiscardStatement,
    Newline,
    /// 标识符或关键字
    Word,
    Token(Token),
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scanned {
    pub lexeme: Lexeme,
    pub len: usize,
}

impl Scanned {
    fn new(lexeme: Lexeme, len: usize) -> Self {
        Self { lexeme, len }
    }

    fn token(token: Token, len: usize) -> Self {
        Self::new(Lexeme::Token(token), len)
    }
}

/// 统计文本中的换行数（`\r\n`、`\n`、单独的 `\r` 各算一次）
pub(crate) fn count_lines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut count = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => count += 1,
            b'\r' if bytes.get(i + 1) != Some(&b'\n') => count += 1,
            _ => {}
        }
    }
    count
}

/// 识别 `pos` 处的下一个词素
pub(crate) fn scan(src: &str, pos: usize, ctx: ScanContext) -> Result<Scanned, CompileError> {
    let rest = &src[pos..];
    let bytes = rest.as_bytes();
    let Some(&first) = bytes.first() else {
        return Ok(Scanned::new(Lexeme::End, 0));
    };

    if first == b' ' || first == b'\t' {
        let len = bytes
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
        return Ok(Scanned::new(Lexeme::Whitespace, len));
    }
    if first == b'\\' {
        match (bytes.get(1), bytes.get(2)) {
            (Some(b'\n'), _) => return Ok(Scanned::new(Lexeme::Whitespace, 2)),
            (Some(b'\r'), Some(b'\n')) => return Ok(Scanned::new(Lexeme::Whitespace, 3)),
            (Some(b'\r'), _) => return Ok(Scanned::new(Lexeme::Whitespace, 2)),
            _ => {}
        }
    }
    match first {
        b'\n' => return Ok(Scanned::new(Lexeme::Newline, 1)),
        b'\r' => {
            let len = if bytes.get(1) == Some(&b'\n') { 2 } else { 1 };
            return Ok(Scanned::new(Lexeme::Newline, len));
        }
        _ => {}
    }
    if let Some(scanned) = scan_comment(rest) {
        return Ok(scanned);
    }
    if first == b'"' || first == b'\'' {
        let (text, len) = scan_string(src, pos)?;
        return Ok(Scanned::token(Token::string(text), len));
    }
    if first == b'$' {
        return scan_object_id(src, pos);
    }
    if let Some(scanned) = scan_number(src, pos, ctx)? {
        return Ok(scanned);
    }
    if let Some(scanned) = scan_atom_set(src, pos)? {
        return Ok(scanned);
    }
    if let Some(scanned) = scan_operator(rest) {
        return Ok(scanned);
    }
    if let Some(len) = scan_word(rest, ctx) {
        return Ok(Scanned::new(Lexeme::Word, len));
    }

    let ch = rest.chars().next().map(String::from).unwrap_or_default();
    Err(CompileError::new(ErrorKind::UnrecognizedToken(ch), pos))
}

fn line_length(rest: &str) -> usize {
    rest.find(['\n', '\r']).unwrap_or(rest.len())
}

fn scan_comment(rest: &str) -> Option<Scanned> {
    if rest.starts_with("/**/") {
        return Some(Scanned::new(Lexeme::Comment, 4));
    }
    if let Some(body) = rest.strip_prefix("/**") {
        let len = body.find("**/").map_or(rest.len(), |p| p + 3 + 3);
        return Some(Scanned::new(Lexeme::Comment, len));
    }
    if let Some(body) = rest.strip_prefix("/*") {
        let len = body.find("*/").map_or(rest.len(), |p| p + 2 + 2);
        return Some(Scanned::new(Lexeme::Comment, len));
    }
    if rest.starts_with("//") {
        return Some(Scanned::new(Lexeme::Comment, line_length(rest)));
    }
    if rest.starts_with('#') {
        let lower: String = rest.chars().take(4).collect::<String>().to_ascii_lowercase();
        if lower == "#jx " {
            return Some(Scanned::new(Lexeme::Whitespace, 4));
        }
        if lower.starts_with("#jc") {
            return Some(Scanned::new(Lexeme::DiscardStatement, line_length(rest)));
        }
        return Some(Scanned::new(Lexeme::Comment, line_length(rest)));
    }
    None
}

/// 扫描带引号的字符串，返回解码后的内容与词素长度
pub(crate) fn scan_string(src: &str, pos: usize) -> Result<(String, usize), CompileError> {
    let rest = &src[pos..];
    let mut chars = rest.char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(CompileError::new(ErrorKind::EndOfCommandUnexpected, pos));
    };
    let mut text = String::new();
    while let Some((i, ch)) = chars.next() {
        match ch {
            c if c == quote => return Ok((text, i + c.len_utf8())),
            '\n' | '\r' => break,
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    break;
                };
                match esc {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    'b' => text.push('\u{8}'),
                    '"' | '\\' | '\'' => text.push(esc),
                    'x' | 'u' => {
                        let width = if esc == 'x' { 2 } else { 4 };
                        let start = i + 2;
                        let decoded = rest
                            .get(start..start + width)
                            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
                            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                            .and_then(char::from_u32);
                        match decoded {
                            Some(c) => {
                                text.push(c);
                                for _ in 0..width {
                                    chars.next();
                                }
                            }
                            None => {
                                text.push('\\');
                                text.push(esc);
                            }
                        }
                    }
                    other => {
                        text.push('\\');
                        text.push(other);
                    }
                }
            }
            c => text.push(c),
        }
    }
    let end = pos + line_length(rest);
    Err(CompileError::new(ErrorKind::EndOfCommandUnexpected, end))
}

fn scan_object_id(src: &str, pos: usize) -> Result<Scanned, CompileError> {
    let rest = &src[pos..];
    if rest[1..].starts_with(['"', '\'']) {
        let (name, len) = scan_string(src, pos + 1)?;
        return Ok(Scanned::token(Token::text(Tok::ObjectId, name), len + 1));
    }
    let len: usize = rest[1..]
        .chars()
        .take_while(|&c| c.is_alphanumeric() || c == '_' || c == '.' || c == '~')
        .map(char::len_utf8)
        .sum();
    if len == 0 {
        return Err(CompileError::new(
            ErrorKind::UnrecognizedToken("$".to_string()),
            pos,
        ));
    }
    let name = &rest[1..1 + len];
    Ok(Scanned::token(Token::text(Tok::ObjectId, name), len + 1))
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count()
}

fn scan_number(src: &str, pos: usize, ctx: ScanContext) -> Result<Option<Scanned>, CompileError> {
    let rest = &src[pos..];
    let bytes = rest.as_bytes();

    if ctx.atom_expression {
        if let Some(scanned) = scan_seqcode(rest, pos)? {
            return Ok(Some(scanned));
        }
    }

    let int_len = digit_run(bytes, 0);
    if int_len == 0 {
        // `.5` 只在非原子表达式、且前面不是操作数时成立
        let leading_dot = !ctx.atom_expression
            && bytes.first() == Some(&b'.')
            && bytes.get(1).is_some_and(u8::is_ascii_digit)
            && !src[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || matches!(c, ')' | ']' | '}' | '_'));
        if !leading_dot {
            return Ok(None);
        }
    }

    let mut len = int_len;
    let mut frac_len = None;
    if bytes.get(len) == Some(&b'.') && !is_atom_name_dot(bytes, len) {
        let digits = digit_run(bytes, len + 1);
        frac_len = Some(digits);
        len += 1 + digits;
    }
    let exp_len = exponent_length(bytes, len);
    len += exp_len;

    let lexeme = &rest[..len];
    if exp_len > 0 || int_len == 0 {
        let value: f64 = lexeme.parse().unwrap_or(0.0);
        return Ok(Some(Scanned::token(
            Token::with_value(Tok::Decimal, TokenValue::Number(value)),
            len,
        )));
    }
    match frac_len {
        Some(digits) => {
            let value: f64 = lexeme.parse().unwrap_or(0.0);
            let model = model_number(&rest[..int_len], &rest[int_len + 1..int_len + 1 + digits]);
            Ok(Some(Scanned::token(
                Token::with_int_value(Tok::Decimal, model, TokenValue::Number(value)),
                len,
            )))
        }
        None => match lexeme.parse::<i32>() {
            Ok(value) => Ok(Some(Scanned::token(Token::integer(value), len))),
            Err(_) => {
                let value: f64 = lexeme.parse().unwrap_or(f64::MAX);
                Ok(Some(Scanned::token(
                    Token::with_value(Tok::Decimal, TokenValue::Number(value)),
                    len,
                )))
            }
        },
    }
}

/// `1.CA`、`1.?`、`1.*`：点号属于原子名，不构成小数
fn is_atom_name_dot(bytes: &[u8], dot: usize) -> bool {
    bytes
        .get(dot + 1)
        .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'?' || b == b'*')
}

/// 指数部分长度；指数必须存在且非零
fn exponent_length(bytes: &[u8], at: usize) -> usize {
    if !matches!(bytes.get(at), Some(b'e' | b'E')) {
        return 0;
    }
    let mut i = at + 1;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits = digit_run(bytes, i);
    if digits == 0 || bytes[i..i + digits].iter().all(|&b| b == b'0') {
        return 0;
    }
    // `2e5x` 是标识符的一部分，不是数字
    if bytes
        .get(i + digits)
        .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'_')
    {
        return 0;
    }
    i + digits - at
}

/// `m.n` 的模型号编码：`m * 1_000_000 + n`
fn model_number(whole: &str, fraction: &str) -> i32 {
    let m: i64 = whole.parse().unwrap_or(0);
    let n: i64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().unwrap_or(0)
    };
    i32::try_from(m * 1_000_000 + n).unwrap_or(Token::NO_INT)
}

/// 序列号编码：`(seq << 8) | insertion`
pub(crate) fn seqcode(seq: i32, insertion: char) -> i32 {
    (seq << 8) | (insertion as i32 & 0xFF)
}

fn scan_seqcode(rest: &str, pos: usize) -> Result<Option<Scanned>, CompileError> {
    let bytes = rest.as_bytes();
    let (seq, caret) = if bytes.first() == Some(&b'*') && bytes.get(1) == Some(&b'^') {
        (SEQUENCE_WILDCARD, 1)
    } else {
        let digits = digit_run(bytes, 0);
        if digits == 0 || bytes.get(digits) != Some(&b'^') {
            return Ok(None);
        }
        match rest[..digits].parse::<i32>() {
            Ok(seq) if seq <= SEQUENCE_WILDCARD => (seq, digits),
            _ => {
                return Err(CompileError::new(ErrorKind::NumberExpected, pos));
            }
        }
    };
    let (insertion, len) = match bytes.get(caret + 1) {
        Some(&b) if b.is_ascii_alphabetic() || b == b'*' || b == b'?' => (b as char, caret + 2),
        Some(&b) if b.is_ascii_digit() || b == b'_' => return Ok(None),
        _ => ('\0', caret + 1),
    };
    Ok(Some(Scanned::token(
        Token::with_int_value(
            Tok::SeqCode,
            seqcode(seq, insertion),
            TokenValue::Text(rest[..len].to_string()),
        ),
        len,
    )))
}

/// `({0 2:5})`、`[{0:3}]`、`({})`、`({null})`
fn scan_atom_set(src: &str, pos: usize) -> Result<Option<Scanned>, CompileError> {
    let rest = &src[pos..];
    let (is_bond_set, close) = if rest.starts_with("({") {
        (false, "})")
    } else if rest.starts_with("[{") {
        (true, "}]")
    } else {
        return Ok(None);
    };
    let Some(end) = rest.find(close) else {
        return Ok(None);
    };
    let body = rest[2..end].trim();
    let len = end + close.len();
    if body.is_empty() || body == "null" {
        let set = AtomSet {
            ranges: Vec::new(),
            is_bond_set,
        };
        return Ok(Some(Scanned::token(
            Token::with_value(Tok::Bitset, TokenValue::AtomSet(set)),
            len,
        )));
    }
    let mut ranges = Vec::new();
    for item in body.split_whitespace() {
        let parsed = match item.split_once(':') {
            Some((lo, hi)) => lo.parse::<u32>().ok().zip(hi.parse::<u32>().ok()),
            None => item.parse::<u32>().ok().map(|n| (n, n)),
        };
        let Some((lo, hi)) = parsed else {
            // 不是集合字面量，交给标点处理
            return Ok(None);
        };
        if lo > hi {
            return Err(CompileError::new(
                ErrorKind::UnrecognizedToken(rest[..len].to_string()),
                pos,
            ));
        }
        ranges.push((lo, hi));
    }
    let set = AtomSet {
        ranges,
        is_bond_set,
    };
    Ok(Some(Scanned::token(
        Token::with_value(Tok::Bitset, TokenValue::AtomSet(set)),
        len,
    )))
}

const OPERATORS: &[(&str, Tok)] = &[
    ("==", Tok::OpEq),
    ("!=", Tok::OpNe),
    ("<>", Tok::OpNe),
    ("<=", Tok::OpLe),
    (">=", Tok::OpGe),
    ("&&", Tok::OpAnd),
    ("||", Tok::OpOr),
    ("++", Tok::PlusPlus),
    ("--", Tok::MinusMinus),
    ("+=", Tok::CompoundAssign),
    ("-=", Tok::CompoundAssign),
    ("*=", Tok::CompoundAssign),
    ("/=", Tok::CompoundAssign),
    ("=", Tok::Assign),
    ("<", Tok::OpLt),
    (">", Tok::OpGt),
    ("&", Tok::OpAnd),
    ("|", Tok::OpOr),
    ("!", Tok::OpNot),
    ("+", Tok::Plus),
    ("-", Tok::Minus),
    ("*", Tok::Times),
    ("/", Tok::Divide),
    ("%", Tok::Percent),
    ("^", Tok::Power),
    ("(", Tok::LeftParen),
    (")", Tok::RightParen),
    ("[", Tok::LeftSquare),
    ("]", Tok::RightSquare),
    ("{", Tok::LeftBrace),
    ("}", Tok::RightBrace),
    (",", Tok::Comma),
    (";", Tok::Semicolon),
    (":", Tok::Colon),
    (".", Tok::Per),
    ("@", Tok::Define),
];

fn scan_operator(rest: &str) -> Option<Scanned> {
    OPERATORS.iter().find_map(|&(lexeme, kind)| {
        rest.starts_with(lexeme).then(|| {
            let token = if kind == Tok::CompoundAssign {
                Token::text(kind, lexeme)
            } else {
                Token::new(kind)
            };
            Scanned::token(token, lexeme.len())
        })
    })
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '~' | '?')
}

fn is_word_part(c: char, ctx: ScanContext) -> bool {
    c.is_alphanumeric()
        || matches!(c, '_' | '~' | '?' | '\'')
        || (ctx.atom_expression && c == '*')
}

fn scan_word(rest: &str, ctx: ScanContext) -> Option<usize> {
    let mut chars = rest.chars().peekable();
    let first = chars.next()?;
    if !is_word_start(first) {
        return None;
    }
    let mut len = first.len_utf8();
    let mut prev = first;
    while let Some(&c) = chars.peek() {
        let caret = ctx.atom_expression && c == '^' && prev.is_ascii_digit();
        if !(is_word_part(c, ctx) || caret) {
            break;
        }
        len += c.len_utf8();
        prev = c;
        chars.next();
    }
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATH: ScanContext = ScanContext {
        atom_expression: false,
    };
    const ATOM: ScanContext = ScanContext {
        atom_expression: true,
    };

    fn token_at(src: &str, ctx: ScanContext) -> (Token, usize) {
        match scan(src, 0, ctx) {
            Ok(Scanned {
                lexeme: Lexeme::Token(token),
                len,
            }) => (token, len),
            other => panic!("expected token for {:?}, got {:?}", src, other),
        }
    }

    fn lexeme_at(src: &str, ctx: ScanContext) -> (Lexeme, usize) {
        let scanned = scan(src, 0, ctx).expect("scan failed");
        (scanned.lexeme, scanned.len)
    }

    // ---------------------------------------------------------------
    // 空白与注释
    // ---------------------------------------------------------------

    #[test]
    fn test_whitespace_and_continuation() {
        assert_eq!(lexeme_at("  \tx", MATH), (Lexeme::Whitespace, 3));
        assert_eq!(lexeme_at("\\\nx", MATH), (Lexeme::Whitespace, 2));
        assert_eq!(lexeme_at("\r\nx", MATH), (Lexeme::Newline, 2));
        assert_eq!(lexeme_at("", MATH), (Lexeme::End, 0));
    }

    #[test]
    fn test_comment_forms() {
        assert_eq!(lexeme_at("# note\nx", MATH), (Lexeme::Comment, 6));
        assert_eq!(lexeme_at("// note\nx", MATH), (Lexeme::Comment, 7));
        assert_eq!(lexeme_at("/* a\nb */x", MATH), (Lexeme::Comment, 9));
        assert_eq!(lexeme_at("/** a /* b */ c **/x", MATH), (Lexeme::Comment, 19));
        assert_eq!(lexeme_at("/**/x", MATH), (Lexeme::Comment, 4));
        assert_eq!(lexeme_at("#jx print 1", MATH), (Lexeme::Whitespace, 4));
        assert_eq!(lexeme_at("#jc hidden\nx", MATH), (Lexeme::DiscardStatement, 10));
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines("a\nb\r\nc\rd"), 3);
        assert_eq!(count_lines("no newline"), 0);
    }

    // ---------------------------------------------------------------
    // 字符串
    // ---------------------------------------------------------------

    #[test]
    fn test_string_escapes() {
        let (token, len) = token_at(r#""a\tb\"c\x41é" rest"#, MATH);
        assert_eq!(token.text_value(), Some("a\tb\"cAé"));
        assert_eq!(len, 15);
        assert!(token.is(Tok::String));
    }

    #[test]
    fn test_unterminated_string() {
        let err = scan("\"abc\nprint", 0, MATH).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EndOfCommandUnexpected);
        assert_eq!(err.offset, 4);
    }

    // ---------------------------------------------------------------
    // 数字
    // ---------------------------------------------------------------

    #[test]
    fn test_integer_and_decimal() {
        let (token, len) = token_at("42 ", MATH);
        assert_eq!((token.kind(), token.int(), len), (Tok::Integer, 42, 2));

        let (token, len) = token_at("2.15)", MATH);
        assert_eq!(token.kind(), Tok::Decimal);
        assert_eq!(token.number(), Some(2.15));
        assert_eq!(token.int(), 2_000_015);
        assert_eq!(len, 4);
    }

    #[test]
    fn test_decimal_rejected_before_atom_name() {
        let (token, len) = token_at("1.CA", ATOM);
        assert_eq!((token.kind(), len), (Tok::Integer, 1));
    }

    #[test]
    fn test_exponent_must_be_nonzero() {
        let (token, len) = token_at("2E3", MATH);
        assert_eq!(token.kind(), Tok::Decimal);
        assert_eq!(token.number(), Some(2000.0));
        assert_eq!(len, 3);

        let (token, len) = token_at("2E0", MATH);
        assert_eq!((token.kind(), len), (Tok::Integer, 1));
    }

    #[test]
    fn test_sign_is_never_consumed() {
        let (token, len) = token_at("-5", MATH);
        assert_eq!((token.kind(), len), (Tok::Minus, 1));
    }

    #[test]
    fn test_leading_dot_decimal() {
        let (token, _) = token_at(".5", MATH);
        assert_eq!(token.number(), Some(0.5));
        let (token, _) = token_at(".5", ATOM);
        assert!(token.is(Tok::Per));
    }

    #[test]
    fn test_seqcode_only_in_atom_context() {
        let (token, len) = token_at("123^A", ATOM);
        assert_eq!(token.kind(), Tok::SeqCode);
        assert_eq!(token.int(), (123 << 8) | 'A' as i32);
        assert_eq!(len, 5);

        let (token, _) = token_at("*^b", ATOM);
        assert_eq!(token.int(), seqcode(SEQUENCE_WILDCARD, 'b'));

        let (token, len) = token_at("2^3", MATH);
        assert_eq!((token.kind(), len), (Tok::Integer, 1));
    }

    // ---------------------------------------------------------------
    // 集合、对象、运算符、标识符
    // ---------------------------------------------------------------

    #[test]
    fn test_atom_set_literals() {
        let (token, len) = token_at("({0 2:5}) or", ATOM);
        assert_eq!(len, 9);
        assert_eq!(token.to_string(), "({0 2:5})");

        let (token, _) = token_at("[{1:3}]", ATOM);
        assert_eq!(token.to_string(), "[{1:3}]");

        let (token, _) = token_at("({null})", ATOM);
        assert_eq!(token.to_string(), "({})");

        let (token, _) = token_at("({1 2 3} or x)", ATOM);
        assert!(token.is(Tok::LeftParen));
    }

    #[test]
    fn test_atom_set_range_order() {
        let err = scan("({5:2})", 0, ATOM).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnrecognizedToken(_)));
    }

    #[test]
    fn test_object_id() {
        let (token, len) = token_at("$plane1 ", MATH);
        assert_eq!((token.to_string(), len), ("$plane1".to_string(), 7));
        let (token, _) = token_at("$\"my obj\"", MATH);
        assert_eq!(token.text_value(), Some("my obj"));
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(token_at("<=1", MATH).0.kind(), Tok::OpLe);
        assert_eq!(token_at("<>1", MATH).0.kind(), Tok::OpNe);
        assert_eq!(token_at("=1", MATH).0.kind(), Tok::Assign);
        assert_eq!(token_at("+= 1", MATH).0.to_string(), "op=(+=)");
        assert_eq!(token_at("&&", MATH).0.kind(), Tok::OpAnd);
    }

    #[test]
    fn test_words() {
        assert_eq!(lexeme_at("select all", MATH), (Lexeme::Word, 6));
        assert_eq!(lexeme_at("???", ATOM), (Lexeme::Word, 3));
        assert_eq!(lexeme_at("ala12^b:A", ATOM), (Lexeme::Word, 7));
        assert_eq!(lexeme_at("x2^3", MATH), (Lexeme::Word, 2));
        assert_eq!(lexeme_at("AL* or", ATOM), (Lexeme::Word, 3));
        assert_eq!(lexeme_at("C5' ", ATOM), (Lexeme::Word, 3));
    }

    #[test]
    fn test_unrecognized_character() {
        let err = scan("`", 0, MATH).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnrecognizedToken("`".to_string()));
    }
}
