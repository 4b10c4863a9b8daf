//! # 命令组装
//!
//! 逐个读取词素，把它们拼成命令，决定命令边界，
//! 然后交给流程链接与表达式编译，最后写入命令表。
//!
//! ## 命令边界
//!
//! - 行尾（续行、括号未闭合时除外）
//! - 括号深度为 0 的 `;`
//! - 流程开头的条件括号闭合处：`if (x) print x end if`
//! - 流程块打开时出现的 `else`、`elseif`、`end`、`endif`
//! - `else`、`endif` 本身（不带参数）

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use super::CompileOptions;
use super::expr::{self, Cursor, lexeme};
use super::flow::{FlowStack, closes_block};
use super::scanner::{Lexeme, SEQUENCE_WILDCARD, ScanContext, count_lines, scan, seqcode};
use crate::diagnostic::Diagnostic;
use crate::error::{CompileError, ErrorKind};
use crate::function::{FunctionRegistry, ScriptFunction};
use crate::table::{Command, CommandTable};
use crate::token::{Tok, Token, TokenRegistry, TokenValue};

/// 一次编译的产物
#[derive(Debug, Default)]
pub(crate) struct SessionOutput {
    pub table: CommandTable,
    pub local_variables: BTreeSet<String>,
    pub functions: Vec<ScriptFunction>,
    pub warnings: Vec<Diagnostic>,
}

/// 一次编译的全部状态；不跨编译复用
pub(crate) struct Session<'c> {
    registry: &'c TokenRegistry,
    functions: &'c FunctionRegistry,
    options: &'c CompileOptions,
    script_id: &'c str,
    src: &'c str,
    pos: usize,
    /// 当前行号（从 1 开始）
    line: usize,

    // 正在组装的命令
    tokens: Vec<Token>,
    token_offsets: Vec<usize>,
    cmd_offset: usize,
    cmd_line: usize,
    parens: usize,
    brackets: usize,
    braces: usize,
    /// 上一条命令打开了流程块，下一个语句开头的 `{` 是块的开始
    pending_brace: bool,

    table: CommandTable,
    flow: FlowStack,
    local_variables: BTreeSet<String>,
    /// 已声明的变量与 `define` 的集合名（小写）
    known_names: HashSet<String>,
    script_functions: Vec<ScriptFunction>,
    warnings: Vec<Diagnostic>,
}

impl<'c> Session<'c> {
    pub fn new(
        registry: &'c TokenRegistry,
        functions: &'c FunctionRegistry,
        options: &'c CompileOptions,
        script_id: &'c str,
        src: &'c str,
    ) -> Self {
        Self {
            registry,
            functions,
            options,
            script_id,
            src,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            token_offsets: Vec::new(),
            cmd_offset: 0,
            cmd_line: 1,
            parens: 0,
            brackets: 0,
            braces: 0,
            pending_brace: false,
            table: CommandTable::new(),
            flow: FlowStack::new(),
            local_variables: BTreeSet::new(),
            known_names: HashSet::new(),
            script_functions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<SessionOutput, CompileError> {
        let src = self.src;
        loop {
            let scanned = scan(src, self.pos, self.scan_context())?;
            let start = self.pos;
            let text = &src[start..start + scanned.len];
            match scanned.lexeme {
                Lexeme::End => break,
                Lexeme::Whitespace | Lexeme::Comment => {
                    self.line += count_lines(text);
                    self.pos += scanned.len;
                }
                Lexeme::DiscardStatement => {
                    self.clear_command();
                    self.pos += scanned.len;
                }
                Lexeme::Newline => {
                    self.end_of_line(start)?;
                    self.pos += scanned.len;
                    self.line += 1;
                }
                Lexeme::Word => {
                    self.pos += scanned.len;
                    self.add_word(text, start)?;
                }
                Lexeme::Token(token) => {
                    self.pos += scanned.len;
                    self.add_token(token, start)?;
                }
            }
        }
        self.end_of_script()?;
        Ok(SessionOutput {
            table: self.table,
            local_variables: self.local_variables,
            functions: self.script_functions,
            warnings: self.warnings,
        })
    }

    fn verb(&self) -> Option<Tok> {
        self.tokens.first().map(Token::kind)
    }

    fn scan_context(&self) -> ScanContext {
        let atom_command = self
            .verb()
            .is_some_and(|verb| verb.takes_atom_expression() || verb == Tok::Define);
        ScanContext {
            atom_expression: atom_command || (self.braces > 0 && !self.tokens.is_empty()),
        }
    }

    fn nesting(&self) -> usize {
        self.parens + self.brackets + self.braces
    }

    fn clear_command(&mut self) {
        self.tokens.clear();
        self.token_offsets.clear();
        self.parens = 0;
        self.brackets = 0;
        self.braces = 0;
    }

    //=========================================================================
    // 词素 → token
    //=========================================================================

    fn add_word(&mut self, text: &str, offset: usize) -> Result<(), CompileError> {
        if text.eq_ignore_ascii_case("else") {
            if let Some(extra) = self.following_if() {
                self.pos += extra;
                let token = self
                    .registry
                    .lookup("elseif")
                    .cloned()
                    .unwrap_or_else(|| Token::text(Tok::ElseIf, "elseif"));
                return self.add_token(token, offset);
            }
        }

        let single_letter = text.chars().count() == 1 && text.chars().all(char::is_alphabetic);
        let token = if self.brackets > 0 || single_letter {
            Token::identifier(text)
        } else {
            match self.registry.lookup(text) {
                Some(token) => token.clone(),
                None => Token::identifier(text),
            }
        };

        if token.is(Tok::Identifier)
            && !self.known_names.contains(&text.to_lowercase())
            && self.splits_residue_words()
        {
            if let Some((name, sequence)) = split_residue_word(text) {
                let digits_at = offset + lexeme(&name).len();
                self.add_token(name, offset)?;
                return self.add_token(sequence, digits_at);
            }
        }
        self.add_token(token, offset)
    }

    /// `else` 之后紧跟 `if` 时返回要额外吞掉的长度
    fn following_if(&self) -> Option<usize> {
        let rest = &self.src[self.pos..];
        let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        if gap == 0 {
            return None;
        }
        let word = rest.get(gap..gap + 2)?;
        let after = rest[gap + 2..].chars().next();
        let ends = after.is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        (word.eq_ignore_ascii_case("if") && ends).then_some(gap + 2)
    }

    /// 原子表达式里未声明的 `ala12` 拆成残基名与序列号
    fn splits_residue_words(&self) -> bool {
        if !self.scan_context().atom_expression {
            return false;
        }
        // define 的集合名不拆
        if self.tokens.len() == 1 && matches!(self.verb(), Some(Tok::DefineCmd | Tok::Define)) {
            return false;
        }
        !self.tokens.last().is_some_and(|t| {
            matches!(
                t.kind(),
                Tok::Per | Tok::Percent | Tok::Colon | Tok::Define | Tok::Divide
            )
        })
    }

    fn add_token(&mut self, token: Token, offset: usize) -> Result<(), CompileError> {
        let kind = token.kind();
        if self.tokens.is_empty() {
            match kind {
                Tok::RightBrace if self.flow.innermost_brace().is_some() => {
                    return self.close_brace(offset);
                }
                Tok::RightBrace => {
                    return Err(CompileError::new(
                        ErrorKind::TokenUnexpected("}".to_string()),
                        offset,
                    ));
                }
                Tok::LeftBrace if self.pending_brace => {
                    self.open_brace();
                    return Ok(());
                }
                Tok::Semicolon => return Ok(()),
                _ => {}
            }
            self.cmd_offset = offset;
            self.cmd_line = self.line;
            self.pending_brace = false;
        } else if self.nesting() == 0 {
            match kind {
                Tok::Semicolon => return self.finish_command(offset),
                k if k.is_flow_continuation() && !self.flow.is_empty() => {
                    self.finish_command(offset)?;
                    return self.add_token(token, offset);
                }
                Tok::RightBrace if self.flow.innermost_brace().is_some() => {
                    self.finish_command(offset)?;
                    return self.close_brace(offset);
                }
                Tok::LeftBrace if self.verb().is_some_and(opens_brace_block) => {
                    self.finish_command(offset)?;
                    self.open_brace();
                    return Ok(());
                }
                _ => {}
            }
        }

        match kind {
            Tok::LeftParen => self.parens += 1,
            Tok::RightParen => self.parens = self.parens.saturating_sub(1),
            Tok::LeftSquare => self.brackets += 1,
            Tok::RightSquare => self.brackets = self.brackets.saturating_sub(1),
            Tok::LeftBrace => self.braces += 1,
            Tok::RightBrace => self.braces = self.braces.saturating_sub(1),
            _ => {}
        }
        self.tokens.push(token);
        self.token_offsets.push(offset);
        self.after_push(kind)
    }

    /// 入栈后检查命令是否就此结束
    fn after_push(&mut self, kind: Tok) -> Result<(), CompileError> {
        let Some(verb) = self.verb() else {
            return Ok(());
        };
        let count = self.tokens.len();
        if count == 1 {
            if matches!(verb, Tok::Else | Tok::EndIf) {
                return self.finish_command(self.pos);
            }
            if verb.takes_implicit_string() {
                self.read_implicit_string();
            }
            return Ok(());
        }
        if verb == Tok::End && count == 2 {
            return self.finish_command(self.pos);
        }
        let condition_at = if verb == Tok::Function { 2 } else { 1 };
        let is_condition = (verb.has_flow_condition() || verb == Tok::Function)
            && self
                .tokens
                .get(condition_at)
                .is_some_and(|t| t.is(Tok::LeftParen));
        if is_condition && kind == Tok::RightParen && self.nesting() == 0 {
            return self.finish_command(self.pos);
        }
        Ok(())
    }

    /// 隐式字符串命令：余下的整行（到 `;` 为止）是一个字符串参数
    fn read_implicit_string(&mut self) {
        let rest = &self.src[self.pos..];
        let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let body = &rest[gap..];
        if body.starts_with(['"', '\'']) {
            return;
        }
        let mut end = body.find(['\n', '\r', ';']).unwrap_or(body.len());
        if !self.flow.is_empty() {
            if let Some(at) = continuation_word_at(&body[..end]) {
                end = at;
            }
        }
        if self.flow.innermost_brace().is_some() {
            if let Some(at) = closing_brace_at(&body[..end]) {
                end = at;
            }
        }
        let text = body[..end].trim_end();
        if !text.is_empty() {
            self.tokens.push(Token::string(text));
            self.token_offsets.push(self.pos + gap);
        }
        self.pos += gap + text.len();
    }

    //=========================================================================
    // 行与块
    //=========================================================================

    fn end_of_line(&mut self, at: usize) -> Result<(), CompileError> {
        if self.nesting() > 0 && !self.tokens.is_empty() {
            return Ok(());
        }
        self.finish_command(at)?;
        self.close_forced(at)
    }

    /// 补齐本行的单行流程块
    fn close_forced(&mut self, at: usize) -> Result<(), CompileError> {
        while let Some(keyword) = self
            .flow
            .top()
            .filter(|ctx| !ctx.brace && ctx.force_end.is_some_and(|line| line <= self.line))
            .map(|ctx| ctx.keyword)
        {
            self.synthesize_end(keyword, at)?;
        }
        Ok(())
    }

    fn open_brace(&mut self) {
        self.pending_brace = false;
        if let Some(ctx) = self.flow.top_mut() {
            ctx.brace = true;
            ctx.force_end = None;
        }
    }

    /// 语句开头的 `}`：关闭最内层的花括号块
    fn close_brace(&mut self, at: usize) -> Result<(), CompileError> {
        while let Some(keyword) = self
            .flow
            .top()
            .filter(|ctx| !ctx.brace)
            .map(|ctx| ctx.keyword)
        {
            self.synthesize_end(keyword, at)?;
        }
        let Some(keyword) = self.flow.top().map(|ctx| ctx.keyword) else {
            return Ok(());
        };
        if keyword == Tok::If && self.else_follows() {
            if let Some(ctx) = self.flow.top_mut() {
                ctx.brace = false;
            }
            return Ok(());
        }
        self.synthesize_end(keyword, at)
    }

    /// `}` 之后（可跨行）是否紧跟 `else` / `elseif`
    fn else_follows(&self) -> bool {
        let rest = self.src[self.pos..].trim_start();
        let word: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        word.eq_ignore_ascii_case("else") || word.eq_ignore_ascii_case("elseif")
    }

    fn synthesize_end(&mut self, keyword: Tok, at: usize) -> Result<(), CompileError> {
        self.cmd_line = self.line;
        self.cmd_offset = at;
        let tokens = vec![
            Token::text(Tok::End, Tok::End.name()),
            Token::text(keyword, keyword.name()),
        ];
        self.emit(tokens)
    }

    fn end_of_script(&mut self) -> Result<(), CompileError> {
        let end = self.src.len();
        self.finish_command(end)?;
        while let Some(keyword) = self
            .flow
            .top()
            .filter(|ctx| !ctx.brace && ctx.force_end.is_some())
            .map(|ctx| ctx.keyword)
        {
            self.synthesize_end(keyword, end)?;
        }
        if let Some(ctx) = self.flow.top() {
            return Err(CompileError::new(
                ErrorKind::MissingEnd(ctx.keyword.name().to_string()),
                end,
            ));
        }
        Ok(())
    }

    //=========================================================================
    // 命令完成
    //=========================================================================

    fn finish_command(&mut self, end_offset: usize) -> Result<(), CompileError> {
        if self.tokens.is_empty() {
            return Ok(());
        }
        if self.nesting() > 0 {
            return Err(CompileError::new(
                ErrorKind::EndOfCommandUnexpected,
                end_offset,
            ));
        }
        let tokens = std::mem::take(&mut self.tokens);
        let offsets = std::mem::take(&mut self.token_offsets);
        let tokens = self.assemble(tokens, offsets, end_offset)?;
        self.emit(tokens)?;

        let inline_opener = self
            .table
            .commands()
            .last()
            .and_then(Command::verb)
            .is_some_and(|verb| matches!(verb, Tok::If | Tok::For | Tok::While));
        if inline_opener && self.pending_brace && self.rest_of_line_has_code() {
            if let Some(ctx) = self.flow.top_mut() {
                ctx.force_end = Some(self.line);
            }
        }
        Ok(())
    }

    fn rest_of_line_has_code(&self) -> bool {
        let rest = &self.src[self.pos..];
        let line = rest[..rest.find(['\n', '\r']).unwrap_or(rest.len())].trim_start();
        !(line.is_empty()
            || line.starts_with('{')
            || line.starts_with('#')
            || line.starts_with("//")
            || line.starts_with("/*"))
    }

    /// 写入命令表并链接流程
    fn emit(&mut self, tokens: Vec<Token>) -> Result<(), CompileError> {
        let verb = tokens.first().map(Token::kind);
        let command = Command::new(tokens);
        if self.options.debug_trace {
            debug!(
                script = %self.script_id,
                index = self.table.len(),
                line = self.cmd_line,
                command = %command,
                "命令入表"
            );
        }
        let index = self.table.push(command, self.cmd_line, self.cmd_offset);
        let closed = self
            .flow
            .link(&mut self.table, index)
            .map_err(|kind| CompileError::new(kind, self.cmd_offset))?;

        if let Some(closed) = closed {
            let redefined = self.functions.contains(&closed.name)
                || self
                    .script_functions
                    .iter()
                    .any(|f| f.name.eq_ignore_ascii_case(&closed.name));
            if redefined {
                self.warn(format!("function '{}' redefined", closed.name));
                self.script_functions
                    .retain(|f| !f.name.eq_ignore_ascii_case(&closed.name));
            }
            self.script_functions.push(ScriptFunction {
                name: closed.name,
                params: closed.params,
                body: closed.body,
                script_id: self.script_id.to_string(),
            });
        }

        self.pending_brace = verb.is_some_and(opens_brace_block);
        Ok(())
    }

    fn warn(&mut self, message: String) {
        if !self.options.silent {
            warn!(script = %self.script_id, line = self.cmd_line, "{}", message);
        }
        self.warnings
            .push(Diagnostic::warn(self.script_id, message).with_line(self.cmd_line));
    }

    //=========================================================================
    // 命令检查与表达式编译
    //=========================================================================

    fn assemble(
        &mut self,
        mut tokens: Vec<Token>,
        mut offsets: Vec<usize>,
        end_offset: usize,
    ) -> Result<Vec<Token>, CompileError> {
        let first = tokens[0].clone();
        if first.is(Tok::Define) {
            tokens[0] = Token::text(Tok::DefineCmd, Tok::DefineCmd.name());
        } else if !first.kind().is_command() {
            if self.is_function_call(&tokens) {
                tokens[0] = first.retyped(Tok::Call);
            } else if is_implicit_assignment(&tokens) {
                tokens.insert(0, Token::text(Tok::Set, Tok::Set.name()));
                offsets.insert(0, self.cmd_offset);
            } else {
                return Err(CompileError::new(ErrorKind::CommandExpected, offsets[0]));
            }
        }

        let verb = tokens[0].kind();
        let arg_offset = offsets.get(1).copied().unwrap_or(end_offset);
        if verb.no_args() && tokens.len() > 1 {
            return Err(CompileError::new(ErrorKind::BadArgumentCount, arg_offset));
        }
        if verb.defaults_on() && tokens.len() == 1 {
            tokens.push(Token::text(Tok::On, Tok::On.name()));
            offsets.push(end_offset);
        }

        match verb {
            Tok::End => {
                let Some(block) = tokens.get(1) else {
                    return Err(CompileError::new(ErrorKind::BadArgumentCount, arg_offset));
                };
                if !closes_block(block.kind()) {
                    return Err(CompileError::new(
                        ErrorKind::UnrecognizedParameter("END".to_string(), lexeme(block)),
                        arg_offset,
                    ));
                }
            }
            Tok::Break | Tok::Continue => {
                if tokens.len() > 2 {
                    return Err(CompileError::new(ErrorKind::BadArgumentCount, offsets[2]));
                }
                if let Some(depth) = tokens.get(1) {
                    if !depth.is(Tok::Integer) || depth.int() < 1 {
                        return Err(CompileError::new(ErrorKind::NumberExpected, arg_offset));
                    }
                }
            }
            Tok::Function if tokens.len() < 2 => {
                return Err(CompileError::new(ErrorKind::BadArgumentCount, arg_offset));
            }
            Tok::Var => self.declare_variables(&tokens[1..]),
            Tok::For => {
                if let [_, paren, var, ..] = tokens.as_slice() {
                    if paren.is(Tok::LeftParen) && var.is(Tok::Var) {
                        self.declare_variables(&tokens[3..]);
                    }
                }
            }
            _ => {}
        }

        let comma_is_or = verb.comma_is_or();
        if verb.takes_atom_expression() {
            return self.compile_atom_command(tokens, &offsets, end_offset);
        }
        let cursor = |from: usize| {
            Cursor::new(
                &tokens[from..],
                &offsets[from..],
                end_offset,
                &self.known_names,
                comma_is_or,
            )
        };
        if verb.takes_math_expression() {
            let body = expr::embedded_groups(cursor(1), false)?;
            return Ok(with_verb(&tokens[0], body));
        }
        if verb.embeds_expressions() {
            let body = expr::embedded_groups(cursor(1), true)?;
            return Ok(with_verb(&tokens[0], body));
        }
        Ok(tokens)
    }

    /// `var a, b = 1`：逗号之后的第一个标识符都是新变量
    fn declare_variables(&mut self, tokens: &[Token]) {
        let mut expect_name = true;
        let mut depth = 0usize;
        for token in tokens {
            match token.kind() {
                Tok::LeftParen | Tok::LeftSquare | Tok::LeftBrace => depth += 1,
                Tok::RightParen | Tok::RightSquare | Tok::RightBrace => {
                    depth = depth.saturating_sub(1)
                }
                Tok::Comma if depth == 0 => {
                    expect_name = true;
                    continue;
                }
                Tok::Identifier if expect_name && depth == 0 => {
                    let name = lexeme(token).to_lowercase();
                    self.known_names.insert(name.clone());
                    self.local_variables.insert(name);
                }
                _ => {}
            }
            expect_name = false;
        }
    }

    fn is_function_call(&self, tokens: &[Token]) -> bool {
        let [name, paren, ..] = tokens else {
            return false;
        };
        if !name.is(Tok::Identifier) || !paren.is(Tok::LeftParen) {
            return false;
        }
        let name = lexeme(name);
        self.functions.contains(&name)
            || self
                .script_functions
                .iter()
                .any(|f| f.name.eq_ignore_ascii_case(&name))
            || self
                .flow
                .open_function_name()
                .is_some_and(|open| open.eq_ignore_ascii_case(&name))
    }

    fn compile_atom_command(
        &mut self,
        tokens: Vec<Token>,
        offsets: &[usize],
        end_offset: usize,
    ) -> Result<Vec<Token>, CompileError> {
        let verb = tokens[0].kind();
        let mut out = vec![tokens[0].clone()];
        let mut from = 1;

        if verb == Tok::DefineCmd {
            let Some(name) = tokens.get(1) else {
                return Err(CompileError::new(ErrorKind::BadArgumentCount, end_offset));
            };
            let kind = name.kind();
            let text = lexeme(name);
            if kind.is_command() {
                return Err(CompileError::new(
                    ErrorKind::InvalidExpressionToken(text),
                    offsets[1],
                ));
            }
            if kind != Tok::Identifier && !self.options.pre_defining {
                self.warn(format!("redefining predefined name '{}'", text));
            }
            self.known_names.insert(text.to_lowercase());
            out.push(Token::identifier(text));
            from = 2;
        }

        while tokens.get(from).is_some_and(|t| {
            matches!(
                t.kind(),
                Tok::On | Tok::Off | Tok::Add | Tok::Remove | Tok::Group | Tok::Bonds
            )
        }) {
            out.push(tokens[from].clone());
            from += 1;
        }

        if tokens.get(from).is_some_and(|t| t.is(Tok::ObjectId)) {
            out.extend_from_slice(&tokens[from..]);
            return Ok(out);
        }

        let cursor = Cursor::new(
            &tokens[from..],
            &offsets[from..],
            end_offset,
            &self.known_names,
            verb.comma_is_or(),
        );
        out.extend(expr::atom_expression(cursor)?);
        Ok(out)
    }
}

/// 可以用 `{ }` 界定块体的命令
fn opens_brace_block(verb: Tok) -> bool {
    verb.has_flow_condition() || matches!(verb, Tok::Else | Tok::Function)
}

fn with_verb(verb: &Token, body: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(verb.clone());
    out.extend(body);
    out
}

/// `x = 1`、`x += 1`、`x[2] = 1`、`x++`
fn is_implicit_assignment(tokens: &[Token]) -> bool {
    if let [_, op] = tokens {
        return matches!(op.kind(), Tok::PlusPlus | Tok::MinusMinus);
    }
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(1) {
        match token.kind() {
            Tok::LeftParen | Tok::LeftSquare | Tok::LeftBrace => depth += 1,
            Tok::RightParen | Tok::RightSquare | Tok::RightBrace => {
                depth = depth.saturating_sub(1)
            }
            Tok::Assign | Tok::CompoundAssign if depth == 0 => return i + 1 < tokens.len(),
            _ => {}
        }
    }
    false
}

/// 隐式字符串中第一个独立的 `end`/`else`/`elseif`/`endif` 的位置
fn continuation_word_at(text: &str) -> Option<usize> {
    let mut word_start = None;
    for (i, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        if c.is_whitespace() {
            if let Some(start) = word_start.take() {
                let word = text[start..i].to_ascii_lowercase();
                if start > 0 && matches!(word.as_str(), "end" | "else" | "elseif" | "endif") {
                    return Some(start);
                }
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    None
}

/// 花括号块内，隐式字符串中关闭块的 `}` 的位置
///
/// 独立的 `}` 或位于行尾的 `}` 关闭块；字符串自身 `{ }` 里的不算。
fn closing_brace_at(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            '}' => {
                let after = &text[i + 1..];
                let standalone = text[..i].ends_with([' ', '\t']) || i == 0;
                if after.trim().is_empty() || (standalone && after.starts_with([' ', '\t'])) {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// `ala12` → (`ala`, `12`)，`ala12^b` → (`ala`, seqcode)
fn split_residue_word(text: &str) -> Option<(Token, Token)> {
    let letters = text.chars().take_while(char::is_ascii_alphabetic).count();
    if !(1..=3).contains(&letters) {
        return None;
    }
    let rest = &text[letters..];
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let seq: i32 = rest[..digits].parse().ok().filter(|&n| n <= SEQUENCE_WILDCARD)?;
    let name = Token::identifier(&text[..letters]);
    let sequence = match &rest.as_bytes()[digits..] {
        [] => Token::integer(seq),
        [b'^'] => Token::with_int_value(
            Tok::SeqCode,
            seqcode(seq, '\0'),
            TokenValue::Text(rest.to_string()),
        ),
        [b'^', c] if c.is_ascii_alphabetic() || matches!(*c, b'?' | b'*') => {
            Token::with_int_value(
                Tok::SeqCode,
                seqcode(seq, *c as char),
                TokenValue::Text(rest.to_string()),
            )
        }
        _ => return None,
    };
    Some((name, sequence))
}
