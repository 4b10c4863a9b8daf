//! # 流程控制链接
//!
//! 打开的控制块保存在一个栈里。每条命令入表后交给 [`FlowStack::link`]，
//! 由它在命令表里回填跳转目标。
//!
//! ## 跳转规则
//!
//! - `if` 链：每个子句跳到下一个子句，最后一个子句跳到 `end if`，
//!   `end if` 跳到它之后的命令
//! - 循环：开头与 `end` 互相指向
//! - `break n` / `continue n`：跳到第 n 层循环的开头，不跨越函数边界
//! - `function`：关闭时整段从命令表中切出

use crate::error::ErrorKind;
use crate::table::CommandTable;
use crate::token::{Tok, Token};

use super::expr::lexeme;

/// 一个打开的控制块
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlowContext {
    /// 开头关键字：`if`、`for`、`while`、`function`
    pub keyword: Tok,
    /// 开头命令的下标
    pub start: usize,
    /// `if` 链中最近一个子句的下标
    pub last_clause: usize,
    pub seen_else: bool,
    /// 单行形式：该行结束时自动补 `end`
    pub force_end: Option<usize>,
    /// 用 `{ }` 界定
    pub brace: bool,
    pub function: Option<FunctionHeader>,
}

impl FlowContext {
    fn new(keyword: Tok, start: usize) -> Self {
        Self {
            keyword,
            start,
            last_clause: start,
            seen_else: false,
            force_end: None,
            brace: false,
            function: None,
        }
    }

    fn is_loop(&self) -> bool {
        matches!(self.keyword, Tok::For | Tok::While)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FunctionHeader {
    pub name: String,
    pub params: Vec<String>,
}

/// 刚关闭的函数：函数体已从主命令表切出
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClosedFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: CommandTable,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FlowStack {
    contexts: Vec<FlowContext>,
}

/// `end` 之后允许出现的关键字
pub(crate) fn closes_block(kind: Tok) -> bool {
    matches!(kind, Tok::If | Tok::For | Tok::While | Tok::Function)
}

fn end_label(keyword: Tok) -> String {
    format!("end {}", keyword.name())
}

impl FlowStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn top(&self) -> Option<&FlowContext> {
        self.contexts.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut FlowContext> {
        self.contexts.last_mut()
    }

    /// 最内层的花括号块
    pub fn innermost_brace(&self) -> Option<&FlowContext> {
        self.contexts.iter().rev().find(|ctx| ctx.brace)
    }

    /// 正在定义的函数名
    pub fn open_function_name(&self) -> Option<&str> {
        self.contexts
            .iter()
            .find_map(|ctx| ctx.function.as_ref().map(|f| f.name.as_str()))
    }

    /// 处理下标为 `index` 的新命令
    pub fn link(
        &mut self,
        table: &mut CommandTable,
        index: usize,
    ) -> Result<Option<ClosedFunction>, ErrorKind> {
        let Some(command) = table.get(index) else {
            return Ok(None);
        };
        let tokens = command.tokens().to_vec();
        let Some(verb) = tokens.first().map(Token::kind) else {
            return Ok(None);
        };
        match verb {
            Tok::If | Tok::For | Tok::While => {
                self.contexts.push(FlowContext::new(verb, index));
                Ok(None)
            }
            Tok::ElseIf | Tok::Else => {
                let ctx = self
                    .contexts
                    .last_mut()
                    .filter(|ctx| ctx.keyword == Tok::If && !ctx.seen_else)
                    .ok_or_else(|| ErrorKind::BadContext(verb.name().to_string()))?;
                table.set_jump(ctx.last_clause, index);
                ctx.last_clause = index;
                ctx.seen_else = verb == Tok::Else;
                Ok(None)
            }
            Tok::EndIf => self.close(table, index, Tok::If, verb.name().to_string()),
            Tok::End => {
                let keyword = tokens.get(1).map_or(Tok::Nada, Token::kind);
                self.close(table, index, keyword, end_label(keyword))
            }
            Tok::Break | Tok::Continue => {
                let depth = tokens.get(1).map_or(1, |t| t.int().max(1)) as usize;
                let target = self
                    .contexts
                    .iter()
                    .rev()
                    .take_while(|ctx| ctx.keyword != Tok::Function)
                    .filter(|ctx| ctx.is_loop())
                    .nth(depth - 1)
                    .map(|ctx| ctx.start)
                    .ok_or_else(|| ErrorKind::BadContext(verb.name().to_string()))?;
                table.set_jump(index, target);
                Ok(None)
            }
            Tok::Function => {
                if self.open_function_name().is_some() {
                    return Err(ErrorKind::BadContext(verb.name().to_string()));
                }
                let mut ctx = FlowContext::new(Tok::Function, index);
                ctx.function = Some(function_header(&tokens));
                self.contexts.push(ctx);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn close(
        &mut self,
        table: &mut CommandTable,
        index: usize,
        keyword: Tok,
        label: String,
    ) -> Result<Option<ClosedFunction>, ErrorKind> {
        if self.top().is_none_or(|ctx| ctx.keyword != keyword) {
            return Err(ErrorKind::BadContext(label));
        }
        let Some(ctx) = self.contexts.pop() else {
            return Err(ErrorKind::BadContext(label));
        };
        match keyword {
            Tok::If => {
                table.set_jump(ctx.last_clause, index);
                table.set_jump(index, index + 1);
                Ok(None)
            }
            Tok::Function => {
                let mut segment = table.cut(ctx.start..index + 1);
                let body = segment.cut(1..segment.len().saturating_sub(1));
                let header = ctx.function.unwrap_or(FunctionHeader {
                    name: String::new(),
                    params: Vec::new(),
                });
                Ok(Some(ClosedFunction {
                    name: header.name,
                    params: header.params,
                    body,
                }))
            }
            _ => {
                table.set_jump(ctx.start, index);
                table.set_jump(index, ctx.start);
                Ok(None)
            }
        }
    }
}

/// `function name(a, b)` 的名字与参数
fn function_header(tokens: &[Token]) -> FunctionHeader {
    let name = tokens.get(1).map(lexeme).unwrap_or_default();
    let params = tokens
        .iter()
        .skip(2)
        .filter(|t| t.is(Tok::Identifier))
        .map(lexeme)
        .collect();
    FunctionHeader { name, params }
}
