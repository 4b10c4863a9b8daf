//! # 命令表
//!
//! 编译器的输出，也是编译器与求值器之间的契约。
//!
//! ## 设计说明
//!
//! - [`Command`] 是一条命令的 token 序列，构造后长度固定
//! - [`CommandTable`] 按下标保存命令，以及并行的行号、偏移、跳转目标数组
//! - 跳转目标不写进 token，见 [`JumpTarget`]

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::token::{Tok, Token};

/// 跳转目标（命令下标）
///
/// 最高位保留给求值器，表示"上游分支已满足"。编译器只生成非负目标。
/// 目标可以等于命令表长度，表示跳到脚本末尾。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JumpTarget(i32);

impl JumpTarget {
    pub fn new(index: usize) -> Self {
        Self(i32::try_from(index).unwrap_or(i32::MAX))
    }

    /// 目标命令下标（忽略满足标记）
    pub fn index(self) -> usize {
        let raw = if self.0 < 0 { !self.0 } else { self.0 };
        raw as usize
    }

    /// 带"已满足"标记的副本
    pub fn satisfied(self) -> Self {
        if self.0 < 0 { self } else { Self(!self.0) }
    }

    pub fn is_satisfied(self) -> bool {
        self.0 < 0
    }

    /// 原始整数值
    pub fn raw(self) -> i32 {
        self.0
    }

    fn shifted_down(self, by: usize) -> Self {
        Self::new(self.index().saturating_sub(by))
    }
}

impl fmt::Display for JumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_satisfied() {
            write!(f, "~{}", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

/// 一条编译好的命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command {
    tokens: Vec<Token>,
}

impl Command {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// 命令动词
    pub fn verb(&self) -> Option<Tok> {
        self.tokens.first().map(Token::kind)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 动词之后的 token 种类
    pub fn argument_kinds(&self) -> Vec<Tok> {
        self.tokens.iter().skip(1).map(Token::kind).collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// 命令表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandTable {
    commands: Vec<Command>,
    /// 每条命令起始处的源码行号（从 1 开始）
    line_numbers: Vec<usize>,
    /// 每条命令起始处的源码字节偏移
    offsets: Vec<usize>,
    jumps: Vec<Option<JumpTarget>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条命令，返回其下标
    pub fn push(&mut self, command: Command, line: usize, offset: usize) -> usize {
        self.commands.push(command);
        self.line_numbers.push(line);
        self.offsets.push(offset);
        self.jumps.push(None);
        self.commands.len() - 1
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn line_numbers(&self) -> &[usize] {
        &self.line_numbers
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.line_numbers.get(index).copied()
    }

    pub fn jump(&self, index: usize) -> Option<JumpTarget> {
        self.jumps.get(index).copied().flatten()
    }

    pub(crate) fn set_jump(&mut self, index: usize, target: usize) {
        if let Some(slot) = self.jumps.get_mut(index) {
            *slot = Some(JumpTarget::new(target));
        }
    }

    /// 所有跳转目标都落在 `0..=len` 内
    pub fn targets_are_valid(&self) -> bool {
        self.jumps
            .iter()
            .flatten()
            .all(|target| target.index() <= self.commands.len())
    }

    /// 切出一段命令并从本表删除
    ///
    /// 返回的表下标从 0 开始，段内跳转目标同步平移；
    /// 行号与偏移保持源码中的原值。
    pub(crate) fn cut(&mut self, range: Range<usize>) -> CommandTable {
        let start = range.start;
        let commands: Vec<Command> = self.commands.drain(range.clone()).collect();
        let line_numbers = self.line_numbers.drain(range.clone()).collect();
        let offsets = self.offsets.drain(range.clone()).collect();
        let jumps = self
            .jumps
            .drain(range)
            .map(|jump| jump.map(|target| target.shifted_down(start)))
            .collect();
        CommandTable {
            commands,
            line_numbers,
            offsets,
            jumps,
        }
    }

    /// 可读的命令列表，每行一条：`下标: 命令 [-> 跳转目标]`
    pub fn listing(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: {}", i, command)?;
            if let Some(target) = self.jump(i) {
                write!(f, " -> {}", target)?;
            }
        }
        Ok(())
    }
}
