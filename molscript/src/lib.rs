//! # MolScript
//!
//! 分子可视化脚本语言的编译器。
//!
//! ## 架构概述
//!
//! `molscript` 是纯逻辑库，不做任何 IO。它把脚本文本编译成求值器可以
//! 直接执行的命令表：
//!
//! ```text
//! 脚本文本 ──► Compiler::compile ──► CompiledScript
//!                                     ├─ CommandTable（命令 + 行号 + 偏移 + 跳转）
//!                                     ├─ 局部变量名
//!                                     └─ 脚本函数
//! ```
//!
//! 原子选择表达式编译为后缀形式；数学表达式保留中缀，只编译其中的 `{...}`。
//!
//! ## 使用示例
//!
//! ```ignore
//! use molscript::{CompileOptions, Compiler, SharedFunctions};
//!
//! let mut compiler = Compiler::new(SharedFunctions::new());
//! let compiled = compiler.compile("demo.spt", "select ala and :A", &CompileOptions::default())?;
//! println!("{}", compiled.listing());
//! ```
//!
//! ## 模块结构
//!
//! - [`token`]：Token 与注册表
//! - [`compiler`]：扫描、组装、流程链接、表达式编译
//! - [`table`]：命令表（编译器与求值器之间的契约）
//! - [`function`]：脚本函数与两级注册表
//! - [`error`]：错误类型
//! - [`diagnostic`]：诊断与静态检查
//! - [`i18n`]：错误消息本地化

pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod function;
pub mod i18n;
pub mod table;
pub mod token;

// 重导出核心类型
pub use compiler::{CompileOptions, CompiledScript, Compiler, SEQUENCE_WILDCARD, compile};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, check_script};
pub use error::{CompileError, CompileFailure, ErrorKind};
pub use function::{FunctionRegistry, ScriptFunction, SharedFunctions};
pub use i18n::{MessageCatalog, SimplifiedChinese, Untranslated};
pub use table::{Command, CommandTable, JumpTarget};
pub use token::{AtomSet, Tok, Token, TokenRegistry, TokenValue};
