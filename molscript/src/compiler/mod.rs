//! # Compiler 模块
//!
//! 脚本编译器：脚本文本 → 命令表。
//!
//! ## 架构
//!
//! ```text
//! 源码 → [scanner: 词素] → [assembler: 命令边界] → [flow: 跳转链接]
//!                                      └─→ [expr: 中缀 → 后缀] → CommandTable
//! ```
//!
//! ## 设计原则
//!
//! - 遇到第一个错误即中止，不输出部分结果
//! - 每次编译的状态都在一个 `Session` 里，编译器实例只保存注册表
//! - 良性问题（重定义等）记为警告，不中止编译
//!
//! ## 模块结构
//!
//! - `scanner`: 字符扫描
//! - `assembler`: 命令组装
//! - `flow`: 流程控制链接
//! - `expr`: 表达式编译

mod assembler;
mod expr;
mod flow;
mod scanner;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::error::CompileFailure;
use crate::function::{FunctionRegistry, ScriptFunction, SharedFunctions};
use crate::i18n::{MessageCatalog, Untranslated};
use crate::table::CommandTable;
use crate::token::TokenRegistry;

use assembler::Session;

pub use scanner::SEQUENCE_WILDCARD;
pub(crate) use scanner::count_lines;

/// 编译选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// 允许静默覆盖预定义名字
    pub pre_defining: bool,
    /// 不输出警告日志（警告仍然收集在结果里）
    pub silent: bool,
    /// 每条命令入表时输出 debug 日志
    pub debug_trace: bool,
    /// 只检查语法：不注册函数
    pub syntax_check_only: bool,
}

impl CompileOptions {
    pub fn pre_defining(mut self, on: bool) -> Self {
        self.pre_defining = on;
        self
    }

    pub fn silent(mut self, on: bool) -> Self {
        self.silent = on;
        self
    }

    pub fn debug_trace(mut self, on: bool) -> Self {
        self.debug_trace = on;
        self
    }

    pub fn syntax_check_only(mut self, on: bool) -> Self {
        self.syntax_check_only = on;
        self
    }
}

/// 编译结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledScript {
    pub script_id: String,
    /// 命令表（含行号、偏移、跳转目标）
    pub table: CommandTable,
    /// `var` 声明的局部变量名（小写）
    pub local_variables: BTreeSet<String>,
    /// 脚本中定义的函数，按关闭顺序
    pub functions: Vec<ScriptFunction>,
    pub warnings: Vec<Diagnostic>,
}

impl CompiledScript {
    /// 可读的命令列表
    pub fn listing(&self) -> String {
        self.table.listing()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 脚本编译器
///
/// 持有词素注册表、函数注册表与消息目录；可以连续编译多个脚本。
/// 同一实例不能同时用于多个编译。
pub struct Compiler {
    registry: TokenRegistry,
    functions: FunctionRegistry,
    catalog: Box<dyn MessageCatalog>,
}

impl Compiler {
    /// 使用内置注册表创建编译器，共享函数注册表由调用方提供
    pub fn new(shared: SharedFunctions) -> Self {
        Self {
            registry: TokenRegistry::standard(),
            functions: FunctionRegistry::new(shared),
            catalog: Box::new(Untranslated),
        }
    }

    pub fn with_registry(mut self, registry: TokenRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_catalog(mut self, catalog: impl MessageCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// 编译脚本
    ///
    /// # 参数
    ///
    /// - `script_id`: 脚本标识符（用于诊断）
    /// - `script`: 脚本文本
    /// - `options`: 编译选项
    ///
    /// # 返回
    ///
    /// 成功时返回命令表等产物；失败时返回带行号与标注源码行的 [`CompileFailure`]。
    /// 成功且不是只检查语法时，脚本中定义的函数注册到函数注册表。
    pub fn compile(
        &mut self,
        script_id: &str,
        script: &str,
        options: &CompileOptions,
    ) -> Result<CompiledScript, CompileFailure> {
        let session = Session::new(
            &self.registry,
            &self.functions,
            options,
            script_id,
            script,
        );
        let output = session.run().map_err(|error| {
            CompileFailure::from_error(error, script_id, script, self.catalog.as_ref())
        })?;

        if !options.syntax_check_only {
            for function in &output.functions {
                self.functions.register(function.clone());
            }
        }

        Ok(CompiledScript {
            script_id: script_id.to_string(),
            table: output.table,
            local_variables: output.local_variables,
            functions: output.functions,
            warnings: output.warnings,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(SharedFunctions::new())
    }
}

/// 用一次性的编译器编译脚本
pub fn compile(
    source_name: &str,
    script: &str,
    options: &CompileOptions,
) -> Result<CompiledScript, CompileFailure> {
    Compiler::default().compile(source_name, script, options)
}
