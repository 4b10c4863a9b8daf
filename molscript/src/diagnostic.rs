//! # 诊断模块
//!
//! 提供脚本静态检查和诊断 API，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用编译器，不重复解析逻辑

use serde::{Deserialize, Serialize};

use crate::compiler::{CompileOptions, Compiler};
use crate::function::SharedFunctions;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// 脚本 ID / 文件路径
    pub script_id: String,
    /// 行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    pub message: String,
    /// 诊断详情（可选，如标注后的源码行）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            script_id: script_id.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, script_id, message)
    }

    /// 创建警告诊断
    pub fn warn(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, script_id, message)
    }

    /// 创建信息诊断
    pub fn info(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, script_id, message)
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.script_id)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

//=============================================================================
// 脚本检查 API
//=============================================================================

/// 以只检查语法的方式编译脚本，返回诊断结果
///
/// 编译失败产生一条 Error；编译期警告（重定义等）转为 Warn。
/// 不会向任何函数注册表写入。
pub fn check_script(script_id: &str, script: &str) -> DiagnosticResult {
    let mut compiler = Compiler::new(SharedFunctions::new());
    let options = CompileOptions::default()
        .syntax_check_only(true)
        .silent(true);
    let mut result = DiagnosticResult::new();
    match compiler.compile(script_id, script, &options) {
        Ok(compiled) => {
            for diag in compiled.warnings {
                result.push(diag);
            }
        }
        Err(failure) => result.push(failure.to_diagnostic()),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error("test.spt", "command expected")
            .with_line(3)
            .with_detail(">>>> foo");
        assert_eq!(
            diag.to_string(),
            "[ERROR] test.spt:3: command expected\n  | >>>> foo"
        );
    }

    #[test]
    fn test_diagnostic_result_filter() {
        let mut result = DiagnosticResult::new();
        result.push(Diagnostic::info("a", "info"));
        result.push(Diagnostic::warn("a", "warn"));
        result.push(Diagnostic::error("a", "error"));
        assert_eq!(result.filter_by_level(DiagnosticLevel::Warn).len(), 2);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warn_count(), 1);

        let mut other = DiagnosticResult::new();
        other.push(Diagnostic::error("b", "again"));
        result.merge(other);
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn test_check_script_valid() {
        let result = check_script("ok.spt", "select all\nif (x) print 1 end if");
        assert!(result.is_empty());
    }

    #[test]
    fn test_check_script_reports_error_with_line() {
        let result = check_script("bad.spt", "select all\nselect (1");
        assert!(result.has_errors());
        let diag = &result.diagnostics[0];
        assert_eq!(diag.line, Some(2));
        assert_eq!(diag.message, "unexpected end of script command");
        assert_eq!(diag.detail.as_deref(), Some("select (1 >>>>"));
    }

    #[test]
    fn test_check_script_collects_warnings() {
        let result = check_script("warn.spt", "define helix 1-10");
        assert!(!result.has_errors());
        assert_eq!(result.warn_count(), 1);
    }
}
