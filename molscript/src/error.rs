//! # Error 模块
//!
//! 定义编译器使用的错误类型。
//!
//! - [`ErrorKind`]：错误分类，每类携带 0–2 个替换值
//! - [`CompileError`]：内部各阶段的错误（分类 + 源码偏移）
//! - [`CompileFailure`]：公开入口返回的失败结果（本地化消息 + 标注行）

use thiserror::Error;

use crate::compiler::count_lines;
use crate::diagnostic::Diagnostic;
use crate::i18n::MessageCatalog;

/// 编译错误分类
///
/// `Display` 输出的是未翻译的消息；本地化消息见 [`ErrorKind::message`]。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("bad argument count")]
    BadArgumentCount,

    #[error("invalid context for {0}")]
    BadContext(String),

    #[error("command expected")]
    CommandExpected,

    #[error("{{ number number number }} expected")]
    CoordinateExpected,

    #[error("unexpected end of script command")]
    EndOfCommandUnexpected,

    #[error("end of expression expected")]
    EndOfExpressionExpected,

    #[error("identifier or residue specification expected")]
    IdentifierOrResidueSpecificationExpected,

    #[error("invalid atom specification")]
    InvalidAtomSpecification,

    #[error("invalid chain specification")]
    InvalidChainSpecification,

    #[error("invalid expression token: {0}")]
    InvalidExpressionToken(String),

    #[error("invalid model specification")]
    InvalidModelSpecification,

    #[error("missing END for {0}")]
    MissingEnd(String),

    #[error("number expected")]
    NumberExpected,

    #[error("number or variable name expected")]
    NumberOrVariableNameExpected,

    #[error("residue specification (ALA, AL?, A*) expected")]
    ResidueSpecificationExpected,

    #[error("{0} expected")]
    TokenExpected(String),

    #[error("{0} unexpected")]
    TokenUnexpected(String),

    #[error("unrecognized expression token: {0}")]
    UnrecognizedExpressionToken(String),

    #[error("unrecognized {0} parameter: {1}")]
    UnrecognizedParameter(String, String),

    #[error("unrecognized token: {0}")]
    UnrecognizedToken(String),
}

impl ErrorKind {
    /// 未翻译的消息模板，`{0}`/`{1}` 为替换位
    pub fn template(&self) -> &'static str {
        match self {
            Self::BadArgumentCount => "bad argument count",
            Self::BadContext(_) => "invalid context for {0}",
            Self::CommandExpected => "command expected",
            Self::CoordinateExpected => "{ number number number } expected",
            Self::EndOfCommandUnexpected => "unexpected end of script command",
            Self::EndOfExpressionExpected => "end of expression expected",
            Self::IdentifierOrResidueSpecificationExpected => {
                "identifier or residue specification expected"
            }
            Self::InvalidAtomSpecification => "invalid atom specification",
            Self::InvalidChainSpecification => "invalid chain specification",
            Self::InvalidExpressionToken(_) => "invalid expression token: {0}",
            Self::InvalidModelSpecification => "invalid model specification",
            Self::MissingEnd(_) => "missing END for {0}",
            Self::NumberExpected => "number expected",
            Self::NumberOrVariableNameExpected => "number or variable name expected",
            Self::ResidueSpecificationExpected => "residue specification (ALA, AL?, A*) expected",
            Self::TokenExpected(_) => "{0} expected",
            Self::TokenUnexpected(_) => "{0} unexpected",
            Self::UnrecognizedExpressionToken(_) => "unrecognized expression token: {0}",
            Self::UnrecognizedParameter(..) => "unrecognized {0} parameter: {1}",
            Self::UnrecognizedToken(_) => "unrecognized token: {0}",
        }
    }

    /// 替换值（0–2 个）
    pub fn args(&self) -> Vec<&str> {
        match self {
            Self::BadContext(a)
            | Self::InvalidExpressionToken(a)
            | Self::MissingEnd(a)
            | Self::TokenExpected(a)
            | Self::TokenUnexpected(a)
            | Self::UnrecognizedExpressionToken(a)
            | Self::UnrecognizedToken(a) => vec![a.as_str()],
            Self::UnrecognizedParameter(a, b) => vec![a.as_str(), b.as_str()],
            _ => Vec::new(),
        }
    }

    /// 按目录翻译模板后填入替换值
    ///
    /// 模板里没有 `{0}` 而存在替换值时，以 `": value"` 追加在末尾。
    pub fn message(&self, catalog: &dyn MessageCatalog) -> String {
        let template = self.template();
        let localized = catalog.translate(template).unwrap_or(template);
        fill_template(localized, &self.args())
    }
}

fn fill_template(template: &str, args: &[&str]) -> String {
    let mut msg = String::with_capacity(template.len());
    let mut used = vec![false; args.len()];
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        msg.push_str(&rest[..open]);
        let after = &rest[open..];
        let slot = after
            .find('}')
            .and_then(|close| Some((after[1..close].parse::<usize>().ok()?, close)))
            .filter(|&(i, _)| i < args.len());
        match slot {
            Some((i, close)) => {
                msg.push_str(args[i]);
                used[i] = true;
                rest = &after[close + 1..];
            }
            None => {
                msg.push('{');
                rest = &after[1..];
            }
        }
    }
    msg.push_str(rest);
    for (arg, _) in args.iter().zip(&used).filter(|(_, used)| !**used) {
        msg.push_str(": ");
        msg.push_str(arg);
    }
    msg
}

/// 编译阶段内部错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: ErrorKind,
    /// 出错位置（源码字节偏移）
    pub offset: usize,
}

impl CompileError {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// 编译失败结果
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{script_id}:{line}: {message}")]
pub struct CompileFailure {
    pub kind: ErrorKind,
    /// 本地化后的消息
    pub message: String,
    /// 未翻译的消息
    pub untranslated: String,
    /// 脚本标识
    pub script_id: String,
    /// 行号（从 1 开始）
    pub line: usize,
    /// 出错位置（源码字节偏移）
    pub offset: usize,
    /// 出错的源码行，出错列处插入 ` >>>> `
    pub annotated_line: String,
}

impl CompileFailure {
    /// 由内部错误和源码构造失败结果
    pub fn from_error(
        error: CompileError,
        script_id: &str,
        script: &str,
        catalog: &dyn MessageCatalog,
    ) -> Self {
        let offset = floor_char_boundary(script, error.offset.min(script.len()));
        let line = count_lines(&script[..line_anchor(script, offset)]) + 1;
        Self {
            message: error.kind.message(catalog),
            untranslated: error.kind.to_string(),
            kind: error.kind,
            script_id: script_id.to_string(),
            line,
            offset,
            annotated_line: annotate_line(script, offset),
        }
    }

    /// 转换为错误级诊断
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(&self.script_id, &self.message)
            .with_line(self.line)
            .with_detail(&self.annotated_line)
    }
}

/// 取出偏移所在的源码行，并在偏移处插入标记
///
/// 换行规则与扫描器一致：`\r\n`、`\n`、单独的 `\r`。
pub fn annotate_line(script: &str, offset: usize) -> String {
    let offset = line_anchor(script, floor_char_boundary(script, offset.min(script.len())));
    let start = script[..offset].rfind(['\n', '\r']).map_or(0, |p| p + 1);
    let end = script[offset..]
        .find(['\n', '\r'])
        .map_or(script.len(), |p| offset + p);
    format!("{} >>>> {}", &script[start..offset], &script[offset..end])
        .trim()
        .to_string()
}

/// 落在 `\r\n` 中间的偏移归到 `\r` 之前
fn line_anchor(script: &str, offset: usize) -> usize {
    if script[..offset].ends_with('\r') && script[offset..].starts_with('\n') {
        offset - 1
    } else {
        offset
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
