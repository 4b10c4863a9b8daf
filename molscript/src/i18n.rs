//! # 消息本地化
//!
//! 错误消息以未翻译的模板为键，由 [`MessageCatalog`] 翻译。
//! 模板中的 `{0}`/`{1}` 替换位在翻译后保留。

use std::collections::HashMap;

/// 消息目录
pub trait MessageCatalog: Send + Sync {
    /// 翻译一个模板；不认识的模板返回 `None`
    fn translate(&self, template: &str) -> Option<&str>;
}

/// 不做翻译
#[derive(Debug, Clone, Copy, Default)]
pub struct Untranslated;

impl MessageCatalog for Untranslated {
    fn translate(&self, _template: &str) -> Option<&str> {
        None
    }
}

const ZH_CN: &[(&str, &str)] = &[
    ("bad argument count", "参数个数错误"),
    ("invalid context for {0}", "{0} 的上下文无效"),
    ("command expected", "缺少命令"),
    ("{ number number number } expected", "缺少坐标 { 数 数 数 }"),
    ("unexpected end of script command", "脚本命令意外结束"),
    ("end of expression expected", "表达式应在此结束"),
    (
        "identifier or residue specification expected",
        "缺少标识符或残基说明",
    ),
    ("invalid atom specification", "原子说明无效"),
    ("invalid chain specification", "链说明无效"),
    ("invalid expression token: {0}", "无效的表达式记号：{0}"),
    ("invalid model specification", "模型说明无效"),
    ("missing END for {0}", "{0} 缺少对应的 END"),
    ("number expected", "缺少数字"),
    ("number or variable name expected", "缺少数字或变量名"),
    (
        "residue specification (ALA, AL?, A*) expected",
        "缺少残基说明（ALA、AL?、A*）",
    ),
    ("{0} expected", "缺少 {0}"),
    ("{0} unexpected", "多余的 {0}"),
    ("unrecognized expression token: {0}", "无法识别的表达式记号：{0}"),
    ("unrecognized {0} parameter: {1}", "无法识别的 {0} 参数：{1}"),
    ("unrecognized token: {0}", "无法识别的记号：{0}"),
];

/// 内置简体中文目录
#[derive(Debug, Clone)]
pub struct SimplifiedChinese {
    map: HashMap<&'static str, &'static str>,
}

impl SimplifiedChinese {
    pub fn new() -> Self {
        Self {
            map: ZH_CN.iter().copied().collect(),
        }
    }
}

impl Default for SimplifiedChinese {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCatalog for SimplifiedChinese {
    fn translate(&self, template: &str) -> Option<&str> {
        self.map.get(template).copied()
    }
}
