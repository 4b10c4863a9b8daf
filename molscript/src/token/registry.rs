//! # Token 注册表
//!
//! 词素 → 规范 token 的只读映射。查找大小写不敏感。

use std::collections::HashMap;

use super::{Tok, Token, TokenValue};

/// 词素注册表
///
/// 编译期间只读；可在构造时用 [`TokenRegistry::with_entry`] 扩展。
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    map: HashMap<String, Token>,
}

/// (词素, 种类, 规范名)
const KEYWORDS: &[(&str, Tok, &str)] = &[
    // 原子表达式命令
    ("select", Tok::Select, "select"),
    ("restrict", Tok::Restrict, "restrict"),
    ("display", Tok::Display, "display"),
    ("hide", Tok::Hide, "hide"),
    ("define", Tok::DefineCmd, "define"),
    ("center", Tok::Center, "center"),
    ("centre", Tok::Center, "center"),
    ("delete", Tok::Delete, "delete"),
    ("subset", Tok::Subset, "subset"),
    ("zap", Tok::Zap, "zap"),
    // 数学表达式命令
    ("set", Tok::Set, "set"),
    ("print", Tok::Print, "print"),
    ("var", Tok::Var, "var"),
    ("return", Tok::Return, "return"),
    // 隐式字符串命令
    ("echo", Tok::Echo, "echo"),
    ("message", Tok::Message, "message"),
    ("pause", Tok::Pause, "pause"),
    ("help", Tok::Help, "help"),
    ("goto", Tok::Goto, "goto"),
    ("cd", Tok::Cd, "cd"),
    ("load", Tok::Load, "load"),
    ("script", Tok::Script, "script"),
    ("source", Tok::Script, "script"),
    // 其他命令
    ("wireframe", Tok::Wireframe, "wireframe"),
    ("spacefill", Tok::Spacefill, "spacefill"),
    ("cpk", Tok::Spacefill, "spacefill"),
    ("cartoon", Tok::Cartoon, "cartoon"),
    ("cartoons", Tok::Cartoon, "cartoon"),
    ("spin", Tok::Spin, "spin"),
    ("axes", Tok::Axes, "axes"),
    ("color", Tok::Color, "color"),
    ("colour", Tok::Color, "color"),
    ("label", Tok::Label, "label"),
    ("labels", Tok::Label, "label"),
    ("draw", Tok::Draw, "draw"),
    ("isosurface", Tok::Isosurface, "isosurface"),
    ("rotate", Tok::Rotate, "rotate"),
    ("zoom", Tok::Zoom, "zoom"),
    ("delay", Tok::Delay, "delay"),
    ("refresh", Tok::Refresh, "refresh"),
    ("exit", Tok::Exit, "exit"),
    ("quit", Tok::Quit, "quit"),
    ("initialize", Tok::Initialize, "initialize"),
    // 流程控制
    ("if", Tok::If, "if"),
    ("elseif", Tok::ElseIf, "elseif"),
    ("else", Tok::Else, "else"),
    ("endif", Tok::EndIf, "endif"),
    ("for", Tok::For, "for"),
    ("while", Tok::While, "while"),
    ("break", Tok::Break, "break"),
    ("continue", Tok::Continue, "continue"),
    ("end", Tok::End, "end"),
    ("function", Tok::Function, "function"),
    // 运算符
    ("and", Tok::OpAnd, "and"),
    ("&", Tok::OpAnd, "and"),
    ("&&", Tok::OpAnd, "and"),
    ("or", Tok::OpOr, "or"),
    ("|", Tok::OpOr, "or"),
    ("||", Tok::OpOr, "or"),
    ("xor", Tok::OpXor, "xor"),
    ("toggle", Tok::OpToggle, "toggle"),
    ("not", Tok::OpNot, "not"),
    ("!", Tok::OpNot, "not"),
    // 表达式关键字
    ("all", Tok::All, "all"),
    ("none", Tok::None, "none"),
    ("within", Tok::Within, "within"),
    ("connected", Tok::Connected, "connected"),
    ("substructure", Tok::Substructure, "substructure"),
    ("search", Tok::Substructure, "search"),
    ("smiles", Tok::Substructure, "smiles"),
    ("cell", Tok::Cell, "cell"),
    ("centroid", Tok::Centroid, "centroid"),
    ("on", Tok::On, "on"),
    ("off", Tok::Off, "off"),
    ("group", Tok::Group, "group"),
    ("add", Tok::Add, "add"),
    ("remove", Tok::Remove, "remove"),
    ("bonds", Tok::Bonds, "bonds"),
    ("in", Tok::In, "in"),
    ("plane", Tok::Plane, "plane"),
    ("hkl", Tok::Hkl, "hkl"),
    ("coord", Tok::Coord, "coord"),
    ("molecule", Tok::Misc, "molecule"),
    ("site", Tok::Misc, "site"),
    ("structure", Tok::Misc, "structure"),
    ("boundbox", Tok::Misc, "boundbox"),
    // 预定义集合
    ("helix", Tok::PredefinedSet, "helix"),
    ("sheet", Tok::PredefinedSet, "sheet"),
    ("protein", Tok::PredefinedSet, "protein"),
    ("nucleic", Tok::PredefinedSet, "nucleic"),
    ("dna", Tok::PredefinedSet, "dna"),
    ("rna", Tok::PredefinedSet, "rna"),
    ("hetero", Tok::PredefinedSet, "hetero"),
    ("water", Tok::PredefinedSet, "water"),
    ("solvent", Tok::PredefinedSet, "solvent"),
    ("hydrogen", Tok::PredefinedSet, "hydrogen"),
    ("carbohydrate", Tok::PredefinedSet, "carbohydrate"),
    ("ligand", Tok::PredefinedSet, "ligand"),
    ("selected", Tok::PredefinedSet, "selected"),
    ("visible", Tok::PredefinedSet, "visible"),
    ("backbone", Tok::PredefinedSet, "backbone"),
    ("sidechain", Tok::PredefinedSet, "sidechain"),
    ("amino", Tok::PredefinedSet, "amino"),
    ("purine", Tok::PredefinedSet, "purine"),
    ("pyrimidine", Tok::PredefinedSet, "pyrimidine"),
    ("aromatic", Tok::PredefinedSet, "aromatic"),
    // 数值原子属性
    ("atomno", Tok::AtomProperty, "atomno"),
    ("atomindex", Tok::AtomProperty, "atomindex"),
    ("resno", Tok::AtomProperty, "resno"),
    ("temperature", Tok::AtomProperty, "temperature"),
    ("occupancy", Tok::AtomProperty, "occupancy"),
    ("radius", Tok::AtomProperty, "radius"),
    ("charge", Tok::AtomProperty, "charge"),
    ("formalcharge", Tok::AtomProperty, "formalcharge"),
    ("mass", Tok::AtomProperty, "mass"),
    ("bondcount", Tok::AtomProperty, "bondcount"),
    ("model", Tok::AtomProperty, "model"),
    // 字符串原子属性
    ("atomname", Tok::StringProperty, "atomname"),
    ("atomtype", Tok::StringProperty, "atomtype"),
    ("type", Tok::StringProperty, "atomtype"),
    ("element", Tok::StringProperty, "element"),
    ("resname", Tok::StringProperty, "resname"),
    ("chain", Tok::StringProperty, "chain"),
    ("altloc", Tok::StringProperty, "altloc"),
    ("sequence", Tok::StringProperty, "sequence"),
];

impl TokenRegistry {
    /// 内置词素表
    pub fn standard() -> Self {
        let map = KEYWORDS
            .iter()
            .map(|&(lexeme, kind, name)| {
                (
                    lexeme.to_string(),
                    Token::with_value(kind, TokenValue::Text(name.to_string())),
                )
            })
            .collect();
        Self { map }
    }

    /// 追加（或覆盖）一个词素
    pub fn with_entry(mut self, lexeme: &str, token: Token) -> Self {
        self.map.insert(lexeme.to_lowercase(), token);
        self
    }

    /// 查找词素的规范 token
    ///
    /// 未知词素返回 `None`，调用方按标识符处理。
    pub fn lookup(&self, lexeme: &str) -> Option<&Token> {
        if let Some(token) = self.map.get(lexeme) {
            return Some(token);
        }
        self.map.get(&lexeme.to_lowercase())
    }

    /// 名称是否属于注册表
    pub fn contains(&self, lexeme: &str) -> bool {
        self.lookup(lexeme).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
