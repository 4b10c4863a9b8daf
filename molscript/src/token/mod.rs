//! # Token 模块
//!
//! 定义编译器的词法单元：不可变的 `(kind, int, value)` 三元组。
//!
//! ## 设计说明
//!
//! - [`Tok`] 是词法单元的种类，属性查询（是否流程关键字、是否比较符……）
//!   都是 `Tok` 上的方法，而不是位掩码。
//! - [`Token`] 是值类型，构造后不可修改。跳转目标不写入 token，
//!   而是由命令表按命令下标单独保存。
//! - 整数字段是重载的：数字字面量、序列号编码、模型号编码、函数参数个数等。

mod registry;

pub use registry::TokenRegistry;

use std::fmt;

use serde::{Deserialize, Serialize};

/// 词法单元种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tok {
    // ── 数据 ──
    Nada,
    Identifier,
    Integer,
    Decimal,
    String,
    SeqCode,
    Bitset,
    ObjectId,

    // ── 标点 ──
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,
    Comma,
    Semicolon,
    Colon,
    Per,
    Percent,
    /// `@` 变量解引用
    Define,

    // ── 算术 ──
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    PlusPlus,
    MinusMinus,
    /// `+=` `-=` `*=` `/=`
    CompoundAssign,

    // ── 逻辑 ──
    OpAnd,
    OpOr,
    OpXor,
    OpToggle,
    OpNot,

    // ── 比较 ──
    /// 单个 `=`：数学上下文中是赋值，比较子句中等同 `==`
    Assign,
    OpEq,
    OpNe,
    OpLt,
    OpGt,
    OpLe,
    OpGe,

    // ── 后缀代码标记 ──
    ExpressionBegin,
    ExpressionEnd,
    CoordinateBegin,
    CoordinateEnd,

    // ── 残基说明 ──
    SpecName,
    SpecNamePattern,
    SpecSeqcode,
    SpecSeqcodeRange,
    SpecChain,
    SpecAtom,
    SpecAlternate,
    SpecModel,
    SpecModel2,

    // ── 表达式关键字 ──
    All,
    None,
    Within,
    Connected,
    Substructure,
    Cell,
    Centroid,
    On,
    Off,
    Group,
    Add,
    Remove,
    Bonds,
    In,
    Plane,
    Hkl,
    Coord,
    PredefinedSet,
    AtomProperty,
    StringProperty,
    /// 其他无特殊语法的参数关键字（molecule、site、boundbox……）
    Misc,

    // ── 原子表达式命令 ──
    Select,
    Restrict,
    Display,
    Hide,
    DefineCmd,
    Center,
    Delete,
    Subset,
    Zap,

    // ── 数学表达式命令 ──
    Set,
    Print,
    Var,
    Return,

    // ── 隐式字符串命令 ──
    Echo,
    Message,
    Pause,
    Help,
    Goto,
    Cd,
    Load,
    Script,

    // ── 其他命令 ──
    Wireframe,
    Spacefill,
    Cartoon,
    Spin,
    Axes,
    Color,
    Label,
    Draw,
    Isosurface,
    Rotate,
    Zoom,
    Delay,
    Refresh,
    Exit,
    Quit,
    Initialize,
    /// 以函数名开头的调用命令
    Call,

    // ── 流程控制 ──
    If,
    ElseIf,
    Else,
    EndIf,
    For,
    While,
    Break,
    Continue,
    End,
    Function,
}

impl Tok {
    /// 规范名称（小写），用于列表输出与错误信息
    pub fn name(self) -> &'static str {
        match self {
            Self::Nada => "nada",
            Self::Identifier => "identifier",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::SeqCode => "seqcode",
            Self::Bitset => "bitset",
            Self::ObjectId => "$",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::LeftSquare => "[",
            Self::RightSquare => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Per => ".",
            Self::Percent => "%",
            Self::Define => "@",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Times => "*",
            Self::Divide => "/",
            Self::Power => "^",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::CompoundAssign => "op=",
            Self::OpAnd => "and",
            Self::OpOr => "or",
            Self::OpXor => "xor",
            Self::OpToggle => "toggle",
            Self::OpNot => "not",
            Self::Assign => "=",
            Self::OpEq => "==",
            Self::OpNe => "!=",
            Self::OpLt => "<",
            Self::OpGt => ">",
            Self::OpLe => "<=",
            Self::OpGe => ">=",
            Self::ExpressionBegin => "expressionBegin",
            Self::ExpressionEnd => "expressionEnd",
            Self::CoordinateBegin => "coordinateBegin",
            Self::CoordinateEnd => "coordinateEnd",
            Self::SpecName => "spec_name",
            Self::SpecNamePattern => "spec_name_pattern",
            Self::SpecSeqcode => "spec_seqcode",
            Self::SpecSeqcodeRange => "spec_seqcode_range",
            Self::SpecChain => "spec_chain",
            Self::SpecAtom => "spec_atom",
            Self::SpecAlternate => "spec_alternate",
            Self::SpecModel => "spec_model",
            Self::SpecModel2 => "spec_model2",
            Self::All => "all",
            Self::None => "none",
            Self::Within => "within",
            Self::Connected => "connected",
            Self::Substructure => "substructure",
            Self::Cell => "cell",
            Self::Centroid => "centroid",
            Self::On => "on",
            Self::Off => "off",
            Self::Group => "group",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Bonds => "bonds",
            Self::In => "in",
            Self::Plane => "plane",
            Self::Hkl => "hkl",
            Self::Coord => "coord",
            Self::PredefinedSet => "predefined",
            Self::AtomProperty => "property",
            Self::StringProperty => "strproperty",
            Self::Misc => "misc",
            Self::Select => "select",
            Self::Restrict => "restrict",
            Self::Display => "display",
            Self::Hide => "hide",
            Self::DefineCmd => "define",
            Self::Center => "center",
            Self::Delete => "delete",
            Self::Subset => "subset",
            Self::Zap => "zap",
            Self::Set => "set",
            Self::Print => "print",
            Self::Var => "var",
            Self::Return => "return",
            Self::Echo => "echo",
            Self::Message => "message",
            Self::Pause => "pause",
            Self::Help => "help",
            Self::Goto => "goto",
            Self::Cd => "cd",
            Self::Load => "load",
            Self::Script => "script",
            Self::Wireframe => "wireframe",
            Self::Spacefill => "spacefill",
            Self::Cartoon => "cartoon",
            Self::Spin => "spin",
            Self::Axes => "axes",
            Self::Color => "color",
            Self::Label => "label",
            Self::Draw => "draw",
            Self::Isosurface => "isosurface",
            Self::Rotate => "rotate",
            Self::Zoom => "zoom",
            Self::Delay => "delay",
            Self::Refresh => "refresh",
            Self::Exit => "exit",
            Self::Quit => "quit",
            Self::Initialize => "initialize",
            Self::Call => "call",
            Self::If => "if",
            Self::ElseIf => "elseif",
            Self::Else => "else",
            Self::EndIf => "endif",
            Self::For => "for",
            Self::While => "while",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::End => "end",
            Self::Function => "function",
        }
    }

    /// 是否可以作为命令动词
    pub fn is_command(self) -> bool {
        self.takes_atom_expression()
            || self.takes_math_expression()
            || self.takes_implicit_string()
            || self.is_flow()
            || matches!(
                self,
                Self::Wireframe
                    | Self::Spacefill
                    | Self::Cartoon
                    | Self::Spin
                    | Self::Axes
                    | Self::Color
                    | Self::Label
                    | Self::Draw
                    | Self::Isosurface
                    | Self::Rotate
                    | Self::Zoom
                    | Self::Delay
                    | Self::Refresh
                    | Self::Exit
                    | Self::Quit
                    | Self::Initialize
                    | Self::Call
            )
    }

    /// 流程控制关键字
    pub fn is_flow(self) -> bool {
        matches!(
            self,
            Self::If
                | Self::ElseIf
                | Self::Else
                | Self::EndIf
                | Self::For
                | Self::While
                | Self::Break
                | Self::Continue
                | Self::End
                | Self::Function
        )
    }

    /// 能在已打开的流程块中终止当前命令的关键字
    pub fn is_flow_continuation(self) -> bool {
        matches!(self, Self::Else | Self::ElseIf | Self::End | Self::EndIf)
    }

    /// 条件写在括号里、括号闭合即结束命令的流程关键字
    pub fn has_flow_condition(self) -> bool {
        matches!(self, Self::If | Self::ElseIf | Self::While | Self::For)
    }

    /// 命令参数整体是一个原子选择表达式
    pub fn takes_atom_expression(self) -> bool {
        matches!(
            self,
            Self::Select
                | Self::Restrict
                | Self::Display
                | Self::Hide
                | Self::DefineCmd
                | Self::Center
                | Self::Delete
                | Self::Subset
                | Self::Zap
        )
    }

    /// 命令参数是留给求值器的数学表达式（仅编译其中的 `{...}`）
    pub fn takes_math_expression(self) -> bool {
        matches!(
            self,
            Self::Set
                | Self::Print
                | Self::Var
                | Self::Return
                | Self::Call
                | Self::If
                | Self::ElseIf
                | Self::While
                | Self::For
        )
    }

    /// 命令余下的整行是一个隐式字符串参数
    pub fn takes_implicit_string(self) -> bool {
        matches!(
            self,
            Self::Echo
                | Self::Message
                | Self::Pause
                | Self::Help
                | Self::Goto
                | Self::Cd
                | Self::Load
                | Self::Script
        )
    }

    /// 不接受参数的命令
    pub fn no_args(self) -> bool {
        matches!(
            self,
            Self::Else | Self::EndIf | Self::Exit | Self::Quit | Self::Refresh | Self::Initialize
        )
    }

    /// 无参数时默认补一个 `on`
    pub fn defaults_on(self) -> bool {
        matches!(
            self,
            Self::Wireframe | Self::Spacefill | Self::Cartoon | Self::Spin | Self::Axes
        )
    }

    /// 在该命令的表达式里逗号等价于 `or`
    ///
    /// 数学表达式与流程条件里逗号是参数分隔符（`for (a, b, c)`）。
    pub fn comma_is_or(self) -> bool {
        self.is_command() && !self.takes_math_expression() && !self.is_flow()
    }

    /// 参数中的 `( ... )` 与 `{ ... }` 分组按原子表达式编译
    pub fn embeds_expressions(self) -> bool {
        self.is_command()
            && !self.takes_atom_expression()
            && !self.takes_math_expression()
            && !self.takes_implicit_string()
            && !self.is_flow()
    }

    pub fn is_comparator(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::OpEq
                | Self::OpNe
                | Self::OpLt
                | Self::OpGt
                | Self::OpLe
                | Self::OpGe
        )
    }

    /// 可出现在比较子句左侧的原子属性
    pub fn is_atom_property(self) -> bool {
        matches!(self, Self::AtomProperty | Self::StringProperty)
    }

    /// 字符串属性只允许 `==` 与 `!=`
    pub fn is_string_property(self) -> bool {
        self == Self::StringProperty
    }
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 原子（或键）下标集合字面量，按闭区间存储
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomSet {
    /// 闭区间列表，保证 `lo <= hi`
    pub ranges: Vec<(u32, u32)>,
    /// `[{...}]` 形式的键集合
    pub is_bond_set: bool,
}

impl AtomSet {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// 集合中的元素个数
    pub fn cardinality(&self) -> u64 {
        self.ranges
            .iter()
            .map(|&(lo, hi)| u64::from(hi - lo) + 1)
            .sum()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= index && index <= hi)
    }
}

impl fmt::Display for AtomSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = if self.is_bond_set {
            ("[{", "}]")
        } else {
            ("({", "})")
        };
        f.write_str(open)?;
        for (i, &(lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if lo == hi {
                write!(f, "{}", lo)?;
            } else {
                write!(f, "{}:{}", lo, hi)?;
            }
        }
        f.write_str(close)
    }
}

/// Token 的值部分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TokenValue {
    #[default]
    None,
    Text(String),
    Number(f64),
    AtomSet(AtomSet),
    Point([f64; 3]),
    /// 闭区间（序列号编码）
    Range(i32, i32),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{}", n),
            Self::AtomSet(set) => write!(f, "{}", set),
            Self::Point([x, y, z]) => write!(f, "{{{} {} {}}}", x, y, z),
            Self::Range(lo, hi) => write!(f, "{}-{}", lo, hi),
        }
    }
}

/// 词法单元
///
/// 不可变：需要不同的整数或值时构造新的 token。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    kind: Tok,
    int: i32,
    value: TokenValue,
}

impl Token {
    /// 整数字段"未设置"
    pub const NO_INT: i32 = i32::MAX;

    pub fn new(kind: Tok) -> Self {
        Self {
            kind,
            int: Self::NO_INT,
            value: TokenValue::None,
        }
    }

    pub fn with_int(kind: Tok, int: i32) -> Self {
        Self {
            kind,
            int,
            value: TokenValue::None,
        }
    }

    pub fn with_value(kind: Tok, value: TokenValue) -> Self {
        Self {
            kind,
            int: Self::NO_INT,
            value,
        }
    }

    pub fn with_int_value(kind: Tok, int: i32, value: TokenValue) -> Self {
        Self { kind, int, value }
    }

    /// 文本值 token
    pub fn text(kind: Tok, text: impl Into<String>) -> Self {
        Self::with_value(kind, TokenValue::Text(text.into()))
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::text(Tok::Identifier, name)
    }

    pub fn integer(value: i32) -> Self {
        Self::with_int_value(Tok::Integer, value, TokenValue::Text(value.to_string()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::text(Tok::String, value)
    }

    pub fn kind(&self) -> Tok {
        self.kind
    }

    pub fn int(&self) -> i32 {
        self.int
    }

    pub fn value(&self) -> &TokenValue {
        &self.value
    }

    /// 文本值（非文本值返回 `None`）
    pub fn text_value(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 数值：整数取整数字段，小数取值字段
    pub fn number(&self) -> Option<f64> {
        match (self.kind, &self.value) {
            (Tok::Integer, _) => Some(f64::from(self.int)),
            (Tok::Decimal, TokenValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is(&self, kind: Tok) -> bool {
        self.kind == kind
    }

    /// 复制一个 token，换掉整数字段
    pub fn rekeyed(&self, int: i32) -> Self {
        Self {
            kind: self.kind,
            int,
            value: self.value.clone(),
        }
    }

    /// 复制一个 token，换掉种类
    pub fn retyped(&self, kind: Tok) -> Self {
        Self {
            kind,
            int: self.int,
            value: self.value.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Tok::Integer => write!(f, "{}", self.int),
            Tok::Decimal => write!(f, "{}", self.value),
            Tok::String => write!(f, "\"{}\"", self.value),
            Tok::Identifier | Tok::Bitset => write!(f, "{}", self.value),
            Tok::ObjectId => write!(f, "${}", self.value),
            kind => {
                f.write_str(kind.name())?;
                let has_int = self.int != Self::NO_INT;
                // 关键字 token 的值就是规范名，不重复输出
                let has_value = match &self.value {
                    TokenValue::None => false,
                    TokenValue::Text(s) => s != kind.name(),
                    _ => true,
                };
                if has_int || has_value {
                    f.write_str("(")?;
                    if has_int {
                        write!(f, "{}", self.int)?;
                    }
                    if has_int && has_value {
                        f.write_str(" ")?;
                    }
                    if has_value {
                        write!(f, "{}", self.value)?;
                    }
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_attributes() {
        assert!(Tok::If.is_flow());
        assert!(Tok::If.is_command());
        assert!(Tok::If.has_flow_condition());
        assert!(!Tok::Else.has_flow_condition());
        assert!(Tok::Else.no_args());
        assert!(Tok::End.is_flow_continuation());
        assert!(!Tok::Select.is_flow());
    }

    #[test]
    fn test_expression_attributes() {
        assert!(Tok::Select.takes_atom_expression());
        assert!(Tok::Select.comma_is_or());
        assert!(!Tok::For.comma_is_or());
        assert!(Tok::Color.comma_is_or());
        assert!(Tok::Color.embeds_expressions());
        assert!(!Tok::Print.embeds_expressions());
        assert!(Tok::Assign.is_comparator());
        assert!(Tok::Print.takes_math_expression());
        assert!(Tok::Echo.takes_implicit_string());
        assert!(Tok::Wireframe.defaults_on());
        assert!(Tok::OpLe.is_comparator());
        assert!(!Tok::OpAnd.is_comparator());
    }

    #[test]
    fn test_atom_set_display_and_cardinality() {
        let set = AtomSet {
            ranges: vec![(0, 0), (2, 5)],
            is_bond_set: false,
        };
        assert_eq!(set.to_string(), "({0 2:5})");
        assert_eq!(set.cardinality(), 5);
        assert!(set.contains(4));
        assert!(!set.contains(1));

        let bonds = AtomSet {
            ranges: vec![(1, 3)],
            is_bond_set: true,
        };
        assert_eq!(bonds.to_string(), "[{1:3}]");
    }

    #[test]
    fn test_token_display() {
        assert_eq!(Token::integer(42).to_string(), "42");
        assert_eq!(Token::string("hi").to_string(), "\"hi\"");
        assert_eq!(Token::new(Tok::All).to_string(), "all");
        assert_eq!(Token::with_int(Tok::Within, 2).to_string(), "within(2)");
        assert_eq!(Token::text(Tok::Select, "select").to_string(), "select");
        assert_eq!(
            Token::text(Tok::PredefinedSet, "helix").to_string(),
            "predefined(helix)"
        );
        assert_eq!(
            Token::text(Tok::SpecAtom, "CA").rekeyed(1).to_string(),
            "spec_atom(1 CA)"
        );
    }

    #[test]
    fn test_token_is_immutable_value() {
        let base = Token::with_int(Tok::For, 0);
        let copy = base.rekeyed(7);
        assert_eq!(base.int(), 0);
        assert_eq!(copy.int(), 7);
        assert_eq!(copy.kind(), Tok::For);
    }
}
