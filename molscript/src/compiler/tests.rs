//! 编译器集成测试：脚本文本 → 命令表

use super::*;
use super::scanner::seqcode;
use crate::error::ErrorKind;
use crate::table::Command;
use crate::token::Tok;

fn options() -> CompileOptions {
    CompileOptions::default().silent(true)
}

fn compile_ok(script: &str) -> CompiledScript {
    match compile("test.spt", script, &options()) {
        Ok(compiled) => compiled,
        Err(failure) => panic!("compile failed: {}", failure.message),
    }
}

fn compile_err(script: &str) -> CompileFailure {
    match compile("test.spt", script, &options()) {
        Ok(compiled) => panic!("expected failure, got:\n{}", compiled.listing()),
        Err(failure) => failure,
    }
}

fn kinds(command: &Command) -> Vec<Tok> {
    command.tokens().iter().map(|t| t.kind()).collect()
}

fn command(compiled: &CompiledScript, index: usize) -> &Command {
    compiled.table.get(index).unwrap()
}

fn jump(compiled: &CompiledScript, index: usize) -> Option<usize> {
    compiled.table.jump(index).map(|target| target.index())
}

// ---------------------------------------------------------------------------
// 原子表达式：后缀顺序
// ---------------------------------------------------------------------------

#[test]
fn test_select_all() {
    let compiled = compile_ok("select all");
    insta::assert_snapshot!(compiled.listing(), @"0: select expressionBegin all expressionEnd");
}

#[test]
fn test_postfix_order() {
    let compiled = compile_ok("select 1");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![
            Tok::Select,
            Tok::ExpressionBegin,
            Tok::SpecSeqcode,
            Tok::ExpressionEnd
        ]
    );

    let compiled = compile_ok("select not 1");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![
            Tok::Select,
            Tok::ExpressionBegin,
            Tok::SpecSeqcode,
            Tok::OpNot,
            Tok::ExpressionEnd
        ]
    );

    let compiled = compile_ok("select (1) or (2)");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![
            Tok::Select,
            Tok::ExpressionBegin,
            Tok::SpecSeqcode,
            Tok::SpecSeqcode,
            Tok::OpOr,
            Tok::ExpressionEnd
        ]
    );
}

#[test]
fn test_nested_groups_lose_parens() {
    let compiled = compile_ok("select not (ala or (gly and 1))");
    assert_eq!(
        command(&compiled, 0).argument_kinds(),
        vec![
            Tok::ExpressionBegin,
            Tok::SpecName,
            Tok::SpecName,
            Tok::SpecSeqcode,
            Tok::OpAnd,
            Tok::OpOr,
            Tok::OpNot,
            Tok::ExpressionEnd
        ]
    );
}

#[test]
fn test_residue_specification_with_every_part() {
    let compiled = compile_ok("select ALA123^A:B.CA%1/2");
    let args = command(&compiled, 0).argument_kinds();
    assert_eq!(
        args,
        vec![
            Tok::ExpressionBegin,
            Tok::SpecName,
            Tok::SpecSeqcode,
            Tok::OpAnd,
            Tok::SpecChain,
            Tok::OpAnd,
            Tok::SpecAtom,
            Tok::OpAnd,
            Tok::SpecAlternate,
            Tok::OpAnd,
            Tok::SpecModel,
            Tok::OpAnd,
            Tok::ExpressionEnd
        ]
    );
    assert_eq!(args.iter().filter(|&&k| k == Tok::OpAnd).count(), 5);
}

#[test]
fn test_sequence_then_atom() {
    let compiled = compile_ok("select 1.CA");
    assert_eq!(
        command(&compiled, 0).argument_kinds(),
        vec![
            Tok::ExpressionBegin,
            Tok::SpecSeqcode,
            Tok::SpecAtom,
            Tok::OpAnd,
            Tok::ExpressionEnd
        ]
    );
}

#[test]
fn test_question_marks_alone_fail() {
    let failure = compile_err("select ???");
    assert_eq!(failure.kind, ErrorKind::ResidueSpecificationExpected);
    assert_eq!(failure.offset, 7);
}

#[test]
fn test_sequence_number_must_fit_encoding() {
    let failure = compile_err("select 8388608");
    assert_eq!(failure.kind, ErrorKind::NumberExpected);
    assert_eq!(failure.offset, 7);

    let failure = compile_err("select 16777216");
    assert_eq!(failure.kind, ErrorKind::NumberExpected);

    let compiled = compile_ok("select 8388607");
    assert_eq!(
        command(&compiled, 0).tokens()[2].int(),
        seqcode(SEQUENCE_WILDCARD, '\0')
    );
}

#[test]
fn test_comparators() {
    let compiled = compile_ok("select resno >= 10 and chain = A");
    insta::assert_snapshot!(
        compiled.listing(),
        @r#"0: select expressionBegin property(resno) 10 >= strproperty(chain) "A" == and expressionEnd"#
    );
}

#[test]
fn test_within_function() {
    let compiled = compile_ok("select within(5, ala)");
    let tokens = command(&compiled, 0).tokens();
    assert_eq!(tokens[2].kind(), Tok::Integer);
    assert_eq!(tokens[3].kind(), Tok::SpecName);
    assert_eq!(tokens[4].kind(), Tok::Within);
    assert_eq!(tokens[4].int(), 2);
}

// ---------------------------------------------------------------------------
// 逗号语义
// ---------------------------------------------------------------------------

#[test]
fn test_comma_is_or_in_select() {
    let compiled = compile_ok("select a,b");
    assert_eq!(
        command(&compiled, 0).argument_kinds(),
        vec![
            Tok::ExpressionBegin,
            Tok::SpecName,
            Tok::SpecName,
            Tok::OpOr,
            Tok::ExpressionEnd
        ]
    );
}

#[test]
fn test_comma_separates_in_for() {
    let compiled = compile_ok("for (a,b,c)\nend for");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![
            Tok::For,
            Tok::LeftParen,
            Tok::Identifier,
            Tok::Comma,
            Tok::Identifier,
            Tok::Comma,
            Tok::Identifier,
            Tok::RightParen
        ]
    );
}

#[test]
fn test_embedded_expression_in_color() {
    let compiled = compile_ok("color (ala, gly) red");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![
            Tok::Color,
            Tok::ExpressionBegin,
            Tok::SpecName,
            Tok::SpecName,
            Tok::OpOr,
            Tok::ExpressionEnd,
            Tok::Identifier
        ]
    );
}

// ---------------------------------------------------------------------------
// 坐标与花括号
// ---------------------------------------------------------------------------

#[test]
fn test_coordinates() {
    let compiled = compile_ok("select {1 2 3}");
    let tokens = command(&compiled, 0).tokens();
    assert_eq!(tokens[2].kind(), Tok::CoordinateBegin);
    assert_eq!(tokens[2].int(), 3);
    assert_eq!(tokens[6].kind(), Tok::CoordinateEnd);

    let compiled = compile_ok("select {1 2}");
    assert_eq!(command(&compiled, 0).tokens()[2].int(), 2);

    let failure = compile_err("select {1 2 3 4 5}");
    assert_eq!(failure.kind, ErrorKind::CoordinateExpected);
}

#[test]
fn test_math_command_compiles_only_brace_groups() {
    let compiled = compile_ok("x = {1 2 3}");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![
            Tok::Set,
            Tok::Identifier,
            Tok::Assign,
            Tok::CoordinateBegin,
            Tok::Integer,
            Tok::Integer,
            Tok::Integer,
            Tok::CoordinateEnd
        ]
    );

    let compiled = compile_ok("x = {\"a\": 1}");
    assert_eq!(
        command(&compiled, 0).argument_kinds(),
        vec![
            Tok::Identifier,
            Tok::Assign,
            Tok::LeftBrace,
            Tok::String,
            Tok::Colon,
            Tok::Integer,
            Tok::RightBrace
        ]
    );
}

// ---------------------------------------------------------------------------
// 流程控制
// ---------------------------------------------------------------------------

#[test]
fn test_balanced_blocks() {
    let script = "\
if (a)
  print 1
elseif (b)
  print 2
else
  print 3
end if
while (x < 3)
  x = x + 1
end while
function addup(a, b)
  return a + b
end function
";
    let compiled = compile_ok(script);
    assert_eq!(compiled.table.len(), 10);
    assert_eq!(jump(&compiled, 0), Some(2));
    assert_eq!(jump(&compiled, 2), Some(4));
    assert_eq!(jump(&compiled, 4), Some(6));
    assert_eq!(jump(&compiled, 6), Some(7));
    assert_eq!(jump(&compiled, 7), Some(9));
    assert_eq!(jump(&compiled, 9), Some(7));
    assert_eq!(command(&compiled, 8).verb(), Some(Tok::Set));
    assert!(compiled.table.targets_are_valid());

    assert_eq!(compiled.functions.len(), 1);
    let function = &compiled.functions[0];
    assert_eq!(function.name, "addup");
    assert_eq!(function.params, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(function.body.len(), 1);
    assert_eq!(function.body.get(0).and_then(Command::verb), Some(Tok::Return));
}

#[test]
fn test_inline_if() {
    let compiled = compile_ok("if (x) print 1 end if");
    insta::assert_snapshot!(compiled.listing(), @r"
    0: if ( x ) -> 2
    1: print 1
    2: end if -> 3
    ");
}

#[test]
fn test_inline_for() {
    let compiled = compile_ok("for (i=0;i<3;i=i+1) print i; end for");
    assert_eq!(compiled.table.len(), 3);
    assert_eq!(jump(&compiled, 0), Some(2));
    assert_eq!(jump(&compiled, 2), Some(0));
    assert_eq!(command(&compiled, 1).verb(), Some(Tok::Print));
}

#[test]
fn test_else_if_merges() {
    let compiled = compile_ok("if (a)\nprint 1\nelse if (b)\nprint 2\nend if");
    assert_eq!(command(&compiled, 2).verb(), Some(Tok::ElseIf));
    assert_eq!(jump(&compiled, 0), Some(2));
    assert_eq!(jump(&compiled, 2), Some(4));
}

#[test]
fn test_stray_block_words() {
    let failure = compile_err("end if");
    assert_eq!(failure.kind, ErrorKind::BadContext("end if".to_string()));

    let failure = compile_err("select all\nelse");
    assert_eq!(failure.kind, ErrorKind::BadContext("else".to_string()));
    assert_eq!(failure.line, 2);

    let failure = compile_err("while (x)\nendif");
    assert_eq!(failure.kind, ErrorKind::BadContext("endif".to_string()));
}

#[test]
fn test_missing_end() {
    let failure = compile_err("if (x)\nprint 1");
    assert_eq!(failure.kind, ErrorKind::MissingEnd("if".to_string()));
    assert_eq!(failure.untranslated, "missing END for if");
}

#[test]
fn test_break_depth() {
    let script = "\
for (i=0;i<2;i=i+1)
  for (j=0;j<2;j=j+1)
    break 2
  end for
end for";
    let compiled = compile_ok(script);
    assert_eq!(jump(&compiled, 2), Some(0));
    assert_eq!(jump(&compiled, 1), Some(3));
    assert_eq!(jump(&compiled, 0), Some(4));

    let failure = compile_err("for (i=0;i<2;i=i+1)\n  break 2\nend for");
    assert_eq!(failure.kind, ErrorKind::BadContext("break".to_string()));
    assert_eq!(failure.line, 2);
}

#[test]
fn test_single_line_block_closed_at_end_of_line() {
    let compiled = compile_ok("if (x) print 1\nprint 2");
    assert_eq!(compiled.table.len(), 4);
    assert_eq!(kinds(command(&compiled, 2)), vec![Tok::End, Tok::If]);
    assert_eq!(compiled.table.line_of(2), Some(1));
    assert_eq!(jump(&compiled, 0), Some(2));
    assert_eq!(jump(&compiled, 2), Some(3));
}

#[test]
fn test_brace_blocks() {
    let script = "\
if (x) {
  print 1
} else {
  print 2
}";
    let compiled = compile_ok(script);
    insta::assert_snapshot!(compiled.listing(), @r"
    0: if ( x ) -> 2
    1: print 1
    2: else -> 4
    3: print 2
    4: end if -> 5
    ");

    let compiled = compile_ok("while (x < 3) { x = x + 1 }");
    assert_eq!(compiled.table.len(), 3);
    assert_eq!(kinds(command(&compiled, 2)), vec![Tok::End, Tok::While]);
    assert_eq!(jump(&compiled, 0), Some(2));
    assert_eq!(jump(&compiled, 2), Some(0));
}

#[test]
fn test_implicit_string_inside_brace_block() {
    let compiled = compile_ok("if (x) { echo hi }");
    assert_eq!(compiled.table.len(), 3);
    let echo = command(&compiled, 1).tokens();
    assert_eq!(echo[0].kind(), Tok::Echo);
    assert_eq!(echo[1].text_value(), Some("hi"));
    assert_eq!(kinds(command(&compiled, 2)), vec![Tok::End, Tok::If]);
    assert_eq!(jump(&compiled, 0), Some(2));
    assert_eq!(jump(&compiled, 2), Some(3));

    let compiled = compile_ok("if (x) { message hello }\nprint 2");
    assert_eq!(compiled.table.len(), 4);
    assert_eq!(command(&compiled, 1).tokens()[1].text_value(), Some("hello"));
    assert_eq!(command(&compiled, 3).verb(), Some(Tok::Print));

    let compiled = compile_ok("if (x) {\n  echo a {b} c\n}");
    assert_eq!(command(&compiled, 1).tokens()[1].text_value(), Some("a {b} c"));
    assert_eq!(kinds(command(&compiled, 2)), vec![Tok::End, Tok::If]);
}

#[test]
fn test_stray_closing_brace() {
    let failure = compile_err("select all\n}");
    assert_eq!(failure.kind, ErrorKind::TokenUnexpected("}".to_string()));
}

// ---------------------------------------------------------------------------
// 函数
// ---------------------------------------------------------------------------

#[test]
fn test_function_registration() {
    let mut compiler = Compiler::default();
    compiler
        .compile("a.spt", "function spin2(n)\nprint n\nend function", &options())
        .unwrap();
    assert!(compiler.functions().shared().contains("spin2"));

    compiler
        .compile("b.spt", "function _helper()\nprint 1\nend function", &options())
        .unwrap();
    assert_eq!(compiler.functions().local_len(), 1);
    assert!(!compiler.functions().shared().contains("_helper"));

    // 已注册的函数在后续脚本里按调用编译
    let compiled = compiler.compile("c.spt", "spin2(4)", &options()).unwrap();
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![Tok::Call, Tok::LeftParen, Tok::Integer, Tok::RightParen]
    );
}

#[test]
fn test_function_inside_if_chain() {
    let script = "\
if (a)
  function inner()
    print 1
  end function
  print 2
else
  print 3
end if";
    let compiled = compile_ok(script);
    insta::assert_snapshot!(compiled.listing(), @r"
    0: if ( a ) -> 2
    1: print 2
    2: else -> 4
    3: print 3
    4: end if -> 5
    ");
    assert!(compiled.table.targets_are_valid());
    assert_eq!(compiled.table.line_numbers(), &[1, 5, 6, 7, 8]);

    assert_eq!(compiled.functions.len(), 1);
    assert_eq!(compiled.functions[0].name, "inner");
    assert_eq!(compiled.functions[0].body.len(), 1);
}

#[test]
fn test_function_inside_loop_with_break() {
    let script = "\
for (i=0;i<3;i=i+1)
  function inner(n)
    print n
  end function
  if (i > 1)
    break
  end if
end for";
    let compiled = compile_ok(script);
    assert_eq!(compiled.table.len(), 5);
    assert_eq!(command(&compiled, 0).verb(), Some(Tok::For));
    assert_eq!(command(&compiled, 2).verb(), Some(Tok::Break));
    assert_eq!(kinds(command(&compiled, 4)), vec![Tok::End, Tok::For]);
    assert_eq!(jump(&compiled, 0), Some(4));
    assert_eq!(jump(&compiled, 1), Some(3));
    assert_eq!(jump(&compiled, 2), Some(0));
    assert_eq!(jump(&compiled, 3), Some(4));
    assert_eq!(jump(&compiled, 4), Some(0));
    assert!(compiled.table.targets_are_valid());

    let function = &compiled.functions[0];
    assert_eq!(function.params, vec!["n".to_string()]);
    assert_eq!(function.body.get(0).and_then(Command::verb), Some(Tok::Print));
    assert!(function.body.targets_are_valid());
}

#[test]
fn test_syntax_check_registers_nothing() {
    let shared = SharedFunctions::new();
    let mut compiler = Compiler::new(shared.clone());
    let compiled = compiler
        .compile(
            "check.spt",
            "function spin2(n)\nprint n\nend function",
            &options().syntax_check_only(true),
        )
        .unwrap();
    assert_eq!(compiled.functions.len(), 1);
    assert!(shared.is_empty());
}

#[test]
fn test_call_within_same_script() {
    let compiled = compile_ok("function spin2(n)\nprint n\nend function\nspin2(3)");
    assert_eq!(compiled.table.len(), 1);
    assert_eq!(command(&compiled, 0).verb(), Some(Tok::Call));
}

#[test]
fn test_function_redefinition_warns() {
    let compiled = compile_ok("function f()\nend function\nfunction f()\nend function");
    assert_eq!(compiled.functions.len(), 1);
    assert_eq!(compiled.warnings.len(), 1);
    assert!(compiled.warnings[0].message.contains("redefined"));
}

// ---------------------------------------------------------------------------
// 命令识别
// ---------------------------------------------------------------------------

#[test]
fn test_implicit_set() {
    let compiled = compile_ok("x = 3");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![Tok::Set, Tok::Identifier, Tok::Assign, Tok::Integer]
    );

    let compiled = compile_ok("x++");
    assert_eq!(
        kinds(command(&compiled, 0)),
        vec![Tok::Set, Tok::Identifier, Tok::PlusPlus]
    );

    assert_eq!(compile_err("x").kind, ErrorKind::CommandExpected);
    assert_eq!(compile_err("foo bar").kind, ErrorKind::CommandExpected);
    assert_eq!(compile_err("unknown(1)").kind, ErrorKind::CommandExpected);
}

#[test]
fn test_argument_checks() {
    let compiled = compile_ok("wireframe");
    assert_eq!(kinds(command(&compiled, 0)), vec![Tok::Wireframe, Tok::On]);

    assert_eq!(compile_err("exit 1").kind, ErrorKind::BadArgumentCount);
    assert_eq!(compile_err("end").kind, ErrorKind::BadArgumentCount);
    assert_eq!(
        compile_err("end foo").kind,
        ErrorKind::UnrecognizedParameter("END".to_string(), "foo".to_string())
    );
}

#[test]
fn test_unclosed_paren_reports_end_of_script() {
    let failure = compile_err("select (1");
    assert_eq!(failure.kind, ErrorKind::EndOfCommandUnexpected);
    assert_eq!(failure.offset, 9);
    assert_eq!(failure.line, 1);
    assert_eq!(failure.annotated_line, "select (1 >>>>");
}

#[test]
fn test_failure_line_with_carriage_return_endings() {
    let compiled = compile_ok("print 1\rprint 2\rselect all");
    assert_eq!(compiled.table.line_numbers(), &[1, 2, 3]);

    let failure = compile_err("print 1\rprint 2\rselect (1");
    assert_eq!(failure.line, 3);
    assert_eq!(failure.annotated_line, "select (1 >>>>");
}

#[test]
fn test_implicit_strings() {
    let compiled = compile_ok("echo hello world; print 1");
    assert_eq!(compiled.table.len(), 2);
    let echo = command(&compiled, 0).tokens();
    assert_eq!(echo[1].kind(), Tok::String);
    assert_eq!(echo[1].text_value(), Some("hello world"));

    let compiled = compile_ok("if (x) echo hi end if");
    assert_eq!(compiled.table.len(), 3);
    assert_eq!(command(&compiled, 1).tokens()[1].text_value(), Some("hi"));
    assert_eq!(kinds(command(&compiled, 2)), vec![Tok::End, Tok::If]);
}

#[test]
fn test_discarded_statement() {
    let compiled = compile_ok("select all #jc\nprint 1");
    assert_eq!(compiled.table.len(), 1);
    assert_eq!(command(&compiled, 0).verb(), Some(Tok::Print));
}

#[test]
fn test_line_numbers() {
    let compiled = compile_ok("select all\n\nprint 1");
    assert_eq!(compiled.table.line_numbers(), &[1, 3]);
}

// ---------------------------------------------------------------------------
// 变量与 define
// ---------------------------------------------------------------------------

#[test]
fn test_local_variables() {
    let compiled = compile_ok("var a = 1, b\nfor (var i = 0; i < 2; i = i + 1)\nend for");
    let names: Vec<&str> = compiled.local_variables.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["a", "b", "i"]);
}

#[test]
fn test_define() {
    let compiled = compile_ok("define myset ala\nselect myset");
    assert_eq!(
        command(&compiled, 1).argument_kinds(),
        vec![Tok::ExpressionBegin, Tok::Identifier, Tok::ExpressionEnd]
    );

    let compiled = compile_ok("define helix 1-10");
    assert_eq!(compiled.warnings.len(), 1);
    let quiet = compile("test.spt", "define helix 1-10", &options().pre_defining(true)).unwrap();
    assert!(quiet.warnings.is_empty());

    assert_eq!(
        compile_err("define select 1").kind,
        ErrorKind::InvalidExpressionToken("select".to_string())
    );
}

#[test]
fn test_json_output() {
    let compiled = compile_ok("if (x) print 1 end if");
    let json = compiled.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["script_id"], "test.spt");
    assert_eq!(value["table"]["jumps"][0], 2);
}
