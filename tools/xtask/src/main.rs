//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-molscript`: 运行 molscript 覆盖率
//! - `script-check`: 检查脚本文件（语法、警告）

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use molscript::{DiagnosticResult, check_script};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

/// 脚本文件扩展名
const SCRIPT_EXTENSION: &str = "spt";

fn run(step: &str, cmd: xshell::Cmd<'_>) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    cmd.run()
        .map_err(|e| anyhow::anyhow!("{step} failed: {e}"))
}

fn ensure_cargo_llvm_cov_available(sh: &Shell) -> anyhow::Result<()> {
    match cmd!(sh, "cargo llvm-cov --version").quiet().ignore_stdout().run() {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());
    let sh = Shell::new()?;

    match sub.as_str() {
        "check-all" => {
            run(
                "cargo fmt --all -- --check",
                cmd!(sh, "cargo fmt --all -- --check"),
            )?;
            run(
                "cargo clippy --workspace --all-targets",
                cmd!(sh, "cargo clippy --workspace --all-targets"),
            )?;
            run("cargo test --workspace", cmd!(sh, "cargo test --workspace"))?;
        }
        "cov-molscript" => {
            ensure_cargo_llvm_cov_available(&sh)?;
            run(
                "cargo llvm-cov -p molscript --html",
                cmd!(sh, "cargo llvm-cov -p molscript --html"),
            )?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "script-check" => {
            let path = args.next();
            script_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-molscript   运行 molscript 覆盖率报告
  script-check    检查脚本文件

SCRIPT-CHECK:
  cargo xtask script-check [path]

  不带参数：检查 scripts/ 下所有 .spt 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - 脚本编译错误（带行号与出错位置）
    - 编译警告（重定义预定义名字、函数重定义）
"#
    );
}

//=============================================================================
// script-check 命令实现
//=============================================================================

/// 默认脚本目录（相对于 workspace root）
const DEFAULT_SCRIPTS_DIR: &str = "scripts";

/// 脚本检查结果
struct ScriptCheckResult {
    /// 检查的脚本数量
    scripts_checked: usize,
    /// 无法读取的文件数量
    read_errors: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

/// 执行脚本检查
fn script_check(path: Option<&str>) -> anyhow::Result<()> {
    // 确定要检查的文件
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_script_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_SCRIPTS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认脚本目录不存在: {}\n请在 workspace 根目录运行，或指定脚本路径",
                    dir.display()
                );
            }
            collect_script_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到脚本文件（.{}）", SCRIPT_EXTENSION);
        return Ok(());
    }

    eprintln!("==> 检查 {} 个脚本文件...\n", files.len());

    let mut result = ScriptCheckResult {
        scripts_checked: 0,
        read_errors: 0,
        diagnostics: DiagnosticResult::new(),
    };

    for file in &files {
        check_script_file(file, &mut result);
    }

    print_check_result(&result);

    if result.read_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("脚本检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有脚本文件
fn collect_script_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION))
        .collect();
    files.sort();
    files
}

/// 检查单个脚本文件
fn check_script_file(file: &Path, result: &mut ScriptCheckResult) {
    let script_id = file.display().to_string();
    result.scripts_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", script_id, e);
            result.read_errors += 1;
            return;
        }
    };

    result.diagnostics.merge(check_script(&script_id, &content));
}

/// 输出检查结果
fn print_check_result(result: &ScriptCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个脚本", result.scripts_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    let error_count = result.read_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
