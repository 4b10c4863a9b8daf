//! # molc
//!
//! MolScript 编译器命令行：编译脚本文件并输出命令表。
//!
//! ## 用法
//!
//! ```bash
//! # 在项目根目录使用 cargo 运行
//! cargo run -p molc -- demo.spt
//! cargo run -p molc -- demo.spt --json
//! cargo run -p molc -- lib.spt demo.spt --check
//! cargo run -p molc -- demo.spt --config options.json --trace
//!
//! # 或安装后直接使用
//! cargo install --path tools/molc
//! molc demo.spt --zh
//! ```
//!
//! 多个文件按顺序编译，共用一个函数注册表：前面脚本定义的函数
//! 在后面的脚本里按函数调用编译。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use molscript::{CompileOptions, CompiledScript, Compiler, SharedFunctions, SimplifiedChinese};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "molc")]
#[command(about = "MolScript 编译器 - 编译脚本并输出命令表")]
#[command(version)]
struct Cli {
    /// 脚本文件
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// 以 JSON 输出编译结果
    #[arg(long)]
    json: bool,

    /// 只检查语法（不注册函数，不输出命令表）
    #[arg(long)]
    check: bool,

    /// 每条命令入表时输出 debug 日志
    #[arg(long)]
    trace: bool,

    /// 编译选项 JSON 文件；命令行开关覆盖其中的值
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 允许静默覆盖预定义名字
    #[arg(long)]
    pre_defining: bool,

    /// 不输出警告日志
    #[arg(short, long)]
    silent: bool,

    /// 错误消息使用简体中文
    #[arg(long)]
    zh: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.trace);

    match run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("❌ {} 个脚本编译失败", failed);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("❌ molc: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(trace: bool) {
    let level = if trace { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 编译全部文件，返回失败的个数
fn run(cli: &Cli) -> anyhow::Result<usize> {
    let options = resolve_options(cli)?;
    let mut compiler = Compiler::new(SharedFunctions::new());
    if cli.zh {
        compiler = compiler.with_catalog(SimplifiedChinese::new());
    }

    let mut failed = 0;
    for file in &cli.files {
        let script_id = file.display().to_string();
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("无法读取脚本: {}", script_id))?;

        match compiler.compile(&script_id, &source, &options) {
            Ok(compiled) => {
                info!(
                    script = %script_id,
                    commands = compiled.table.len(),
                    functions = compiled.functions.len(),
                    warnings = compiled.warnings.len(),
                    "编译完成"
                );
                print_compiled(cli, &compiled)?;
            }
            Err(failure) => {
                eprintln!("{}", failure.to_diagnostic());
                failed += 1;
            }
        }
    }
    Ok(failed)
}

/// 配置文件打底，命令行开关只能打开选项
fn resolve_options(cli: &Cli) -> anyhow::Result<CompileOptions> {
    let base = match &cli.config {
        Some(path) => load_options(path)?,
        None => CompileOptions::default(),
    };
    Ok(CompileOptions {
        pre_defining: base.pre_defining || cli.pre_defining,
        silent: base.silent || cli.silent,
        debug_trace: base.debug_trace || cli.trace,
        syntax_check_only: base.syntax_check_only || cli.check,
    })
}

fn load_options(path: &Path) -> anyhow::Result<CompileOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取配置: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("配置格式错误: {}", path.display()))
}

fn print_compiled(cli: &Cli, compiled: &CompiledScript) -> anyhow::Result<()> {
    if cli.check {
        println!(
            "✅ {}: {} 条命令, {} 个警告",
            compiled.script_id,
            compiled.table.len(),
            compiled.warnings.len()
        );
        return Ok(());
    }
    if cli.json {
        println!("{}", compiled.to_json()?);
        return Ok(());
    }

    println!("# {}", compiled.script_id);
    if !compiled.table.is_empty() {
        println!("{}", compiled.listing());
    }
    for function in &compiled.functions {
        println!();
        println!("# function {}({})", function.name, function.params.join(", "));
        if !function.body.is_empty() {
            println!("{}", function.body.listing());
        }
    }
    if !compiled.local_variables.is_empty() {
        let names: Vec<&str> = compiled.local_variables.iter().map(String::as_str).collect();
        println!();
        println!("# var {}", names.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["molc"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_flags_turn_options_on() {
        let options = resolve_options(&cli(&["a.spt", "--check", "--trace"])).unwrap();
        assert!(options.syntax_check_only);
        assert!(options.debug_trace);
        assert!(!options.pre_defining);
    }

    #[test]
    fn test_config_file_is_base() {
        let dir = std::env::temp_dir().join(format!("molc-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("options.json");
        std::fs::write(&path, r#"{ "pre_defining": true }"#).unwrap();

        let config = path.to_string_lossy().to_string();
        let options = resolve_options(&cli(&["a.spt", "--config", &config, "-s"])).unwrap();
        assert!(options.pre_defining);
        assert!(options.silent);
        assert!(!options.syntax_check_only);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
