use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use cql_engine::{build_ast_with, simplify, tokenize, write, ReaderConfig};

/// 交互选项, 通过 `:tokens` / `:json` 切换
struct Options {
    show_tokens: bool,
    show_json: bool,
}

/// 加载读取配置; 未指定配置文件时使用默认配置
fn load_config() -> Result<ReaderConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let config = ReaderConfig::from_json_file(&path)
                .with_context(|| format!("加载配置文件失败: {path}"))?;
            println!("✅ 使用JSON配置文件: {path}");
            Ok(config)
        }
        None => {
            println!("⚠️ 未指定配置文件, 使用默认配置");
            Ok(ReaderConfig::default())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("--- CQL 过滤表达式引擎 ---");
    let config = load_config()?;

    println!("\n[配置信息]:");
    let functions = config.functions.names().collect::<Vec<_>>();
    println!("已注册的过滤函数: {}", functions.join(", "));
    match config.max_depth {
        Some(depth) => println!("括号嵌套深度上限: {depth}"),
        None => println!("括号嵌套深度上限: 无"),
    }
    println!("\n输入 CQL 表达式; :tokens 切换 token 输出, :json 切换 JSON 输出, :quit 退出\n");

    let mut options = Options {
        show_tokens: false,
        show_json: true,
    };
    let mut editor = DefaultEditor::new().context("无法初始化行编辑器")?;

    loop {
        let line = match editor.readline("cql> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("读取输入失败"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(line) {
            tracing::debug!(error = %e, "failed to record history entry");
        }

        match line {
            ":quit" | ":q" => break,
            ":tokens" => {
                options.show_tokens = !options.show_tokens;
                println!("token 输出: {}", on_off(options.show_tokens));
            }
            ":json" => {
                options.show_json = !options.show_json;
                println!("JSON 输出: {}", on_off(options.show_json));
            }
            text => {
                if let Err(e) = evaluate(text, &config, &options) {
                    println!("✗ {e:#}");
                }
            }
        }
    }
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "开"
    } else {
        "关"
    }
}

/// 对一行输入执行 分词 → 解析 → 化简 → 写回
fn evaluate(text: &str, config: &ReaderConfig, options: &Options) -> Result<()> {
    // 1. 词法分析
    let tokens = tokenize(text).context("分词失败")?;
    if options.show_tokens {
        println!("[步骤 1]: 生成了 {} 个 token", tokens.len());
        for token in &tokens {
            println!("  {:<22} {:?} @{}", token.kind.name(), token.text, token.span.start);
        }
    }

    // 2. 语法分析
    let filter = build_ast_with(&tokens, config).context("解析失败")?;
    if options.show_json {
        println!("[步骤 2]: 过滤树");
        println!("{}", serde_json::to_string_pretty(&filter)?);
    }

    // 3. 化简
    let simplified = simplify(&filter);
    if simplified != filter && options.show_json {
        println!("[步骤 3]: 化简后的过滤树");
        println!("{}", serde_json::to_string_pretty(&simplified)?);
    }

    // 4. 写回 CQL
    let cql = write(&simplified).context("写回 CQL 失败")?;
    println!("✓ {cql}");
    Ok(())
}
