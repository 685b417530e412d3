//! 把本地字体文件上传到配置的对象存储，供服务按 `font.key` 读取。
//!
//! 用法：`seed_font [--force] <font-file> [key]`，key 缺省为配置中的 `font.key`。

use std::path::PathBuf;

use axum::body::Bytes;
use ogp_backend::AppConfig;
use ogp_backend::storage::{build_blob_store, validate_key};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse(std::env::args().skip(1).collect());
    let Some(font_path) = args.font_path.filter(|_| !args.help) else {
        print_help();
        return Ok(());
    };

    let config = AppConfig::init_global()?;
    let key = args.key.unwrap_or_else(|| config.font.key.clone());
    validate_key(&key)?;

    let data = tokio::fs::read(&font_path).await?;
    let face = ttf_parser::Face::parse(&data, 0)
        .map_err(|e| format!("`{}` 不是可解析的字体文件: {e}", font_path.display()))?;
    let family = face
        .names()
        .into_iter()
        .find(|n| n.name_id == ttf_parser::name_id::FAMILY && n.is_unicode())
        .and_then(|n| n.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());

    let store = build_blob_store(&config.storage)?;
    if !args.force && store.exists(&key).await? {
        println!("已存在，跳过: {key}（使用 --force 覆盖）");
        return Ok(());
    }

    let len = data.len();
    store.put(&key, Bytes::from(data)).await?;
    println!(
        "已上传: {} → {} ({family}, {len} bytes, {})",
        font_path.display(),
        key,
        store.describe()
    );
    Ok(())
}

struct Args {
    help: bool,
    force: bool,
    font_path: Option<PathBuf>,
    key: Option<String>,
}

impl Args {
    fn parse(argv: Vec<String>) -> Self {
        let mut args = Self {
            help: false,
            force: false,
            font_path: None,
            key: None,
        };

        for a in argv {
            match a.as_str() {
                "-h" | "--help" => args.help = true,
                "--force" => args.force = true,
                _ if args.font_path.is_none() => args.font_path = Some(PathBuf::from(a)),
                _ if args.key.is_none() => args.key = Some(a),
                _ => {}
            }
        }
        args
    }
}

fn print_help() {
    println!(
        "seed_font [--force] <font-file> [key]\n\n\
         上传字体到配置的对象存储（读取 config.toml / APP_* 环境变量）。\n\
         key 缺省为 font.key；目标已存在时跳过，除非指定 --force。"
    );
}
