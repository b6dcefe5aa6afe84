use std::path::PathBuf;
use std::process::ExitCode;

use angularjs_index::index::ProjectIndex;
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "angularjs-index")]
#[command(about = "Index AngularJS components, controllers, directives and routes", long_about = None)]
#[command(version)]
struct Cli {
    /// プロジェクトルート（ajsconfig.json を置く場所）
    #[arg(default_value = ".")]
    root: PathBuf,

    /// 出力する種別
    #[arg(short, long, value_enum, default_value = "all")]
    kind: Kind,

    /// JSONを整形して出力する
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    All,
    Components,
    Controllers,
    Directives,
    Routes,
    Html,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let index = ProjectIndex::open(&cli.root)?;
    index.refresh().await?;

    let mut output = Map::new();
    let wants = |kind: Kind| cli.kind == Kind::All || cli.kind == kind;
    if wants(Kind::Components) {
        let components = index.components().snapshot().await;
        output.insert("components".to_string(), serde_json::to_value(&*components)?);
    }
    if wants(Kind::Controllers) {
        let controllers = index.controllers().snapshot().await;
        output.insert("controllers".to_string(), serde_json::to_value(&*controllers)?);
    }
    if wants(Kind::Directives) {
        let directives = index.directives().snapshot().await;
        output.insert("directives".to_string(), serde_json::to_value(&*directives)?);
    }
    if wants(Kind::Routes) {
        let routes = index.routes().snapshot().await;
        output.insert("routes".to_string(), serde_json::to_value(&*routes)?);
    }
    if wants(Kind::Html) {
        let html = index.html().snapshot().await;
        output.insert("html".to_string(), serde_json::to_value(&*html)?);
    }

    let output = Value::Object(output);
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);
    Ok(())
}
