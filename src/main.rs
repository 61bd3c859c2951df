use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use label_ocr_client::utils::logging;
use label_ocr_client::{App, Command, Config};

/// 药品标签识别与合规校验
#[derive(Debug, Parser)]
#[command(name = "label_ocr_client", version)]
struct Cli {
    /// 配置文件（TOML），环境变量优先
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    let result = app.run(cli.command).await;
    app.shutdown();

    result
}
