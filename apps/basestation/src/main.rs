//! # Droid Base Station
//!
//! RTK 基站运行程序：survey-in 完成后把接收机输出的 RTCM 修正数据分块组播到 mesh 网络。
//!
//! ```bash
//! # 使用默认配置运行（仿真外设）
//! basestation run
//!
//! # 10 倍速仿真，启动 2 秒后开始 survey-in
//! basestation run --speedup 10 --enable-after-ms 2000
//!
//! # 查看生效的配置
//! basestation config show
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `basestation=info`。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod display;
mod sim;

use commands::{ConfigCommand, RunCommand};

/// Droid Base Station - RTK 修正数据中继
#[derive(Parser, Debug)]
#[command(name = "basestation")]
#[command(about = "RTK base station: survey-in and RTCM relay over a mesh network", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/basestation/config.toml）
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行基站（默认）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("basestation=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { args }) => args.execute(cli.config.as_deref()),
        Some(Commands::Config(cmd)) => cmd.execute(cli.config.as_deref()),
        None => RunCommand::default().execute(cli.config.as_deref()),
    }
}
