//! 配置管理命令

use anyhow::{Context, Result};
use basestation_core::StationConfig;
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
    path.push("basestation");
    path.push("config.toml");
    Ok(path)
}

/// 加载生效的配置
///
/// - 显式指定的路径必须存在
/// - 未指定时使用默认路径，文件不存在则取内置默认值
pub fn load_config(explicit: Option<&Path>) -> Result<StationConfig> {
    if let Some(path) = explicit {
        return StationConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let path = default_config_path()?;
    if !path.exists() {
        info!("No config at {}, using built-in defaults", path.display());
        return Ok(StationConfig::default());
    }

    StationConfig::load_from_path(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（TOML）
    Show,

    /// 写出默认配置文件
    Init {
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let config = load_config(explicit)?;
                print!("{}", config.to_toml_string()?);
                Ok(())
            },
            ConfigCommand::Init { force } => {
                let path = match explicit {
                    Some(path) => path.to_path_buf(),
                    None => default_config_path()?,
                };
                init_config(&path, force)?;
                println!("Wrote {}", path.display());
                Ok(())
            },
            ConfigCommand::Path => {
                match explicit {
                    Some(path) => println!("{}", path.display()),
                    None => println!("{}", default_config_path()?.display()),
                }
                Ok(())
            },
        }
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    StationConfig::default().save_to_path(path)?;
    Ok(())
}
