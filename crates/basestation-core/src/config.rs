//! # 基站配置
//!
//! 启动时读取一次的 TOML 配置，运行期间不再修改。
//!
//! ```toml
//! [survey]
//! observation_time_s = 300
//! required_accuracy_m = 10.0
//!
//! [radio]
//! channel = 90
//! node_address = 0
//! multicast_level = 0
//! relay = true
//!
//! [streamer]
//! flush_after_ms = 100
//!
//! [scheduler]
//! tick_interval_ms = 5
//! ```
//!
//! 缺省的字段和段落取构建期常量。
//!
//! `[survey]` 是 survey-in 目标（观测时间、要求精度）唯一的覆盖入口：
//! 构建期常量是缺省值，配置文件只在启动时覆盖一次。`Station::new` 把结果
//! 固化为 [`SurveyConfig`]，之后没有任何接口可以修改它。

use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use crate::survey::SurveyConfig;
use basestation_protocol::{
    BASE_NODE_ADDRESS, DEFAULT_OBSERVATION_TIME_S, DEFAULT_REQUIRED_ACCURACY_M,
    DEFAULT_TICK_INTERVAL_MS, MULTICAST_LEVEL, RADIO_CHANNEL, RTCM_FLUSH_AFTER_MS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 基站配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub survey: SurveySection,
    pub radio: RadioConfig,
    pub streamer: StreamerConfig,
    pub scheduler: SchedulerSection,
}

/// `[survey]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveySection {
    /// 最短观测时间（秒）
    pub observation_time_s: u16,
    /// 所需精度（米）
    pub required_accuracy_m: f32,
}

impl Default for SurveySection {
    fn default() -> Self {
        Self {
            observation_time_s: DEFAULT_OBSERVATION_TIME_S,
            required_accuracy_m: DEFAULT_REQUIRED_ACCURACY_M,
        }
    }
}

/// `[radio]`：mesh 网络参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// 射频信道
    pub channel: u8,
    /// 本节点地址
    pub node_address: u16,
    /// 组播层级
    pub multicast_level: u8,
    /// 是否转发组播
    pub relay: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel: RADIO_CHANNEL,
            node_address: BASE_NODE_ADDRESS,
            multicast_level: MULTICAST_LEVEL,
            relay: true,
        }
    }
}

/// `[streamer]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// 首字节后的超时 flush 阈值（毫秒）
    pub flush_after_ms: u64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            flush_after_ms: RTCM_FLUSH_AFTER_MS,
        }
    }
}

/// `[scheduler]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// tick 周期（毫秒）
    pub tick_interval_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl StationConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    ///
    /// 默认路径由调用方决定（例如 `~/.config/basestation/config.toml`）。
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到文件
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.survey_config()?;

        if self.streamer.flush_after_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "streamer.flush_after_ms",
                reason: "must be > 0".to_string(),
            });
        }

        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.tick_interval_ms",
                reason: "must be > 0".to_string(),
            });
        }

        Ok(())
    }

    /// survey-in 配置
    pub fn survey_config(&self) -> Result<SurveyConfig, ConfigError> {
        SurveyConfig::new(
            self.survey.observation_time_s,
            self.survey.required_accuracy_m,
        )
    }

    /// 调度配置（不限制 tick 数）
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_millis(self.scheduler.tick_interval_ms),
            max_ticks: None,
        }
    }
}
