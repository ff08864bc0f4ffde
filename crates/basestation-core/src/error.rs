//! 核心层错误类型定义
//!
//! 每个单元的故障原因都是一个带稳定数值编码的枚举，状态显示直接读取这些编码。
//! 所有外设故障对所属单元都是终态：不重试、不退避、不自动恢复。

use crate::radio::RadioState;
use basestation_hal::MeshError;
use num_enum::IntoPrimitive;
use thiserror::Error;

/// PositioningUnit 故障原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive)]
#[repr(u8)]
pub enum PositioningErrorCause {
    /// 无故障
    #[default]
    Ok = 0,
    /// 接收机初始化失败
    PeripheralBeginFailed = 1,
    /// 配置输出协议失败
    PeripheralSetOutputFailed = 2,
    /// 进入 Enabling 时查询 survey-in 状态失败
    PeripheralGetSurveyStatusFailed = 3,
    /// 启动 survey-in 失败
    PeripheralEnableSurveyModeFailed = 4,
    /// survey-in 期间轮询状态失败
    PeripheralSvinStatusRequestFailed = 5,
    /// 开启 RTCM 消息失败
    PeripheralEnableRTCMMessagesFailed = 6,
}

impl PositioningErrorCause {
    /// 显示用数值编码
    pub fn code(self) -> u8 {
        self.into()
    }
}

/// RadioLink 故障原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive)]
#[repr(u8)]
pub enum RadioErrorCause {
    /// 无故障
    #[default]
    Ok = 0,
    /// 射频芯片初始化失败
    PeripheralBeginFailed = 1,
    /// 组播发送失败
    PeripheralMulticastFailed = 2,
}

impl RadioErrorCause {
    /// 显示用数值编码
    pub fn code(self) -> u8 {
        self.into()
    }
}

/// 组播失败原因（返回给调用方）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MulticastError {
    /// RadioLink 不在 Running 状态，数据被丢弃
    #[error("Radio link not running (state: {state:?})")]
    NotRunning { state: RadioState },

    /// chunk 超过单帧最大载荷
    #[error("Chunk too large: {len} bytes (max {max})")]
    ChunkTooLarge { len: usize, max: usize },

    /// 底层发送失败，RadioLink 已进入 Error
    #[error("Multicast transport failure: {0}")]
    Transport(#[from] MeshError),
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
