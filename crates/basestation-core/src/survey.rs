//! Survey-in 参数与进度

use crate::error::ConfigError;
use basestation_protocol::{DEFAULT_OBSERVATION_TIME_S, DEFAULT_REQUIRED_ACCURACY_M};

/// Survey-in 配置（构造后不可变）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveyConfig {
    observation_time_s: u16,
    required_accuracy_m: f32,
}

impl SurveyConfig {
    /// 创建配置
    ///
    /// 两个参数都必须严格为正（精度还必须是有限值）。
    pub fn new(observation_time_s: u16, required_accuracy_m: f32) -> Result<Self, ConfigError> {
        if observation_time_s == 0 {
            return Err(ConfigError::Invalid {
                field: "survey.observation_time_s",
                reason: "must be > 0".to_string(),
            });
        }
        if !(required_accuracy_m.is_finite() && required_accuracy_m > 0.0) {
            return Err(ConfigError::Invalid {
                field: "survey.required_accuracy_m",
                reason: format!("must be a positive finite number, got {}", required_accuracy_m),
            });
        }
        Ok(Self {
            observation_time_s,
            required_accuracy_m,
        })
    }

    /// 最短观测时间（秒）
    pub fn observation_time_s(&self) -> u16 {
        self.observation_time_s
    }

    /// 所需精度（米）
    pub fn required_accuracy_m(&self) -> f32 {
        self.required_accuracy_m
    }
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            observation_time_s: DEFAULT_OBSERVATION_TIME_S,
            required_accuracy_m: DEFAULT_REQUIRED_ACCURACY_M,
        }
    }
}

/// Survey-in 进度
///
/// 只在 Enabling 状态下更新，进入 Enabling 时清空。
/// 数值是接收机上报的参考值，接收机不提供有效性标志，这里原样保存。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurveyProgress {
    /// 已观测时间（秒）
    pub elapsed_observation_time_s: u16,
    /// 平均精度（米）
    pub mean_accuracy_m: f32,
    /// 是否已收到过至少一次上报
    pub has_prior_sample: bool,
}

impl SurveyProgress {
    /// 用接收机最新上报覆盖
    pub fn record(&mut self, elapsed_observation_time_s: u16, mean_accuracy_m: f32) {
        self.elapsed_observation_time_s = elapsed_observation_time_s;
        self.mean_accuracy_m = mean_accuracy_m;
        self.has_prior_sample = true;
    }

    /// 清空
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
