//! 基站核心模块
//!
//! 本模块提供 RTK 基站的三个协作状态机：
//! - `PositioningUnit`：survey-in 生命周期 + RTCM 字节接收
//! - `BufferedStreamer`：固定容量缓冲区与双触发 flush 策略（写满 / 首字节超时）
//! - `RadioLink`：mesh 网络初始化、组播发送、入站消息处理
//!
//! 三者运行在同一个协作式调度 tick 上（单线程、无抢占）。
//! [`Station`] 负责把它们粘合起来并按固定顺序驱动。
//!
//! # 使用场景
//!
//! ```rust,ignore
//! use basestation_core::{Station, StationConfig, MonotonicClock, NullDisplayNotifier};
//!
//! let mut station = Station::new(&config, receiver, transport, NullDisplayNotifier, MonotonicClock::new())?;
//! station.setup();
//! station.enable_positioning();
//! loop {
//!     station.tick();
//! }
//! ```

pub mod clock;
pub mod config;
pub mod display;
mod error;
pub mod fsm;
pub mod positioning;
pub mod radio;
pub mod scheduler;
mod station;
pub mod status;
pub mod streamer;
pub mod survey;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{RadioConfig, SchedulerSection, StationConfig, StreamerConfig, SurveySection};
pub use display::{ChannelDisplayNotifier, DisplayNotifier, DisplayView, NullDisplayNotifier};
pub use error::{ConfigError, MulticastError, PositioningErrorCause, RadioErrorCause};
pub use fsm::{Lifecycle, Step};
pub use positioning::{PositioningState, PositioningUnit, StreamStats};
pub use radio::{ChunkSink, LinkStats, RadioLink, RadioState};
pub use scheduler::{SchedulerConfig, SchedulerReport, run_fixed_rate};
pub use station::Station;
pub use status::{StationStatus, StatusBoard, UnitStatus};
pub use streamer::{BufferedStreamer, FlushDecision};
pub use survey::{SurveyConfig, SurveyProgress};
