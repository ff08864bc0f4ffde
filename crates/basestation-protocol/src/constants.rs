//! 构建期常量
//!
//! 基站固件中所有"编译期固定"的参数都集中在这里。
//! 运行期不会修改这些值（配置文件只在启动时读取一次）。

/// RTCM 缓冲区容量（字节）
///
/// 缓冲区写满时立即同步 flush，因此一个 chunk 的最大长度等于该值。
pub const RTCM_BUFFER_SIZE: usize = 128;

/// 首字节写入后超过该时长（毫秒）仍未写满，则在下一个 tick 强制 flush
pub const RTCM_FLUSH_AFTER_MS: u64 = 100;

/// Mesh 网络单帧最大有效载荷（字节）
pub const MAX_CHUNK_SIZE: usize = 144;

/// 入站消息读取时使用的临时缓冲区大小
pub const INBOUND_SCRATCH_SIZE: usize = 128;

/// 射频信道
pub const RADIO_CHANNEL: u8 = 90;

/// 基站在 mesh 网络中的节点地址（八进制表示，根节点）
pub const BASE_NODE_ADDRESS: u16 = 0o0;

/// Mesh 组播地址（所有订阅的 droid 都会收到）
pub const MULTICAST_ADDRESS: u16 = 0o100;

/// 组播层级
pub const MULTICAST_LEVEL: u8 = 0;

/// 默认 survey-in 最短观测时间（秒）
pub const DEFAULT_OBSERVATION_TIME_S: u16 = 300;

/// 默认 survey-in 所需精度（米）
pub const DEFAULT_REQUIRED_ACCURACY_M: f32 = 10.0;

/// 状态显示的最小刷新间隔（毫秒）
pub const DISPLAY_REFRESH_MS: u64 = 500;

/// 调度器默认 tick 周期（毫秒）
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5;

// 一个 chunk 必须能放进一个 mesh 帧
const _: () = assert!(RTCM_BUFFER_SIZE <= MAX_CHUNK_SIZE);
const _: () = assert!(RTCM_BUFFER_SIZE > 0);
