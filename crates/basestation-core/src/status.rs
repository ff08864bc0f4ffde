//! 状态快照
//!
//! 显示器运行在自己的线程和节奏上，只读取 [`StatusBoard`] 发布的快照，
//! 不持有任何单元的引用。

use crate::positioning::StreamStats;
use crate::radio::LinkStats;
use crate::survey::SurveyProgress;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// 单元的 (状态, 故障原因) 数值编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitStatus {
    pub state_code: u8,
    pub error_code: u8,
}

impl UnitStatus {
    pub fn new(state_code: u8, error_code: u8) -> Self {
        Self {
            state_code,
            error_code,
        }
    }
}

/// 基站状态快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationStatus {
    pub positioning: UnitStatus,
    pub radio: UnitStatus,
    pub survey: SurveyProgress,
    pub stream: StreamStats,
    pub link: LinkStats,
    /// 已执行的 tick 数
    pub tick: u64,
}

/// 快照发布板
///
/// 写端（调度线程）每个 tick 整体替换快照，读端无锁读取。
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<ArcSwap<StationStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发布新快照
    pub fn publish(&self, status: StationStatus) {
        self.inner.store(Arc::new(status));
    }

    /// 读取最新快照
    pub fn snapshot(&self) -> StationStatus {
        **self.inner.load()
    }
}
