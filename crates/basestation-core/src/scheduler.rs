//! 固定周期调度循环
//!
//! 单线程、协作式：每个周期调用一次 `body`，body 内不得阻塞。
//! 睡眠到下一个锚点（扣除 body 的耗时）；超时的周期记录后直接进入下一帧，不补偿。

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 调度参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// tick 周期
    pub tick_interval: Duration,
    /// 最多执行的 tick 数（None 表示直到停止标志置位）
    pub max_ticks: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(basestation_protocol::DEFAULT_TICK_INTERVAL_MS),
            max_ticks: None,
        }
    }
}

/// 循环结束后的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerReport {
    /// 执行的 tick 数
    pub ticks: u64,
    /// 超时的 tick 数
    pub overruns: u64,
}

/// 以固定周期运行 `body(tick_index)`，直到 `stop` 置位或达到 `max_ticks`
pub fn run_fixed_rate<F>(config: &SchedulerConfig, stop: &AtomicBool, mut body: F) -> SchedulerReport
where
    F: FnMut(u64),
{
    let period = config.tick_interval;
    let mut report = SchedulerReport::default();
    let mut next_tick = Instant::now();

    debug!("Scheduler started with period {:?}", period);

    while !stop.load(Ordering::Relaxed) {
        if config.max_ticks.is_some_and(|max| report.ticks >= max) {
            break;
        }

        body(report.ticks);
        report.ticks += 1;

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            report.overruns += 1;
            warn!(
                "Tick overrun: {:?} behind schedule (period {:?})",
                now.duration_since(next_tick),
                period
            );
            // 重置锚点，避免累积延迟
            next_tick = now;
        }
    }

    debug!(
        "Scheduler stopped after {} ticks ({} overruns)",
        report.ticks, report.overruns
    );
    report
}
