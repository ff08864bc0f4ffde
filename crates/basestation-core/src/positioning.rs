//! PositioningUnit - survey-in 与 RTCM 采集状态机
//!
//! 状态：`Disabled → Enabling → Enabled`，任一接收机操作失败进入 `Error`（终态）。
//!
//! ```text
//! Disabled ──enable()──> Enabling ──survey valid + 4 条 RTCM 消息已开启──> Enabled
//!                           │                                              │
//!                           └──────────────── 接收机故障 ──────> Error <───┘
//! ```
//!
//! # Flush 路径
//!
//! chunk 可能从两个地方发出，二者共用 [`flush_chunk`]：
//!
//! 1. 接收机 `poll()` 内部同步回调字节，缓冲区写满时立即 flush（嵌套在 tick 内）
//! 2. Enabled 的 do 在 `poll()` 之后检查首字节超时
//!
//! 缓冲区只由 PositioningUnit 持有。回调期间通过 [`Intake`] 独占借用缓冲区，
//! 借用检查保证回调与 tick 主体不会同时修改它。

use crate::clock::Clock;
use crate::display::DisplayNotifier;
use crate::error::PositioningErrorCause;
use crate::fsm::{self, Lifecycle, Step};
use crate::radio::ChunkSink;
use crate::streamer::{BufferedStreamer, FlushDecision};
use crate::survey::{SurveyConfig, SurveyProgress};
use basestation_hal::{CorrectionSink, GnssError, GnssReceiver};
use basestation_protocol::{OutputProtocols, REQUIRED_RTCM_MESSAGES, ReceiverPort};
use num_enum::IntoPrimitive;
use tracing::{debug, error, info, trace, warn};

/// PositioningUnit 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive)]
#[repr(u8)]
pub enum PositioningState {
    #[default]
    Disabled = 0,
    Enabling = 1,
    Enabled = 2,
    Error = 3,
}

impl PositioningState {
    /// 显示用数值编码
    pub fn code(self) -> u8 {
        self.into()
    }
}

/// RTCM 采集统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    /// 从接收机收到的字节数
    pub bytes_received: u64,
    /// 交给 RadioLink 的 chunk 数（含发送失败）
    pub chunks_flushed: u64,
    /// 因写满触发的 flush
    pub capacity_flushes: u64,
    /// 因超时触发的 flush
    pub timeout_flushes: u64,
    /// RadioLink 拒绝或发送失败的 chunk（不重发）
    pub chunks_lost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushReason {
    Capacity,
    Timeout,
}

/// 把缓冲区内容交给 RadioLink，然后无条件清空
///
/// 至多一次投递：发送失败的 chunk 不会重发，故障由 RadioLink 自己的状态体现。
fn flush_chunk<L: ChunkSink + ?Sized, const C: usize>(
    streamer: &mut BufferedStreamer<C>,
    link: &mut L,
    stats: &mut StreamStats,
    reason: FlushReason,
) {
    if streamer.is_empty() {
        return;
    }

    let len = streamer.len();
    match link.send_chunk(streamer.as_slice()) {
        Ok(()) => trace!("Flushed RTCM chunk of {} bytes ({:?})", len, reason),
        Err(e) => {
            stats.chunks_lost += 1;
            debug!("RTCM chunk of {} bytes lost: {}", len, e);
        },
    }

    stats.chunks_flushed += 1;
    match reason {
        FlushReason::Capacity => stats.capacity_flushes += 1,
        FlushReason::Timeout => stats.timeout_flushes += 1,
    }

    streamer.clear();
}

/// 接收机字节回调
///
/// 在 `poll()` 期间独占借用缓冲区、时钟和组播能力。
struct Intake<'a, L: ?Sized, K, const C: usize> {
    streamer: &'a mut BufferedStreamer<C>,
    link: &'a mut L,
    clock: &'a K,
    stats: &'a mut StreamStats,
}

impl<L, K, const C: usize> CorrectionSink for Intake<'_, L, K, C>
where
    L: ChunkSink + ?Sized,
    K: Clock,
{
    fn process_byte(&mut self, byte: u8) {
        self.stats.bytes_received += 1;
        if self.streamer.append(byte, self.clock.now_ms()) == FlushDecision::CapacityReached {
            flush_chunk(
                &mut *self.streamer,
                &mut *self.link,
                &mut *self.stats,
                FlushReason::Capacity,
            );
        }
    }
}

/// GNSS 定位单元
///
/// # 类型参数
///
/// - `R`: 接收机能力
/// - `D`: 显示通知
/// - `K`: 时钟
///
/// 组播能力不由本单元持有，每次 `setup()`/`enable()`/`tick()` 时由调用方传入。
pub struct PositioningUnit<R, D, K> {
    receiver: R,
    display: D,
    clock: K,
    survey: SurveyConfig,
    progress: SurveyProgress,
    streamer: BufferedStreamer,
    state: PositioningState,
    error_cause: PositioningErrorCause,
    stats: StreamStats,
}

impl<R, D, K> PositioningUnit<R, D, K>
where
    R: GnssReceiver,
    D: DisplayNotifier,
    K: Clock,
{
    /// 创建单元（Disabled）
    pub fn new(survey: SurveyConfig, flush_after_ms: u64, receiver: R, display: D, clock: K) -> Self {
        Self {
            receiver,
            display,
            clock,
            survey,
            progress: SurveyProgress::default(),
            streamer: BufferedStreamer::new(flush_after_ms),
            state: PositioningState::Disabled,
            error_cause: PositioningErrorCause::Ok,
            stats: StreamStats::default(),
        }
    }

    pub fn state(&self) -> PositioningState {
        self.state
    }

    pub fn error_cause(&self) -> PositioningErrorCause {
        self.error_cause
    }

    /// 最近一次 survey-in 进度（只在 Enabling 中更新）
    pub fn survey_progress(&self) -> SurveyProgress {
        self.progress
    }

    pub fn survey_config(&self) -> SurveyConfig {
        self.survey
    }

    pub fn stream_stats(&self) -> StreamStats {
        self.stats
    }

    /// 缓冲区中尚未发送的字节数
    pub fn buffered_len(&self) -> usize {
        self.streamer.len()
    }

    /// 缓冲区写满后被拒绝的字节数
    pub fn rejected_bytes(&self) -> u64 {
        self.streamer.rejected()
    }

    /// 进入初始状态 Disabled；离开 Disabled 之后再调用无效
    pub fn setup<L: ChunkSink + ?Sized>(&mut self, link: &mut L) {
        if self.state != PositioningState::Disabled {
            debug!("Positioning setup ignored in state {:?}", self.state);
            return;
        }
        fsm::enter(self, link);
    }

    /// 激活：仅 Disabled → Enabling，其他状态下静默忽略
    pub fn enable<L: ChunkSink + ?Sized>(&mut self, link: &mut L) {
        if self.state != PositioningState::Disabled {
            debug!("Positioning enable ignored in state {:?}", self.state);
            return;
        }
        fsm::transition(self, link, PositioningState::Enabling);
    }

    /// 执行当前状态的 do
    pub fn tick<L: ChunkSink + ?Sized>(&mut self, link: &mut L) {
        fsm::tick(self, link);
    }

    fn fail(&mut self, cause: PositioningErrorCause, err: &GnssError) -> Step<PositioningState> {
        error!("Receiver failure ({:?}): {}", cause, err);
        self.error_cause = cause;
        Step::Goto(PositioningState::Error)
    }

    fn enabling_entry(&mut self) -> Step<PositioningState> {
        self.progress.reset();

        if let Err(e) = self.receiver.begin() {
            return self.fail(PositioningErrorCause::PeripheralBeginFailed, &e);
        }

        if let Err(e) = self
            .receiver
            .set_output_protocols(OutputProtocols::base_station())
        {
            return self.fail(PositioningErrorCause::PeripheralSetOutputFailed, &e);
        }

        if let Err(e) = self.receiver.request_survey_status() {
            return self.fail(PositioningErrorCause::PeripheralGetSurveyStatusFailed, &e);
        }

        if self.receiver.survey_active() {
            info!("Survey-in already active on receiver");
        } else {
            let observation_time_s = self.survey.observation_time_s();
            let required_accuracy_m = self.survey.required_accuracy_m();
            if let Err(e) = self
                .receiver
                .enable_survey_mode(observation_time_s, required_accuracy_m)
            {
                return self.fail(PositioningErrorCause::PeripheralEnableSurveyModeFailed, &e);
            }
            info!(
                "Survey-in started: {} s, {:.2} m",
                observation_time_s, required_accuracy_m
            );
        }

        self.display.switch_to_survey_view();
        Step::Stay
    }

    fn enabling_do(&mut self) -> Step<PositioningState> {
        if self.receiver.survey_valid() {
            for message in REQUIRED_RTCM_MESSAGES {
                if let Err(e) =
                    self.receiver
                        .enable_correction_message(message, ReceiverPort::I2c, message.rate())
                {
                    warn!("Enabling RTCM {} failed", message.number());
                    return self.fail(PositioningErrorCause::PeripheralEnableRTCMMessagesFailed, &e);
                }
            }
            info!("Survey-in complete, RTCM output enabled");
            return Step::Goto(PositioningState::Enabled);
        }

        if let Err(e) = self.receiver.request_survey_status() {
            return self.fail(PositioningErrorCause::PeripheralSvinStatusRequestFailed, &e);
        }

        // 接收机不提供有效性标志，原样记录
        self.progress.record(
            self.receiver.survey_observation_time(),
            self.receiver.survey_mean_accuracy(),
        );
        trace!(
            "Survey-in progress: {} s, {:.2} m",
            self.progress.elapsed_observation_time_s, self.progress.mean_accuracy_m
        );
        Step::Stay
    }

    fn enabled_do<L: ChunkSink + ?Sized>(&mut self, link: &mut L) -> Step<PositioningState> {
        let Self {
            receiver,
            clock,
            streamer,
            stats,
            ..
        } = &mut *self;

        let mut intake = Intake {
            streamer,
            link: &mut *link,
            clock,
            stats,
        };
        receiver.poll(&mut intake);

        if self.streamer.should_timeout_flush(self.clock.now_ms()) {
            flush_chunk(&mut self.streamer, link, &mut self.stats, FlushReason::Timeout);
        }
        Step::Stay
    }
}

impl<R, D, K, L> Lifecycle<L> for PositioningUnit<R, D, K>
where
    R: GnssReceiver,
    D: DisplayNotifier,
    K: Clock,
    L: ChunkSink + ?Sized,
{
    type State = PositioningState;

    fn current(&self) -> PositioningState {
        self.state
    }

    fn replace(&mut self, next: PositioningState) {
        self.state = next;
    }

    fn on_entry(&mut self, _link: &mut L) -> Step<PositioningState> {
        match self.state {
            PositioningState::Disabled => Step::Stay,
            PositioningState::Enabling => self.enabling_entry(),
            PositioningState::Enabled => {
                self.streamer.clear();
                Step::Stay
            },
            PositioningState::Error => {
                error!("Positioning stopped: {:?}", self.error_cause);
                Step::Stay
            },
        }
    }

    fn on_do(&mut self, link: &mut L) -> Step<PositioningState> {
        match self.state {
            PositioningState::Disabled | PositioningState::Error => Step::Stay,
            PositioningState::Enabling => self.enabling_do(),
            PositioningState::Enabled => self.enabled_do(link),
        }
    }

    fn on_exit(&mut self, _link: &mut L) {
        if self.state == PositioningState::Enabling {
            self.display.switch_to_overview_view();
        }
    }
}
