//! 基站粘合层
//!
//! 持有两个单元，按固定顺序驱动：先 RadioLink（处理入站消息），再 PositioningUnit
//! （可能 flush 到 RadioLink），最后发布状态快照。

use crate::clock::Clock;
use crate::config::StationConfig;
use crate::display::DisplayNotifier;
use crate::error::ConfigError;
use crate::positioning::PositioningUnit;
use crate::radio::RadioLink;
use crate::status::{StationStatus, StatusBoard, UnitStatus};
use basestation_hal::{GnssReceiver, MeshTransport};
use tracing::info;

/// RTK 基站
pub struct Station<R, T, D, K> {
    positioning: PositioningUnit<R, D, K>,
    radio: RadioLink<T>,
    board: StatusBoard,
    ticks: u64,
}

impl<R, T, D, K> Station<R, T, D, K>
where
    R: GnssReceiver,
    T: MeshTransport,
    D: DisplayNotifier,
    K: Clock,
{
    /// 按配置创建基站（尚未初始化外设）
    pub fn new(
        config: &StationConfig,
        receiver: R,
        transport: T,
        display: D,
        clock: K,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let positioning = PositioningUnit::new(
            config.survey_config()?,
            config.streamer.flush_after_ms,
            receiver,
            display,
            clock,
        );
        let radio = RadioLink::new(transport, config.radio);

        Ok(Self {
            positioning,
            radio,
            board: StatusBoard::new(),
            ticks: 0,
        })
    }

    /// 初始化两个单元，并立即启用 RadioLink
    pub fn setup(&mut self) {
        self.radio.setup();
        self.positioning.setup(&mut self.radio);
        self.radio.enable();
        info!(
            "Station ready (radio {:?}, positioning {:?})",
            self.radio.state(),
            self.positioning.state()
        );
        self.publish();
    }

    /// 操作员触发：开始 survey-in
    pub fn enable_positioning(&mut self) {
        self.positioning.enable(&mut self.radio);
        self.publish();
    }

    /// 一个调度周期
    pub fn tick(&mut self) {
        self.radio.tick();
        self.positioning.tick(&mut self.radio);
        self.ticks += 1;
        self.publish();
    }

    /// 当前状态
    pub fn status(&self) -> StationStatus {
        StationStatus {
            positioning: UnitStatus::new(
                self.positioning.state().code(),
                self.positioning.error_cause().code(),
            ),
            radio: UnitStatus::new(self.radio.state().code(), self.radio.error_cause().code()),
            survey: self.positioning.survey_progress(),
            stream: self.positioning.stream_stats(),
            link: self.radio.stats(),
            tick: self.ticks,
        }
    }

    /// 快照发布板（可 clone 给显示线程）
    pub fn board(&self) -> StatusBoard {
        self.board.clone()
    }

    pub fn positioning(&self) -> &PositioningUnit<R, D, K> {
        &self.positioning
    }

    pub fn radio(&self) -> &RadioLink<T> {
        &self.radio
    }

    fn publish(&self) {
        self.board.publish(self.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::NullDisplayNotifier;
    use crate::positioning::PositioningState;
    use crate::radio::RadioState;
    use basestation_hal::{MockGnssReceiver, MockMeshTransport};

    #[test]
    fn test_setup_enables_radio_only() {
        let mut station = Station::new(
            &StationConfig::default(),
            MockGnssReceiver::new(),
            MockMeshTransport::new(),
            NullDisplayNotifier,
            ManualClock::new(0),
        )
        .unwrap();
        station.setup();

        assert_eq!(station.radio().state(), RadioState::Running);
        assert_eq!(station.positioning().state(), PositioningState::Disabled);

        let status = station.board().snapshot();
        assert_eq!(status.radio, UnitStatus::new(1, 0));
        assert_eq!(status.positioning, UnitStatus::new(0, 0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = StationConfig::default();
        config.survey.observation_time_s = 0;
        let result = Station::new(
            &config,
            MockGnssReceiver::new(),
            MockMeshTransport::new(),
            NullDisplayNotifier,
            ManualClock::new(0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tick_publishes_snapshot() {
        let mut station = Station::new(
            &StationConfig::default(),
            MockGnssReceiver::new(),
            MockMeshTransport::new(),
            NullDisplayNotifier,
            ManualClock::new(0),
        )
        .unwrap();
        let board = station.board();
        station.setup();
        station.tick();
        station.tick();

        assert_eq!(board.snapshot().tick, 2);
        assert_eq!(board.snapshot(), station.status());
    }
}
