//! 基站集成测试
//!
//! 通过 `Station` 驱动真实的 PositioningUnit + RadioLink，外设使用 hal 的 mock：
//! - survey-in 完整流程（300 s / 10.0 m）
//! - 128 字节突发 → 恰好一次组播
//! - 首字节超时 flush
//! - 组播失败后 RadioLink 进入 Error，PositioningUnit 继续运行但不再发送
//! - 显示通知与状态快照

use basestation_core::{
    ChannelDisplayNotifier, DisplayView, ManualClock, NullDisplayNotifier, PositioningErrorCause,
    PositioningState, RadioErrorCause, RadioState, Station, StationConfig, UnitStatus,
};
use basestation_hal::{GnssCall, MockGnssReceiver, MockMeshTransport};
use basestation_protocol::{MULTICAST_ADDRESS, PacketType, RTCM_BUFFER_SIZE};

type MockStation = Station<MockGnssReceiver, MockMeshTransport, NullDisplayNotifier, ManualClock>;

struct Harness {
    station: MockStation,
    gnss: MockGnssReceiver,
    mesh: MockMeshTransport,
    clock: ManualClock,
}

fn harness() -> Harness {
    let gnss = MockGnssReceiver::new();
    let mesh = MockMeshTransport::new();
    let clock = ManualClock::new(10_000);
    let station = Station::new(
        &StationConfig::default(),
        gnss.clone(),
        mesh.clone(),
        NullDisplayNotifier,
        clock.clone(),
    )
    .unwrap();
    Harness {
        station,
        gnss,
        mesh,
        clock,
    }
}

/// setup → enable → survey valid → Enabled
fn streaming_harness() -> Harness {
    let mut h = harness();
    h.station.setup();
    h.station.enable_positioning();
    h.gnss.set_survey_valid(true);
    h.station.tick();
    assert_eq!(h.station.positioning().state(), PositioningState::Enabled);
    h
}

#[test]
fn survey_in_scenario_reaches_enabled() {
    let mut h = harness();
    h.station.setup();

    h.station.enable_positioning();
    assert_eq!(h.station.positioning().state(), PositioningState::Enabling);
    assert!(h.gnss.calls().contains(&GnssCall::EnableSurveyMode {
        observation_time_s: 300,
        required_accuracy_m: 10.0,
    }));

    // survey 尚未有效：停留在 Enabling
    for elapsed in [10u16, 100, 250] {
        h.gnss.set_survey_progress(elapsed, 25.0 - elapsed as f32 / 20.0);
        h.station.tick();
        assert_eq!(h.station.positioning().state(), PositioningState::Enabling);
        assert_eq!(h.station.status().survey.elapsed_observation_time_s, elapsed);
    }

    h.gnss.set_survey_valid(true);
    h.station.tick();

    assert_eq!(h.station.positioning().state(), PositioningState::Enabled);
    assert_eq!(h.station.positioning().buffered_len(), 0);
    assert_eq!(
        h.gnss
            .count_calls(|c| matches!(c, GnssCall::EnableCorrectionMessage { .. })),
        4
    );
}

#[test]
fn survey_targets_from_file_fixed_at_startup() {
    let config = StationConfig::from_toml_str(
        r#"
        [survey]
        observation_time_s = 60
        required_accuracy_m = 2.5
        "#,
    )
    .unwrap();
    let gnss = MockGnssReceiver::new();
    let mut station = Station::new(
        &config,
        gnss.clone(),
        MockMeshTransport::new(),
        NullDisplayNotifier,
        ManualClock::new(0),
    )
    .unwrap();

    station.setup();
    station.enable_positioning();

    assert!(gnss.calls().contains(&GnssCall::EnableSurveyMode {
        observation_time_s: 60,
        required_accuracy_m: 2.5,
    }));
    let survey = station.positioning().survey_config();
    assert_eq!(survey.observation_time_s(), 60);
    assert_eq!(survey.required_accuracy_m(), 2.5);
}

#[test]
fn full_buffer_burst_multicasts_once() {
    let mut h = streaming_harness();
    let burst: Vec<u8> = (0..RTCM_BUFFER_SIZE).map(|i| i as u8).collect();

    h.gnss.queue_bytes(&burst);
    h.station.tick();

    let frames = h.mesh.take_sent_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, burst);
    assert_eq!(frames[0].header.to_node, MULTICAST_ADDRESS);
    assert_eq!(frames[0].header.packet_type(), Ok(PacketType::CorrectionChunk));
    assert_eq!(h.station.positioning().buffered_len(), 0);
}

#[test]
fn partial_chunk_flushed_after_timeout() {
    let mut h = streaming_harness();

    h.gnss.queue_bytes(&[0xD3, 0x00, 0x13, 0x3E]);
    h.station.tick();
    assert_eq!(h.mesh.sent_frames().len(), 0);

    h.clock.advance_ms(60);
    h.gnss.queue_bytes(&[0xD0]);
    h.station.tick();
    assert_eq!(h.mesh.sent_frames().len(), 0);

    // 以首字节时间计算，不随后续字节刷新
    h.clock.advance_ms(41);
    h.station.tick();

    let frames = h.mesh.take_sent_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, vec![0xD3, 0x00, 0x13, 0x3E, 0xD0]);
    assert_eq!(h.station.status().stream.timeout_flushes, 1);
}

#[test]
fn multicast_failure_stops_radio_but_not_positioning() {
    let mut h = streaming_harness();
    h.mesh.fail_multicast(true);

    h.gnss.queue_bytes(&[0xAA; RTCM_BUFFER_SIZE]);
    h.station.tick();

    assert_eq!(h.station.radio().state(), RadioState::Error);
    assert_eq!(
        h.station.radio().error_cause(),
        RadioErrorCause::PeripheralMulticastFailed
    );
    assert_eq!(h.station.positioning().state(), PositioningState::Enabled);
    assert_eq!(h.station.positioning().buffered_len(), 0);
    assert_eq!(h.mesh.multicast_attempts(), 1);

    // 之后的 chunk 不再触碰外设
    h.mesh.fail_multicast(false);
    h.gnss.queue_bytes(&[0xBB; RTCM_BUFFER_SIZE]);
    h.station.tick();
    assert_eq!(h.mesh.multicast_attempts(), 1);
    assert_eq!(h.station.status().stream.chunks_lost, 2);

    let status = h.station.board().snapshot();
    assert_eq!(status.radio, UnitStatus::new(2, 2));
    assert_eq!(status.positioning, UnitStatus::new(2, 0));
}

#[test]
fn radio_begin_failure_drops_all_chunks() {
    let mut h = harness();
    h.mesh.fail_begin(true);
    h.station.setup();

    assert_eq!(h.station.radio().state(), RadioState::Error);
    assert_eq!(
        h.station.radio().error_cause(),
        RadioErrorCause::PeripheralBeginFailed
    );

    h.station.enable_positioning();
    h.gnss.set_survey_valid(true);
    h.station.tick();
    h.gnss.queue_bytes(&[1; RTCM_BUFFER_SIZE]);
    h.station.tick();

    assert_eq!(h.mesh.multicast_attempts(), 0);
    assert_eq!(h.station.radio().stats(), Default::default());
    assert_eq!(h.station.status().stream.chunks_lost, 1);
}

#[test]
fn receiver_failure_is_terminal() {
    let mut h = harness();
    h.gnss.fail_set_output(true);
    h.station.setup();
    h.station.enable_positioning();

    assert_eq!(h.station.positioning().state(), PositioningState::Error);
    assert_eq!(
        h.station.positioning().error_cause(),
        PositioningErrorCause::PeripheralSetOutputFailed
    );

    h.gnss.clear_calls();
    h.gnss.fail_set_output(false);
    h.station.enable_positioning();
    for _ in 0..5 {
        h.station.tick();
    }
    assert!(h.gnss.calls().is_empty());
    assert_eq!(h.station.status().positioning, UnitStatus::new(3, 2));
}

#[test]
fn display_receives_survey_then_overview() {
    let gnss = MockGnssReceiver::new();
    let (notifier, views) = ChannelDisplayNotifier::channel(8);
    let mut station = Station::new(
        &StationConfig::default(),
        gnss.clone(),
        MockMeshTransport::new(),
        notifier,
        ManualClock::new(0),
    )
    .unwrap();

    station.setup();
    station.enable_positioning();
    gnss.set_survey_valid(true);
    station.tick();
    station.tick();

    let received: Vec<DisplayView> = views.try_iter().collect();
    assert_eq!(received, vec![DisplayView::Survey, DisplayView::Overview]);
}
