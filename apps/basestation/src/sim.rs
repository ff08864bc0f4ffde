//! 仿真外设
//!
//! 没有接收机和射频模块时用于演示和联调：
//! - [`SimulatedReceiver`]：survey-in 在观测时间内精度逐渐收敛，完成后每个历元输出一组 RTCM3 帧
//! - [`SimulatedMesh`]：记录组播字节数，可在第 N 个 chunk 后模拟发送失败

use basestation_core::{Clock, MonotonicClock};
use basestation_hal::{CorrectionSink, GnssError, GnssReceiver, MeshError, MeshTransport};
use basestation_protocol::{
    NetworkHeader, OutputProtocols, ReceiverPort, RtcmMessage, check_payload_len,
    encode_rtcm3_frame,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// survey-in 开始时的平均精度（米）
const INITIAL_ACCURACY_M: f32 = 30.0;

/// 历元间隔（毫秒）
const EPOCH_MS: u64 = 1_000;

/// 仿真 GNSS 接收机
pub struct SimulatedReceiver {
    clock: MonotonicClock,
    rng: StdRng,
    /// 仿真时间相对真实时间的倍速
    speedup: u32,
    survey_started_at_ms: Option<u64>,
    survey_target: Option<(u16, f32)>,
    enabled_messages: HashSet<RtcmMessage>,
    next_epoch_at_ms: u64,
    epoch: u64,
}

impl SimulatedReceiver {
    pub fn new(seed: u64, speedup: u32) -> Self {
        Self {
            clock: MonotonicClock::new(),
            rng: StdRng::seed_from_u64(seed),
            speedup: speedup.max(1),
            survey_started_at_ms: None,
            survey_target: None,
            enabled_messages: HashSet::new(),
            next_epoch_at_ms: 0,
            epoch: 0,
        }
    }

    /// 仿真时间（毫秒）
    fn sim_now_ms(&self) -> u64 {
        self.clock.now_ms() * self.speedup as u64
    }

    fn elapsed_s(&self) -> u16 {
        match self.survey_started_at_ms {
            Some(start) => {
                let secs = self.sim_now_ms().saturating_sub(start) / 1_000;
                secs.min(u16::MAX as u64) as u16
            },
            None => 0,
        }
    }

    fn accuracy_m(&self) -> f32 {
        let Some((observation_time_s, required_accuracy_m)) = self.survey_target else {
            return INITIAL_ACCURACY_M;
        };
        let floor = required_accuracy_m * 0.8;
        let progress = (self.elapsed_s() as f32 / observation_time_s as f32).min(1.0);
        INITIAL_ACCURACY_M - (INITIAL_ACCURACY_M - floor) * progress
    }

    /// 生成一条消息的载荷：12 位消息号 + 随机内容
    fn message_payload(&mut self, message: RtcmMessage) -> Vec<u8> {
        let len = match message {
            RtcmMessage::StationArp => 19,
            RtcmMessage::GpsMsm7 | RtcmMessage::GlonassMsm7 => self.rng.gen_range(120..360),
            RtcmMessage::GlonassCodePhaseBias => 6,
        };
        let mut payload = vec![0u8; len];
        self.rng.fill(&mut payload[..]);

        let number = message.number();
        payload[0] = (number >> 4) as u8;
        payload[1] = ((number & 0x0F) as u8) << 4 | (payload[1] & 0x0F);
        payload
    }

    fn emit_epoch(&mut self, sink: &mut dyn CorrectionSink) {
        let mut total = 0usize;
        for message in basestation_protocol::REQUIRED_RTCM_MESSAGES {
            if !self.enabled_messages.contains(&message) {
                continue;
            }
            if self.epoch % message.rate() as u64 != 0 {
                continue;
            }
            let payload = self.message_payload(message);
            // 载荷长度受上面的范围约束，不会超过帧上限
            if let Ok(frame) = encode_rtcm3_frame(&payload) {
                total += frame.len();
                for byte in frame {
                    sink.process_byte(byte);
                }
            }
        }
        trace!("Simulated epoch {} emitted {} bytes", self.epoch, total);
        self.epoch += 1;
    }
}

impl GnssReceiver for SimulatedReceiver {
    fn begin(&mut self) -> Result<(), GnssError> {
        info!("Simulated receiver online (x{} time)", self.speedup);
        Ok(())
    }

    fn set_output_protocols(&mut self, protocols: OutputProtocols) -> Result<(), GnssError> {
        debug!("Simulated receiver output protocols {:#05b}", protocols.bits());
        Ok(())
    }

    fn request_survey_status(&mut self) -> Result<(), GnssError> {
        Ok(())
    }

    fn survey_active(&self) -> bool {
        self.survey_started_at_ms.is_some()
    }

    fn survey_valid(&mut self) -> bool {
        match self.survey_target {
            Some((observation_time_s, required_accuracy_m)) => {
                self.elapsed_s() >= observation_time_s && self.accuracy_m() <= required_accuracy_m
            },
            None => false,
        }
    }

    fn enable_survey_mode(
        &mut self,
        observation_time_s: u16,
        required_accuracy_m: f32,
    ) -> Result<(), GnssError> {
        self.survey_started_at_ms = Some(self.sim_now_ms());
        self.survey_target = Some((observation_time_s, required_accuracy_m));
        Ok(())
    }

    fn enable_correction_message(
        &mut self,
        message: RtcmMessage,
        port: ReceiverPort,
        rate: u8,
    ) -> Result<(), GnssError> {
        if port != ReceiverPort::I2c {
            return Err(GnssError::Rejected {
                operation: "enable_correction_message",
            });
        }
        debug!("Simulated receiver: RTCM {} every {} epoch(s)", message.number(), rate);
        self.enabled_messages.insert(message);
        Ok(())
    }

    fn survey_observation_time(&self) -> u16 {
        self.elapsed_s()
    }

    fn survey_mean_accuracy(&self) -> f32 {
        self.accuracy_m()
    }

    fn poll(&mut self, sink: &mut dyn CorrectionSink) {
        if self.enabled_messages.is_empty() {
            return;
        }
        let now = self.sim_now_ms();
        if now >= self.next_epoch_at_ms {
            self.next_epoch_at_ms = now + EPOCH_MS;
            self.emit_epoch(sink);
        }
    }
}

/// 仿真 mesh 网络
pub struct SimulatedMesh {
    /// 第 N 个 chunk 开始发送失败
    fail_after: Option<u64>,
    chunks: u64,
    bytes: u64,
}

impl SimulatedMesh {
    pub fn new(fail_after: Option<u64>) -> Self {
        Self {
            fail_after,
            chunks: 0,
            bytes: 0,
        }
    }
}

impl MeshTransport for SimulatedMesh {
    fn begin(&mut self) -> Result<(), MeshError> {
        info!("Simulated radio online");
        Ok(())
    }

    fn set_relay(&mut self, enabled: bool) {
        debug!("Simulated radio relay: {}", enabled);
    }

    fn set_multicast_level(&mut self, level: u8) {
        debug!("Simulated radio multicast level: {}", level);
    }

    fn begin_network(&mut self, channel: u8, node_address: u16) {
        debug!(
            "Simulated network on channel {} as node 0o{:o}",
            channel, node_address
        );
    }

    fn update(&mut self) {}

    fn available(&mut self) -> bool {
        false
    }

    fn read(&mut self, _buf: &mut [u8]) -> (NetworkHeader, usize) {
        (NetworkHeader::default(), 0)
    }

    fn multicast(&mut self, header: &NetworkHeader, payload: &[u8]) -> Result<(), MeshError> {
        check_payload_len(payload.len())?;
        if self.fail_after.is_some_and(|n| self.chunks >= n) {
            return Err(MeshError::SendFailed { len: payload.len() });
        }
        self.chunks += 1;
        self.bytes += payload.len() as u64;
        trace!(
            "Simulated multicast to 0o{:o}: {} bytes (total {} chunks, {} bytes)",
            header.to_node,
            payload.len(),
            self.chunks,
            self.bytes
        );
        Ok(())
    }
}
