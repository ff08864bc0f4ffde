//! Mock 外设
//!
//! 用于测试和仿真的可脚本化外设。句柄可以 `clone()`：
//! 一份交给被测单元持有，另一份留在测试中注入故障、排队数据、检查调用记录。

use crate::{CorrectionSink, GnssError, GnssReceiver, MeshError, MeshTransport};
use basestation_protocol::{NetworkHeader, OutputProtocols, ReceiverPort, RtcmMessage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

// ==================== GNSS 接收机 ====================

/// 接收机调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum GnssCall {
    Begin,
    SetOutputProtocols(u8),
    RequestSurveyStatus,
    EnableSurveyMode {
        observation_time_s: u16,
        required_accuracy_m: f32,
    },
    EnableCorrectionMessage {
        message: RtcmMessage,
        port: ReceiverPort,
        rate: u8,
    },
    Poll,
}

/// 模拟接收机内部状态
#[derive(Debug, Default)]
struct MockGnssState {
    fail_begin: bool,
    fail_set_output: bool,
    fail_survey_status: bool,
    fail_enable_survey: bool,
    fail_message: Option<RtcmMessage>,
    survey_active: bool,
    survey_valid: bool,
    observation_time_s: u16,
    mean_accuracy_m: f32,
    pending_bytes: VecDeque<u8>,
    calls: Vec<GnssCall>,
}

/// 可脚本化的 GNSS 接收机
#[derive(Debug, Clone, Default)]
pub struct MockGnssReceiver {
    state: Arc<Mutex<MockGnssState>>,
}

impl MockGnssReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `begin()` 是否失败
    pub fn fail_begin(&self, fail: bool) {
        self.state.lock().fail_begin = fail;
    }

    /// `set_output_protocols()` 是否失败
    pub fn fail_set_output(&self, fail: bool) {
        self.state.lock().fail_set_output = fail;
    }

    /// `request_survey_status()` 是否失败
    pub fn fail_survey_status(&self, fail: bool) {
        self.state.lock().fail_survey_status = fail;
    }

    /// `enable_survey_mode()` 是否失败
    pub fn fail_enable_survey(&self, fail: bool) {
        self.state.lock().fail_enable_survey = fail;
    }

    /// 开启指定 RTCM 消息时失败
    pub fn fail_message(&self, message: Option<RtcmMessage>) {
        self.state.lock().fail_message = message;
    }

    /// 设置 survey-in 是否已在进行
    pub fn set_survey_active(&self, active: bool) {
        self.state.lock().survey_active = active;
    }

    /// 设置 survey-in 结果是否有效
    pub fn set_survey_valid(&self, valid: bool) {
        self.state.lock().survey_valid = valid;
    }

    /// 设置接收机上报的进度
    pub fn set_survey_progress(&self, observation_time_s: u16, mean_accuracy_m: f32) {
        let mut state = self.state.lock();
        state.observation_time_s = observation_time_s;
        state.mean_accuracy_m = mean_accuracy_m;
    }

    /// 排队 RTCM 字节，下一次 `poll()` 时全部交给回调
    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.state.lock().pending_bytes.extend(bytes.iter().copied());
    }

    /// 尚未交付的字节数
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending_bytes.len()
    }

    /// 获取调用记录快照
    pub fn calls(&self) -> Vec<GnssCall> {
        self.state.lock().calls.clone()
    }

    /// 清空调用记录
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// 统计满足条件的调用次数
    pub fn count_calls(&self, predicate: impl Fn(&GnssCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }
}

impl GnssReceiver for MockGnssReceiver {
    fn begin(&mut self) -> Result<(), GnssError> {
        let mut state = self.state.lock();
        state.calls.push(GnssCall::Begin);
        if state.fail_begin {
            return Err(GnssError::Timeout { operation: "begin" });
        }
        Ok(())
    }

    fn set_output_protocols(&mut self, protocols: OutputProtocols) -> Result<(), GnssError> {
        let mut state = self.state.lock();
        state.calls.push(GnssCall::SetOutputProtocols(protocols.bits()));
        if state.fail_set_output {
            return Err(GnssError::Rejected {
                operation: "set_output_protocols",
            });
        }
        Ok(())
    }

    fn request_survey_status(&mut self) -> Result<(), GnssError> {
        let mut state = self.state.lock();
        state.calls.push(GnssCall::RequestSurveyStatus);
        if state.fail_survey_status {
            return Err(GnssError::Timeout {
                operation: "request_survey_status",
            });
        }
        Ok(())
    }

    fn survey_active(&self) -> bool {
        self.state.lock().survey_active
    }

    fn survey_valid(&mut self) -> bool {
        self.state.lock().survey_valid
    }

    fn enable_survey_mode(
        &mut self,
        observation_time_s: u16,
        required_accuracy_m: f32,
    ) -> Result<(), GnssError> {
        let mut state = self.state.lock();
        state.calls.push(GnssCall::EnableSurveyMode {
            observation_time_s,
            required_accuracy_m,
        });
        if state.fail_enable_survey {
            return Err(GnssError::Rejected {
                operation: "enable_survey_mode",
            });
        }
        state.survey_active = true;
        Ok(())
    }

    fn enable_correction_message(
        &mut self,
        message: RtcmMessage,
        port: ReceiverPort,
        rate: u8,
    ) -> Result<(), GnssError> {
        let mut state = self.state.lock();
        state.calls.push(GnssCall::EnableCorrectionMessage {
            message,
            port,
            rate,
        });
        if state.fail_message == Some(message) {
            return Err(GnssError::Rejected {
                operation: "enable_correction_message",
            });
        }
        Ok(())
    }

    fn survey_observation_time(&self) -> u16 {
        self.state.lock().observation_time_s
    }

    fn survey_mean_accuracy(&self) -> f32 {
        self.state.lock().mean_accuracy_m
    }

    fn poll(&mut self, sink: &mut dyn CorrectionSink) {
        // 先取出字节再回调，回调期间不持有锁
        let bytes: Vec<u8> = {
            let mut state = self.state.lock();
            state.calls.push(GnssCall::Poll);
            state.pending_bytes.drain(..).collect()
        };
        trace!("mock receiver delivering {} bytes", bytes.len());
        for byte in bytes {
            sink.process_byte(byte);
        }
    }
}

// ==================== Mesh 射频 ====================

/// 已组播的帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub header: NetworkHeader,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockMeshState {
    fail_begin: bool,
    fail_multicast: bool,
    began: bool,
    relay: Option<bool>,
    multicast_level: Option<u8>,
    network: Option<(u8, u16)>,
    update_count: usize,
    multicast_attempts: usize,
    sent: Vec<SentFrame>,
    inbound: VecDeque<(NetworkHeader, Vec<u8>)>,
}

/// 可脚本化的 mesh 网络
#[derive(Debug, Clone, Default)]
pub struct MockMeshTransport {
    state: Arc<Mutex<MockMeshState>>,
}

impl MockMeshTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `begin()` 是否失败
    pub fn fail_begin(&self, fail: bool) {
        self.state.lock().fail_begin = fail;
    }

    /// `multicast()` 是否失败
    pub fn fail_multicast(&self, fail: bool) {
        self.state.lock().fail_multicast = fail;
    }

    /// 排队一条入站消息
    pub fn queue_inbound(&self, header: NetworkHeader, payload: &[u8]) {
        self.state.lock().inbound.push_back((header, payload.to_vec()));
    }

    /// 尚未读取的入站消息数
    pub fn inbound_len(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// 成功组播的帧
    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.state.lock().sent.clone()
    }

    /// 取走成功组播的帧
    pub fn take_sent_frames(&self) -> Vec<SentFrame> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// `multicast()` 被调用的次数（含失败）
    pub fn multicast_attempts(&self) -> usize {
        self.state.lock().multicast_attempts
    }

    /// `update()` 被调用的次数
    pub fn update_count(&self) -> usize {
        self.state.lock().update_count
    }

    pub fn began(&self) -> bool {
        self.state.lock().began
    }

    pub fn relay(&self) -> Option<bool> {
        self.state.lock().relay
    }

    pub fn multicast_level(&self) -> Option<u8> {
        self.state.lock().multicast_level
    }

    /// 网络层启动参数（信道, 节点地址）
    pub fn network(&self) -> Option<(u8, u16)> {
        self.state.lock().network
    }
}

impl MeshTransport for MockMeshTransport {
    fn begin(&mut self) -> Result<(), MeshError> {
        let mut state = self.state.lock();
        if state.fail_begin {
            return Err(MeshError::RadioNotResponding);
        }
        state.began = true;
        Ok(())
    }

    fn set_relay(&mut self, enabled: bool) {
        self.state.lock().relay = Some(enabled);
    }

    fn set_multicast_level(&mut self, level: u8) {
        self.state.lock().multicast_level = Some(level);
    }

    fn begin_network(&mut self, channel: u8, node_address: u16) {
        self.state.lock().network = Some((channel, node_address));
    }

    fn update(&mut self) {
        self.state.lock().update_count += 1;
    }

    fn available(&mut self) -> bool {
        !self.state.lock().inbound.is_empty()
    }

    fn read(&mut self, buf: &mut [u8]) -> (NetworkHeader, usize) {
        let mut state = self.state.lock();
        match state.inbound.pop_front() {
            Some((header, payload)) => {
                let len = payload.len().min(buf.len());
                buf[..len].copy_from_slice(&payload[..len]);
                (header, len)
            },
            None => (NetworkHeader::default(), 0),
        }
    }

    fn multicast(&mut self, header: &NetworkHeader, payload: &[u8]) -> Result<(), MeshError> {
        let mut state = self.state.lock();
        state.multicast_attempts += 1;
        if state.fail_multicast {
            return Err(MeshError::SendFailed { len: payload.len() });
        }
        basestation_protocol::check_payload_len(payload.len())?;
        state.sent.push(SentFrame {
            header: *header,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basestation_protocol::PacketType;

    #[test]
    fn test_mock_receiver_poll_drains_queue() {
        let handle = MockGnssReceiver::new();
        let mut receiver = handle.clone();
        handle.queue_bytes(&[1, 2, 3]);

        let mut received = Vec::new();
        receiver.poll(&mut |b: u8| received.push(b));

        assert_eq!(received, vec![1, 2, 3]);
        assert_eq!(handle.pending_len(), 0);
        assert_eq!(handle.calls(), vec![GnssCall::Poll]);
    }

    #[test]
    fn test_mock_receiver_failures() {
        let handle = MockGnssReceiver::new();
        let mut receiver = handle.clone();

        handle.fail_begin(true);
        assert!(receiver.begin().is_err());

        handle.fail_message(Some(RtcmMessage::GlonassMsm7));
        assert!(
            receiver
                .enable_correction_message(RtcmMessage::GpsMsm7, ReceiverPort::I2c, 1)
                .is_ok()
        );
        assert!(
            receiver
                .enable_correction_message(RtcmMessage::GlonassMsm7, ReceiverPort::I2c, 1)
                .is_err()
        );
    }

    #[test]
    fn test_mock_mesh_read_truncates_to_buffer() {
        let handle = MockMeshTransport::new();
        let mut mesh = handle.clone();
        handle.queue_inbound(NetworkHeader::new(0o1, PacketType::CorrectionChunk), &[9; 10]);

        assert!(mesh.available());
        let mut buf = [0u8; 4];
        let (header, len) = mesh.read(&mut buf);
        assert_eq!(header.to_node, 0o1);
        assert_eq!(len, 4);
        assert!(!mesh.available());
    }

    #[test]
    fn test_mock_mesh_multicast_failure_is_not_recorded() {
        let handle = MockMeshTransport::new();
        let mut mesh = handle.clone();
        let header = NetworkHeader::multicast(PacketType::CorrectionChunk);

        assert!(mesh.multicast(&header, &[1, 2]).is_ok());
        handle.fail_multicast(true);
        assert!(mesh.multicast(&header, &[3]).is_err());

        assert_eq!(handle.multicast_attempts(), 2);
        assert_eq!(handle.sent_frames().len(), 1);
    }
}
