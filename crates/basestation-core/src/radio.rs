//! RadioLink - mesh 网络状态机
//!
//! 状态：`Idle → Running → Error`
//!
//! - `setup()`：初始化射频芯片（失败直接进入 Error），开启组播转发，
//!   以固定信道和地址启动网络层，设置组播层级，然后进入 Idle
//! - `enable()`：仅在 Idle 时进入 Running，其余状态下忽略
//! - Running 的 do：驱动网络层更新，读取并分发所有入站消息
//! - `multicast()`：仅在 Running 时发送；底层发送失败进入 Error（终态）
//!
//! 入站方向目前没有定义需要处理的消息类型，所有消息读取后丢弃，
//! [`RadioLink::dispatch_inbound`] 是新增消息类型的扩展点。

use crate::error::{MulticastError, RadioErrorCause};
use crate::config::RadioConfig;
use crate::fsm::{self, Lifecycle, Step};
use basestation_hal::MeshTransport;
use basestation_protocol::{INBOUND_SCRATCH_SIZE, MAX_CHUNK_SIZE, NetworkHeader, PacketType};
use num_enum::IntoPrimitive;
use tracing::{debug, error, info, trace};

/// 组播发送能力
///
/// PositioningUnit 只持有这个能力的引用，不拥有 RadioLink。
pub trait ChunkSink {
    /// 把一个 chunk 组播给所有 droid
    fn send_chunk(&mut self, chunk: &[u8]) -> Result<(), MulticastError>;
}

/// RadioLink 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive)]
#[repr(u8)]
pub enum RadioState {
    #[default]
    Idle = 0,
    Running = 1,
    Error = 2,
}

impl RadioState {
    /// 显示用数值编码
    pub fn code(self) -> u8 {
        self.into()
    }
}

/// 链路统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// 成功组播的 chunk 数
    pub chunks_sent: u64,
    /// 成功组播的字节数
    pub bytes_sent: u64,
    /// 底层发送失败次数
    pub multicast_failures: u64,
    /// 读取的入站消息数
    pub inbound_received: u64,
    /// 未处理而丢弃的入站消息数
    pub inbound_discarded: u64,
}

/// Mesh 网络链路
pub struct RadioLink<T> {
    transport: T,
    config: RadioConfig,
    state: RadioState,
    error_cause: RadioErrorCause,
    stats: LinkStats,
}

impl<T: MeshTransport> RadioLink<T> {
    /// 创建链路（尚未初始化外设）
    pub fn new(transport: T, config: RadioConfig) -> Self {
        Self {
            transport,
            config,
            state: RadioState::Idle,
            error_cause: RadioErrorCause::Ok,
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    pub fn error_cause(&self) -> RadioErrorCause {
        self.error_cause
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// 初始化外设并进入 Idle
    pub fn setup(&mut self) {
        if let Err(e) = self.transport.begin() {
            error!("Radio begin failed: {}", e);
            self.error_cause = RadioErrorCause::PeripheralBeginFailed;
            self.state = RadioState::Error;
            fsm::enter(self, &mut ());
            return;
        }

        self.transport.set_relay(self.config.relay);
        self.transport
            .begin_network(self.config.channel, self.config.node_address);
        self.transport.set_multicast_level(self.config.multicast_level);

        info!(
            "Mesh network up on channel {} as node 0o{:o}",
            self.config.channel, self.config.node_address
        );

        self.state = RadioState::Idle;
        fsm::enter(self, &mut ());
    }

    /// Idle → Running；其他状态下忽略
    pub fn enable(&mut self) {
        if self.state != RadioState::Idle {
            debug!("Radio enable ignored in state {:?}", self.state);
            return;
        }
        fsm::transition(self, &mut (), RadioState::Running);
    }

    /// 执行当前状态的 do
    pub fn tick(&mut self) {
        fsm::tick(self, &mut ());
    }

    /// 组播一个 chunk
    ///
    /// - 不在 Running：丢弃数据，返回 `NotRunning`，状态与统计都不变，不触碰外设
    /// - 超过单帧载荷：返回 `ChunkTooLarge`，状态与统计都不变
    /// - 底层发送失败：进入 Error（`PeripheralMulticastFailed`），返回 `Transport`
    ///
    /// 被拒绝的 chunk 由调用方计数（见 `StreamStats::chunks_lost`）。
    pub fn multicast(&mut self, chunk: &[u8]) -> Result<(), MulticastError> {
        if self.state != RadioState::Running {
            debug!(
                "Not writing RTCM chunk ({} bytes), radio state {:?}",
                chunk.len(),
                self.state
            );
            return Err(MulticastError::NotRunning { state: self.state });
        }

        if chunk.len() > MAX_CHUNK_SIZE {
            return Err(MulticastError::ChunkTooLarge {
                len: chunk.len(),
                max: MAX_CHUNK_SIZE,
            });
        }

        let header = NetworkHeader::multicast(PacketType::CorrectionChunk);
        match self.transport.multicast(&header, chunk) {
            Ok(()) => {
                self.stats.chunks_sent += 1;
                self.stats.bytes_sent += chunk.len() as u64;
                trace!("Multicast RTCM chunk of {} bytes", chunk.len());
                Ok(())
            },
            Err(e) => {
                error!("Mesh RTCM chunk multicast failed: {}", e);
                self.stats.multicast_failures += 1;
                self.error_cause = RadioErrorCause::PeripheralMulticastFailed;
                fsm::transition(self, &mut (), RadioState::Error);
                Err(MulticastError::Transport(e))
            },
        }
    }

    /// 入站消息分发
    ///
    /// 目前没有定义入站消息类型，所有消息都丢弃。
    fn dispatch_inbound(&mut self, header: NetworkHeader, payload: &[u8]) {
        match header.packet_type() {
            Ok(PacketType::CorrectionChunk) => {
                trace!(
                    "Ignoring correction chunk ({} bytes) addressed to 0o{:o}",
                    payload.len(),
                    header.to_node
                );
            },
            Err(e) => {
                trace!("Discarding inbound message: {}", e);
            },
        }
        self.stats.inbound_discarded += 1;
    }

    fn running_do(&mut self) {
        let mut scratch = [0u8; INBOUND_SCRATCH_SIZE];

        self.transport.update();

        while self.transport.available() {
            let (header, len) = self.transport.read(&mut scratch);
            self.stats.inbound_received += 1;
            let len = len.min(scratch.len());
            self.dispatch_inbound(header, &scratch[..len]);
        }
    }
}

impl<T: MeshTransport> Lifecycle<()> for RadioLink<T> {
    type State = RadioState;

    fn current(&self) -> RadioState {
        self.state
    }

    fn replace(&mut self, next: RadioState) {
        self.state = next;
    }

    fn on_entry(&mut self, _ctx: &mut ()) -> Step<RadioState> {
        match self.state {
            RadioState::Idle => {},
            RadioState::Running => info!("Radio link running"),
            RadioState::Error => {
                error!("Radio link stopped: {:?}", self.error_cause)
            },
        }
        Step::Stay
    }

    fn on_do(&mut self, _ctx: &mut ()) -> Step<RadioState> {
        if self.state == RadioState::Running {
            self.running_do();
        }
        Step::Stay
    }

    fn on_exit(&mut self, _ctx: &mut ()) {}
}

impl<T: MeshTransport> ChunkSink for RadioLink<T> {
    fn send_chunk(&mut self, chunk: &[u8]) -> Result<(), MulticastError> {
        self.multicast(chunk)
    }
}
