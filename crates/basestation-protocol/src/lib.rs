//! # Basestation Protocol
//!
//! RTK 基站的线路层定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 构建期常量（缓冲区容量、flush 超时、射频参数等）
//! - `rtcm`: RTCM 消息目录、接收机端口与输出协议位域
//!
//! ## 线路格式
//!
//! mesh 帧由 `NetworkHeader { 目标地址, 消息类型 }` 和一段变长载荷组成。
//! 当前只定义了一种消息：`CorrectionChunk`，载荷为原始 RTCM 字节，
//! 长度不超过 [`MAX_CHUNK_SIZE`]。

pub mod constants;
pub mod rtcm;

pub use constants::*;
pub use rtcm::*;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Mesh 消息类型
///
/// 入站方向目前没有定义任何需要处理的消息类型，
/// 未识别的类型由 RadioLink 直接丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PacketType {
    /// 一批 RTCM 修正数据
    CorrectionChunk = 0,
}

/// Mesh 网络帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkHeader {
    /// 目标节点地址（组播时为组播地址）
    pub to_node: u16,
    /// 消息类型标签（原始值）
    pub message_type: u8,
}

impl NetworkHeader {
    /// 创建指向指定节点的帧头
    pub fn new(to_node: u16, packet_type: PacketType) -> Self {
        Self {
            to_node,
            message_type: packet_type.into(),
        }
    }

    /// 创建组播帧头
    pub fn multicast(packet_type: PacketType) -> Self {
        Self::new(MULTICAST_ADDRESS, packet_type)
    }

    /// 解析消息类型
    pub fn packet_type(&self) -> Result<PacketType, ProtocolError> {
        PacketType::try_from(self.message_type).map_err(|_| ProtocolError::UnknownPacketType {
            tag: self.message_type,
        })
    }

    /// 是否为组播帧
    pub fn is_multicast(&self) -> bool {
        self.to_node == MULTICAST_ADDRESS
    }
}

/// 协议错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown packet type: {tag}")]
    UnknownPacketType { tag: u8 },

    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
}

/// 检查载荷长度是否能放进一个 mesh 帧
pub fn check_payload_len(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_CHUNK_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            len,
            max: MAX_CHUNK_SIZE,
        });
    }
    Ok(())
}
