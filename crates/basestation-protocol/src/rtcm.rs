//! RTCM 消息目录与接收机输出配置
//!
//! survey-in 完成后，基站需要在接收机上打开四种 RTCM3 消息，
//! 这些消息经 I2C 端口输出，再由 PositioningUnit 打包发往 mesh 网络。

use crate::ProtocolError;
use bilge::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// RTCM3 帧起始字节
pub const RTCM3_PREAMBLE: u8 = 0xD3;

/// RTCM3 帧头长度（preamble 1 字节 + 长度字段 2 字节）
pub const RTCM3_HEADER_SIZE: usize = 3;

/// RTCM3 帧尾 CRC-24Q 长度
pub const RTCM3_CRC_SIZE: usize = 3;

/// RTCM3 帧载荷最大长度（10 位长度字段）
pub const RTCM3_MAX_PAYLOAD: usize = 1023;

const CRC24Q_POLY: u32 = 0x0186_4CFB;

/// CRC-24Q（RTCM3 帧校验）
pub fn crc24q(data: &[u8]) -> u32 {
    let mut crc: u32 = 0;
    for &byte in data {
        crc ^= (byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24Q_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// 把载荷封装成完整的 RTCM3 帧：preamble + 6 位保留 + 10 位长度 + 载荷 + CRC-24Q
pub fn encode_rtcm3_frame(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > RTCM3_MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            len: payload.len(),
            max: RTCM3_MAX_PAYLOAD,
        });
    }

    let mut frame = Vec::with_capacity(RTCM3_HEADER_SIZE + payload.len() + RTCM3_CRC_SIZE);
    frame.push(RTCM3_PREAMBLE);
    frame.push(((payload.len() >> 8) & 0x03) as u8);
    frame.push((payload.len() & 0xFF) as u8);
    frame.extend_from_slice(payload);

    let crc = crc24q(&frame);
    frame.extend_from_slice(&[(crc >> 16) as u8, (crc >> 8) as u8, crc as u8]);
    Ok(frame)
}

/// 基站需要输出的 RTCM 消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum RtcmMessage {
    /// 基准站天线参考点（ARP）坐标
    StationArp = 1005,
    /// GPS MSM7
    GpsMsm7 = 1077,
    /// GLONASS MSM7
    GlonassMsm7 = 1087,
    /// GLONASS 码相位偏差
    GlonassCodePhaseBias = 1230,
}

impl RtcmMessage {
    /// RTCM 消息编号
    pub fn number(self) -> u16 {
        self.into()
    }

    /// 输出速率（每 N 个导航解输出一次）
    pub fn rate(self) -> u8 {
        match self {
            RtcmMessage::GlonassCodePhaseBias => 10,
            _ => 1,
        }
    }
}

/// survey-in 完成后按顺序开启的消息列表
pub const REQUIRED_RTCM_MESSAGES: [RtcmMessage; 4] = [
    RtcmMessage::StationArp,
    RtcmMessage::GpsMsm7,
    RtcmMessage::GlonassMsm7,
    RtcmMessage::GlonassCodePhaseBias,
];

/// 接收机通信端口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ReceiverPort {
    /// I2C（DDC）端口，基站固件使用该端口读取数据
    #[default]
    I2c = 0,
    Uart1 = 1,
    Uart2 = 2,
    Usb = 3,
    Spi = 4,
}

/// 接收机端口输出协议位域
///
/// - Bit 0: UBX
/// - Bit 1: NMEA
/// - Bit 2: RTCM3
/// - Bit 3-7: 保留
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq)]
pub struct OutputProtocols {
    pub ubx: bool,    // Bit 0
    pub nmea: bool,   // Bit 1
    pub rtcm3: bool,  // Bit 2
    pub reserved: u5, // Bit 3-7: 保留
}

impl OutputProtocols {
    /// 基站使用的输出组合：UBX | NMEA | RTCM3
    pub fn base_station() -> Self {
        let mut flags = OutputProtocols::from(u8::new(0));
        flags.set_ubx(true);
        flags.set_nmea(true);
        flags.set_rtcm3(true);
        flags
    }

    /// 编码为原始字节
    pub fn bits(self) -> u8 {
        u8::from(self).value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_messages_order_and_rates() {
        let numbers: Vec<u16> = REQUIRED_RTCM_MESSAGES.iter().map(|m| m.number()).collect();
        assert_eq!(numbers, vec![1005, 1077, 1087, 1230]);

        let rates: Vec<u8> = REQUIRED_RTCM_MESSAGES.iter().map(|m| m.rate()).collect();
        assert_eq!(rates, vec![1, 1, 1, 10]);
    }

    #[test]
    fn test_rtcm_message_from_number() {
        assert_eq!(RtcmMessage::try_from(1077u16).unwrap(), RtcmMessage::GpsMsm7);
        assert!(RtcmMessage::try_from(1033u16).is_err());
    }

    #[test]
    fn test_output_protocols_bits() {
        // 验证 bilge 的位序（LSB first）
        assert_eq!(OutputProtocols::base_station().bits(), 0b0000_0111);

        let flags = OutputProtocols::from(u8::new(0b0000_0100));
        assert!(!flags.ubx());
        assert!(!flags.nmea());
        assert!(flags.rtcm3());
    }

    #[test]
    fn test_crc24q_known_vector() {
        // 标准校验值："123456789" -> 0xCDE703
        assert_eq!(crc24q(b"123456789"), 0xCDE703);
        assert_eq!(crc24q(&[]), 0);
    }

    #[test]
    fn test_encode_rtcm3_frame_layout() {
        let payload = [0x3E, 0xD0, 0x00, 0x03];
        let frame = encode_rtcm3_frame(&payload).unwrap();

        assert_eq!(frame.len(), RTCM3_HEADER_SIZE + payload.len() + RTCM3_CRC_SIZE);
        assert_eq!(&frame[..3], &[RTCM3_PREAMBLE, 0x00, 0x04]);
        assert_eq!(&frame[3..7], &payload);
        // 含 CRC 的整帧再次校验结果为 0
        assert_eq!(crc24q(&frame), 0);
    }

    #[test]
    fn test_encode_rtcm3_frame_rejects_oversized_payload() {
        let payload = vec![0u8; RTCM3_MAX_PAYLOAD + 1];
        assert!(matches!(
            encode_rtcm3_frame(&payload),
            Err(ProtocolError::PayloadTooLarge { max: RTCM3_MAX_PAYLOAD, .. })
        ));
    }

    #[test]
    fn test_default_port_is_i2c() {
        assert_eq!(ReceiverPort::default(), ReceiverPort::I2c);
        assert_eq!(u8::from(ReceiverPort::Usb), 3);
    }
}
