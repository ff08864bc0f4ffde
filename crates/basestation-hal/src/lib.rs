//! # Basestation HAL
//!
//! 外设能力抽象层：GNSS 接收机与 mesh 射频网络。
//!
//! 核心状态机只通过这里定义的 trait 访问外设，
//! 二进制协议解析（UBX）、射频调制和包级重传都由具体驱动负责。

use basestation_protocol::{NetworkHeader, OutputProtocols, ProtocolError, ReceiverPort, RtcmMessage};
use thiserror::Error;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{GnssCall, MockGnssReceiver, MockMeshTransport, SentFrame};

/// GNSS 接收机错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GnssError {
    /// 接收机在超时时间内没有应答
    #[error("{operation}: receiver did not respond")]
    Timeout { operation: &'static str },

    /// 接收机拒绝了配置（NAK）
    #[error("{operation}: rejected by receiver")]
    Rejected { operation: &'static str },

    /// 总线错误（I2C/UART）
    #[error("{operation}: bus error: {message}")]
    Bus {
        operation: &'static str,
        message: String,
    },
}

/// Mesh 射频错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// 射频芯片未应答（通常是接线或供电问题）
    #[error("Radio not responding")]
    RadioNotResponding,

    /// 发送失败（包级重传已用尽）
    #[error("Send failed ({len} bytes)")]
    SendFailed { len: usize },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// RTCM 字节接收回调
///
/// 接收机驱动在 [`GnssReceiver::poll`] 内部每解析出一个 RTCM 字节就调用一次。
/// 闭包 `FnMut(u8)` 自动实现该 trait。
pub trait CorrectionSink {
    fn process_byte(&mut self, byte: u8);
}

impl<F> CorrectionSink for F
where
    F: FnMut(u8),
{
    fn process_byte(&mut self, byte: u8) {
        self(byte)
    }
}

/// GNSS 接收机能力接口
///
/// survey-in 进度（已观测时间、平均精度）只是接收机上报的参考值，
/// 驱动无法判断其有效性，调用方应原样接受。
pub trait GnssReceiver {
    /// 初始化驱动并确认接收机在线
    fn begin(&mut self) -> Result<(), GnssError>;

    /// 配置 I2C 端口的输出协议
    fn set_output_protocols(&mut self, protocols: OutputProtocols) -> Result<(), GnssError>;

    /// 请求一次 survey-in 状态（结果缓存在驱动内部）
    fn request_survey_status(&mut self) -> Result<(), GnssError>;

    /// 最近一次状态中 survey-in 是否正在进行
    fn survey_active(&self) -> bool;

    /// survey-in 结果是否已有效
    fn survey_valid(&mut self) -> bool;

    /// 以给定的观测时间和精度启动 survey-in
    fn enable_survey_mode(
        &mut self,
        observation_time_s: u16,
        required_accuracy_m: f32,
    ) -> Result<(), GnssError>;

    /// 在指定端口上开启一种 RTCM 消息
    fn enable_correction_message(
        &mut self,
        message: RtcmMessage,
        port: ReceiverPort,
        rate: u8,
    ) -> Result<(), GnssError>;

    /// 已观测时间（秒）
    fn survey_observation_time(&self) -> u16;

    /// 平均精度（米）
    fn survey_mean_accuracy(&self) -> f32;

    /// 处理接收机内部协议状态
    ///
    /// 可能同步调用 `sink.process_byte()` 零次或多次。
    fn poll(&mut self, sink: &mut dyn CorrectionSink);
}

/// Mesh 网络能力接口
pub trait MeshTransport {
    /// 初始化射频芯片
    fn begin(&mut self) -> Result<(), MeshError>;

    /// 开启/关闭组播转发
    fn set_relay(&mut self, enabled: bool);

    /// 设置组播层级
    fn set_multicast_level(&mut self, level: u8);

    /// 以固定信道和节点地址启动网络层
    fn begin_network(&mut self, channel: u8, node_address: u16);

    /// 驱动网络层内部更新（收包、转发）
    fn update(&mut self);

    /// 是否有待读取的入站消息
    fn available(&mut self) -> bool;

    /// 读取一条入站消息到 `buf`，返回帧头和实际写入的字节数
    fn read(&mut self, buf: &mut [u8]) -> (NetworkHeader, usize);

    /// 组播一帧
    fn multicast(&mut self, header: &NetworkHeader, payload: &[u8]) -> Result<(), MeshError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_as_correction_sink() {
        let mut received = Vec::new();
        {
            let mut sink = |byte: u8| received.push(byte);
            let sink: &mut dyn CorrectionSink = &mut sink;
            sink.process_byte(0xD3);
            sink.process_byte(0x00);
        }
        assert_eq!(received, vec![0xD3, 0x00]);
    }

    #[test]
    fn test_error_display() {
        let err = GnssError::Timeout {
            operation: "request_survey_status",
        };
        assert_eq!(
            format!("{}", err),
            "request_survey_status: receiver did not respond"
        );

        let err = MeshError::SendFailed { len: 128 };
        assert_eq!(format!("{}", err), "Send failed (128 bytes)");

        let err: MeshError = ProtocolError::PayloadTooLarge { len: 200, max: 144 }.into();
        assert!(matches!(err, MeshError::Protocol(_)));
    }
}
