//! RTCM 字节缓冲与 flush 策略
//!
//! 固定容量缓冲区，双触发 flush：
//! - **写满**：第 C 个字节写入后 [`BufferedStreamer::append`] 返回 `CapacityReached`
//! - **超时**：首字节写入后超过 `flush_after_ms` 仍未写满，
//!   [`BufferedStreamer::should_timeout_flush`] 返回 true
//!
//! 本模块只做决策，不负责发送；发送和清空由持有者（PositioningUnit）完成。
//! 首字节时间戳在长度从 0 变为 1 时记录一次，长度归零时失效。

use basestation_protocol::{RTCM_BUFFER_SIZE, RTCM_FLUSH_AFTER_MS};
use tracing::warn;

/// `append()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// 继续累积
    None,
    /// 缓冲区已满，调用方必须立即 flush
    CapacityReached,
}

/// 固定容量的 RTCM 缓冲区
#[derive(Debug, Clone)]
pub struct BufferedStreamer<const C: usize = RTCM_BUFFER_SIZE> {
    buffer: [u8; C],
    len: usize,
    /// 本轮填充首字节的时间（毫秒），`len == 0` 时为 None
    first_byte_at_ms: Option<u64>,
    flush_after_ms: u64,
    /// 缓冲区已满时被拒绝的字节数
    rejected: u64,
}

impl<const C: usize> BufferedStreamer<C> {
    /// 创建缓冲区
    ///
    /// # 参数
    ///
    /// - `flush_after_ms`: 首字节写入后的超时 flush 阈值
    pub fn new(flush_after_ms: u64) -> Self {
        Self {
            buffer: [0u8; C],
            len: 0,
            first_byte_at_ms: None,
            flush_after_ms,
            rejected: 0,
        }
    }

    /// 缓冲区容量
    pub const fn capacity(&self) -> usize {
        C
    }

    /// 当前长度
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == C
    }

    /// 本轮首字节时间
    pub fn first_byte_at_ms(&self) -> Option<u64> {
        self.first_byte_at_ms
    }

    /// 超时阈值
    pub fn flush_after_ms(&self) -> u64 {
        self.flush_after_ms
    }

    /// 因缓冲区已满而被拒绝的字节总数
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// 已累积的数据
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// 追加一个字节
    ///
    /// 长度从 0 变为 1 时记录 `now_ms` 作为首字节时间。
    /// 写入后若长度达到容量，返回 `CapacityReached`。
    ///
    /// 缓冲区已满时该字节被拒绝（不会覆盖已有数据），同样返回 `CapacityReached`。
    /// 持有者在写满时立即 flush，因此正常流程不会走到这里。
    pub fn append(&mut self, byte: u8, now_ms: u64) -> FlushDecision {
        if self.len == C {
            self.rejected += 1;
            warn!("RTCM buffer full ({} bytes), byte rejected", C);
            return FlushDecision::CapacityReached;
        }

        if self.len == 0 {
            self.first_byte_at_ms = Some(now_ms);
        }

        self.buffer[self.len] = byte;
        self.len += 1;

        if self.len == C {
            FlushDecision::CapacityReached
        } else {
            FlushDecision::None
        }
    }

    /// 是否应该因超时而 flush
    ///
    /// 仅当缓冲区非空且 `now_ms - 首字节时间` 严格大于阈值时为 true。
    pub fn should_timeout_flush(&self, now_ms: u64) -> bool {
        match self.first_byte_at_ms {
            Some(first) if self.len > 0 => now_ms.saturating_sub(first) > self.flush_after_ms,
            _ => false,
        }
    }

    /// 清空缓冲区，开始新一轮填充
    pub fn clear(&mut self) {
        self.len = 0;
        self.first_byte_at_ms = None;
    }
}

impl Default for BufferedStreamer<RTCM_BUFFER_SIZE> {
    fn default() -> Self {
        Self::new(RTCM_FLUSH_AFTER_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_byte_timestamp_set_once() {
        let mut streamer = BufferedStreamer::<8>::new(100);
        assert_eq!(streamer.first_byte_at_ms(), None);

        assert_eq!(streamer.append(0xD3, 1_000), FlushDecision::None);
        assert_eq!(streamer.append(0x00, 1_050), FlushDecision::None);
        assert_eq!(streamer.first_byte_at_ms(), Some(1_000));

        streamer.clear();
        assert_eq!(streamer.first_byte_at_ms(), None);
        assert!(streamer.is_empty());

        streamer.append(0x13, 2_000);
        assert_eq!(streamer.first_byte_at_ms(), Some(2_000));
    }

    #[test]
    fn test_capacity_reached_on_last_byte() {
        let mut streamer = BufferedStreamer::<4>::new(100);
        for i in 0..3 {
            assert_eq!(streamer.append(i, 0), FlushDecision::None);
        }
        assert_eq!(streamer.append(3, 0), FlushDecision::CapacityReached);
        assert!(streamer.is_full());
        assert_eq!(streamer.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_append_when_full_rejects_byte() {
        let mut streamer = BufferedStreamer::<2>::new(100);
        streamer.append(1, 0);
        streamer.append(2, 0);

        assert_eq!(streamer.append(3, 0), FlushDecision::CapacityReached);
        assert_eq!(streamer.as_slice(), &[1, 2]);
        assert_eq!(streamer.rejected(), 1);
    }

    #[test]
    fn test_timeout_is_strictly_greater() {
        let mut streamer = BufferedStreamer::<8>::new(100);
        assert!(!streamer.should_timeout_flush(10_000)); // 空缓冲区从不超时

        streamer.append(0xAA, 500);
        assert!(!streamer.should_timeout_flush(500));
        assert!(!streamer.should_timeout_flush(600));
        assert!(streamer.should_timeout_flush(601));
    }

    #[test]
    fn test_timeout_tolerates_clock_behind_first_byte() {
        let mut streamer = BufferedStreamer::<8>::new(100);
        streamer.append(0xAA, 500);
        assert!(!streamer.should_timeout_flush(0));
    }

    #[test]
    fn test_default_uses_build_constants() {
        let streamer = BufferedStreamer::default();
        assert_eq!(streamer.capacity(), RTCM_BUFFER_SIZE);
        assert_eq!(streamer.flush_after_ms(), RTCM_FLUSH_AFTER_MS);
    }

    proptest! {
        /// 少于容量的字节不会触发写满
        #[test]
        fn prop_below_capacity_never_flushes(bytes in proptest::collection::vec(any::<u8>(), 0..128usize)) {
            let mut streamer = BufferedStreamer::<128>::new(100);
            for &b in &bytes {
                prop_assert_eq!(streamer.append(b, 0), FlushDecision::None);
            }
            prop_assert_eq!(streamer.len(), bytes.len());
            prop_assert_eq!(streamer.as_slice(), bytes.as_slice());
        }

        /// 恰好 C 字节：只有最后一个字节触发写满，清空后长度归零
        #[test]
        fn prop_exactly_capacity_flushes_once(
            bytes in proptest::collection::vec(any::<u8>(), 128),
            start in 0u64..1_000_000,
            offsets in proptest::collection::vec(0u64..100, 128),
        ) {
            let mut streamer = BufferedStreamer::<128>::new(100);
            let mut flushes = 0;
            for (i, (&b, &off)) in bytes.iter().zip(&offsets).enumerate() {
                let decision = streamer.append(b, start + off);
                if decision == FlushDecision::CapacityReached {
                    flushes += 1;
                    prop_assert_eq!(i, 127);
                }
            }
            prop_assert_eq!(flushes, 1);
            prop_assert_eq!(streamer.as_slice(), bytes.as_slice());

            streamer.clear();
            prop_assert_eq!(streamer.len(), 0);
            prop_assert_eq!(streamer.first_byte_at_ms(), None);
            prop_assert!(!streamer.should_timeout_flush(start + 1_000));
        }

        /// 超时判定只取决于首字节时间
        #[test]
        fn prop_timeout_depends_on_first_byte(
            first in 0u64..1_000_000,
            later_offsets in proptest::collection::vec(0u64..50, 1..20),
            elapsed in 0u64..1_000,
        ) {
            let mut streamer = BufferedStreamer::<128>::new(100);
            streamer.append(0, first);
            let mut t = first;
            for off in later_offsets {
                t += off;
                streamer.append(1, t);
            }
            prop_assert_eq!(streamer.first_byte_at_ms(), Some(first));
            prop_assert_eq!(streamer.should_timeout_flush(first + elapsed), elapsed > 100);
        }
    }
}
