//! 状态显示通知
//!
//! 显示器是外部的被动观察者：核心只向它发送单向的视图切换通知，
//! 显示内容由显示器自己周期性拉取 [`StationStatus`](crate::StationStatus) 快照。

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::trace;

/// 显示视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayView {
    /// 启动后尚未收到通知
    #[default]
    Idle,
    /// survey-in 进度
    Survey,
    /// 各单元状态码总览
    Overview,
}

/// 视图切换通知（单向，不等待显示器处理）
pub trait DisplayNotifier {
    fn switch_to_survey_view(&mut self);
    fn switch_to_overview_view(&mut self);
}

/// 丢弃所有通知
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplayNotifier;

impl DisplayNotifier for NullDisplayNotifier {
    fn switch_to_survey_view(&mut self) {}
    fn switch_to_overview_view(&mut self) {}
}

/// 通过有界通道把通知送到显示线程
///
/// 使用 `try_send`：通道满或显示线程已退出时通知直接丢弃，不阻塞调度 tick。
#[derive(Debug, Clone)]
pub struct ChannelDisplayNotifier {
    tx: Sender<DisplayView>,
}

impl ChannelDisplayNotifier {
    /// 创建通知端和接收端
    pub fn channel(capacity: usize) -> (Self, Receiver<DisplayView>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    fn notify(&self, view: DisplayView) {
        match self.tx.try_send(view) {
            Ok(()) => {},
            Err(TrySendError::Full(view)) => trace!("display channel full, dropping {:?}", view),
            Err(TrySendError::Disconnected(view)) => {
                trace!("display disconnected, dropping {:?}", view)
            },
        }
    }
}

impl DisplayNotifier for ChannelDisplayNotifier {
    fn switch_to_survey_view(&mut self) {
        self.notify(DisplayView::Survey);
    }

    fn switch_to_overview_view(&mut self) {
        self.notify(DisplayView::Overview);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let (mut notifier, rx) = ChannelDisplayNotifier::channel(4);
        notifier.switch_to_survey_view();
        notifier.switch_to_overview_view();

        assert_eq!(rx.try_recv().unwrap(), DisplayView::Survey);
        assert_eq!(rx.try_recv().unwrap(), DisplayView::Overview);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_notifier_never_blocks() {
        let (mut notifier, rx) = ChannelDisplayNotifier::channel(1);
        notifier.switch_to_survey_view();
        notifier.switch_to_overview_view(); // 通道已满，丢弃
        assert_eq!(rx.len(), 1);

        drop(rx);
        notifier.switch_to_survey_view(); // 接收端已关闭，丢弃
    }
}
