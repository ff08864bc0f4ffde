//! 终端状态显示
//!
//! 模拟基站上的两行字符屏：
//! - Idle：启动画面
//! - Survey：`Enabling!` / `E:<精度> T:<秒>`
//! - Overview：`COM|GPS` / `<radio 状态><radio 错误>|<gps 状态><gps 错误>`
//!
//! 内容不变时不重绘，两次重绘之间至少间隔 [`DISPLAY_REFRESH_MS`]。

use basestation_core::{DisplayView, StationStatus, StatusBoard};
use basestation_protocol::DISPLAY_REFRESH_MS;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 精度显示上限（米）
const MAX_SHOWN_ACCURACY_M: f32 = 999.9;

/// 观测时间显示上限（秒）
const MAX_SHOWN_TIME_S: u32 = 99_999;

/// 两行文本
pub type Lines = [String; 2];

/// 渲染指定视图
pub fn render(view: DisplayView, status: &StationStatus) -> Lines {
    match view {
        DisplayView::Idle => ["Droid base".to_string(), "Idle".to_string()],
        DisplayView::Survey => {
            let accuracy = status.survey.mean_accuracy_m.min(MAX_SHOWN_ACCURACY_M);
            let elapsed = (status.survey.elapsed_observation_time_s as u32).min(MAX_SHOWN_TIME_S);
            ["Enabling!".to_string(), format!("E:{:.2} T:{}", accuracy, elapsed)]
        },
        DisplayView::Overview => [
            "COM|GPS".to_string(),
            format!(
                "{:01}{:02}|{:01}{:02}",
                status.radio.state_code,
                status.radio.error_code,
                status.positioning.state_code,
                status.positioning.error_code
            ),
        ],
    }
}

/// 带去重的显示状态
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    view: DisplayView,
    shown: Option<Lines>,
    last_draw: Option<Instant>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换视图（下次刷新时立即重绘）
    pub fn switch_to(&mut self, view: DisplayView) {
        if self.view != view {
            self.view = view;
            self.last_draw = None;
        }
    }

    /// 计算需要绘制的内容；内容未变或未到刷新间隔时返回 None
    pub fn refresh(&mut self, status: &StationStatus, now: Instant) -> Option<Lines> {
        let interval = Duration::from_millis(DISPLAY_REFRESH_MS);
        if let Some(last) = self.last_draw
            && now.duration_since(last) < interval
        {
            return None;
        }

        let lines = render(self.view, status);
        if self.shown.as_ref() == Some(&lines) {
            return None;
        }

        self.shown = Some(lines.clone());
        self.last_draw = Some(now);
        Some(lines)
    }
}

/// 启动显示线程
///
/// 线程在 `stop` 置位或通知通道关闭后退出。
pub fn spawn(
    board: StatusBoard,
    views: Receiver<DisplayView>,
    stop: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("basestation-display".into())
        .spawn(move || {
            let mut display = TerminalDisplay::new();
            let poll = Duration::from_millis(DISPLAY_REFRESH_MS);

            while !stop.load(Ordering::Relaxed) {
                match views.recv_timeout(poll) {
                    Ok(view) => display.switch_to(view),
                    Err(RecvTimeoutError::Timeout) => {},
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                if let Some([top, bottom]) = display.refresh(&board.snapshot(), Instant::now()) {
                    println!("┌────────────────┐");
                    println!("│{:<16}│", top);
                    println!("│{:<16}│", bottom);
                    println!("└────────────────┘");
                }
            }
        })
}
