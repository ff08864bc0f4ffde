//! 运行基站

use super::config::load_config;
use crate::display;
use crate::sim::{SimulatedMesh, SimulatedReceiver};
use anyhow::{Context, Result};
use basestation_core::{ChannelDisplayNotifier, MonotonicClock, Station, run_fixed_rate};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// 显示通知通道容量
const DISPLAY_QUEUE: usize = 8;

/// 运行参数
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// 启动后多久开始 survey-in（毫秒）
    #[arg(long, default_value_t = 0)]
    pub enable_after_ms: u64,

    /// 执行指定 tick 数后退出（默认一直运行）
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// 仿真接收机的倍速
    #[arg(long, default_value_t = 1)]
    pub speedup: u32,

    /// 仿真数据随机种子
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// 仿真射频在第 N 个 chunk 后发送失败
    #[arg(long)]
    pub mesh_fail_after: Option<u64>,

    /// 不启动终端显示
    #[arg(long)]
    pub no_display: bool,
}

impl RunCommand {
    pub fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let mut scheduler = config.scheduler_config();
        scheduler.max_ticks = self.max_ticks;

        let (notifier, views) = ChannelDisplayNotifier::channel(DISPLAY_QUEUE);
        let mut station = Station::new(
            &config,
            SimulatedReceiver::new(self.seed, self.speedup),
            SimulatedMesh::new(self.mesh_fail_after),
            notifier,
            MonotonicClock::new(),
        )
        .context("Invalid station configuration")?;

        let stop = Arc::new(AtomicBool::new(false));
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            handler_stop.store(true, Ordering::Relaxed);
        })
        .context("Failed to set signal handler")?;

        let display = if self.no_display {
            None
        } else {
            Some(display::spawn(station.board(), views, stop.clone()).context("Failed to start display thread")?)
        };

        station.setup();

        let enable_at_tick = self.enable_after_ms / config.scheduler.tick_interval_ms;
        info!(
            "Base station running: tick {} ms, survey-in {} s / {:.2} m, starting at tick {}",
            config.scheduler.tick_interval_ms,
            config.survey.observation_time_s,
            config.survey.required_accuracy_m,
            enable_at_tick
        );

        let report = run_fixed_rate(&scheduler, &stop, |tick| {
            if tick == enable_at_tick {
                station.enable_positioning();
            }
            station.tick();
        });

        stop.store(true, Ordering::Relaxed);
        if let Some(handle) = display
            && handle.join().is_err()
        {
            warn!("Display thread panicked");
        }

        let status = station.status();
        info!(
            "Stopped after {} ticks ({} overruns): {} chunks / {} bytes sent, {} chunks lost",
            report.ticks,
            report.overruns,
            status.link.chunks_sent,
            status.link.bytes_sent,
            status.stream.chunks_lost
        );
        Ok(())
    }
}
