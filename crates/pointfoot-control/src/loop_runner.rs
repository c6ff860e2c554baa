//! # 控制循环驱动
//!
//! 固定频率调度 [`PointfootController`]，每个 tick：
//!
//! 1. 从 [`SensorContext`] 取一次快照
//! 2. 模式调度 + 计算命令
//! 3. 发布命令
//! 4. 睡眠到下一个绝对时间锚点
//!
//! ## 定时
//!
//! 使用绝对时间锚点 + `spin_sleep` 消除累积漂移。单个 tick 超过周期时
//! 记一次 overrun，锚点重置为当前时间（不做追赶）。
//!
//! ## 失败处理
//!
//! 运行中的任何错误都会结束循环，结束前的动作由 [`FailurePolicy`] 决定。

use crate::config::{ConfigError, RobotConfig};
use crate::controller::{PointfootController, TickOutcome};
use crate::error::ControlError;
use pointfoot_driver::{LoopMetrics, RobotTransport, SensorContext, SensorSnapshot, attach};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// 运行中失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 发布一次阻尼命令（Kp = 0，保持实测位置）后返回错误
    #[default]
    SafeStop,
    /// 立即返回错误
    FailFast,
}

/// 控制循环配置
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,
    /// 最大迭代次数（None 表示一直运行到停止信号）
    pub max_iterations: Option<u64>,
    /// 失败处理策略
    pub failure_policy: FailurePolicy,
}

impl LoopConfig {
    /// 频率取自机器人配置
    pub fn from_robot(config: &RobotConfig) -> Self {
        Self {
            frequency_hz: config.loop_frequency,
            ..Self::default()
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency_hz)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 500.0,
            max_iterations: None,
            failure_policy: FailurePolicy::SafeStop,
        }
    }
}

/// 循环结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// 达到 `max_iterations`
    MaxIterations,
    /// 收到停止信号
    Shutdown,
}

/// 控制循环驱动
pub struct ControlLoopDriver<T: RobotTransport> {
    transport: T,
    controller: PointfootController,
    context: Arc<SensorContext>,
    config: LoopConfig,
    metrics: Arc<LoopMetrics>,
    shutdown: Arc<AtomicBool>,
}

impl<T: RobotTransport> ControlLoopDriver<T> {
    /// 创建驱动并把传输层的三路订阅接到共享上下文
    pub fn new(
        mut transport: T,
        controller: PointfootController,
        config: LoopConfig,
    ) -> Result<Self, ControlError> {
        if !(config.frequency_hz.is_finite() && config.frequency_hz > 0.0) {
            return Err(ConfigError::invalid(
                "loop.frequency_hz",
                format!("must be > 0 (got {})", config.frequency_hz),
            )
            .into());
        }
        if transport.joint_num() != controller.joint_num() {
            return Err(ConfigError::invalid(
                "joint_names",
                format!(
                    "transport has {} actuators, config has {} joints",
                    transport.joint_num(),
                    controller.joint_num()
                ),
            )
            .into());
        }

        let context = Arc::new(SensorContext::new(controller.joint_num()));
        attach(&mut transport, &context);

        Ok(Self {
            transport,
            controller,
            context,
            config,
            metrics: Arc::new(LoopMetrics::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 停止标志（置 true 后循环在下一个 tick 前退出）
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn metrics(&self) -> Arc<LoopMetrics> {
        self.metrics.clone()
    }

    pub fn context(&self) -> &Arc<SensorContext> {
        &self.context
    }

    pub fn controller(&self) -> &PointfootController {
        &self.controller
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 执行单个 tick（不睡眠）
    pub fn step(&mut self) -> Result<TickOutcome, ControlError> {
        let snapshot = self.context.snapshot();
        let start = Instant::now();

        match self.tick_and_publish(&snapshot) {
            Ok(outcome) => {
                let elapsed = start.elapsed();
                self.metrics.record_tick(elapsed);
                if let Some(inference_time) = outcome.inference_time {
                    self.metrics.record_inference(inference_time);
                }
                Ok(outcome)
            },
            Err(e) => {
                self.handle_failure(&snapshot, &e);
                Err(e)
            },
        }
    }

    fn tick_and_publish(&mut self, snapshot: &SensorSnapshot) -> Result<TickOutcome, ControlError> {
        let outcome = self.controller.tick(snapshot)?;
        self.transport.publish_command(self.controller.command())?;
        self.metrics.record_publish();
        Ok(outcome)
    }

    fn handle_failure(&self, snapshot: &SensorSnapshot, err: &ControlError) {
        match self.config.failure_policy {
            FailurePolicy::SafeStop => {
                warn!(
                    tick = self.controller.loop_count(),
                    mode = ?self.controller.mode(),
                    "Control loop failure: {}. Publishing damping-only safe-stop command.",
                    err
                );
                let cmd = self.controller.safe_stop_command(snapshot);
                match self.transport.publish_command(&cmd) {
                    Ok(()) => self.metrics.record_publish(),
                    Err(e) => error!("Failed to publish safe-stop command: {}", e),
                }
            },
            FailurePolicy::FailFast => {
                error!(tick = self.controller.loop_count(), "Control loop failure: {}", err);
            },
        }
    }

    /// 运行控制循环（阻塞）
    pub fn run(&mut self) -> Result<LoopExit, ControlError> {
        #[cfg(feature = "realtime")]
        {
            use thread_priority::*;

            match set_current_thread_priority(ThreadPriority::Max) {
                Ok(_) => info!("Control thread priority set to MAX (realtime)"),
                Err(e) => warn!(
                    "Failed to set control thread priority: {}. \
                     On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                ),
            }
        }

        let period = self.config.period();
        info!(
            frequency_hz = self.config.frequency_hz,
            max_iterations = ?self.config.max_iterations,
            policy = ?self.config.failure_policy,
            "Control loop started"
        );

        let mut iteration: u64 = 0;
        let mut next_tick = Instant::now();

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!(iterations = iteration, "Control loop stopped by shutdown signal");
                return Ok(LoopExit::Shutdown);
            }
            if let Some(max_iter) = self.config.max_iterations
                && iteration >= max_iter
            {
                info!(iterations = iteration, "Control loop reached max iterations");
                return Ok(LoopExit::MaxIterations);
            }

            next_tick += period;
            self.step()?;
            iteration += 1;

            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                self.metrics.record_overrun();
                warn!(
                    "Control loop overrun: tick took {:?} (period {:?}), resetting anchor",
                    now.duration_since(next_tick - period),
                    period
                );
                next_tick = now;
            }
        }
    }
}
