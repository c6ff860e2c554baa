//! 站立 / 行走模式状态机
//!
//! STAND 为初始状态，WALK 为终态，不存在 WALK → STAND 的转移。

use tracing::info;

/// 控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 从零位插值到默认站姿
    #[default]
    Stand,
    /// 策略控制
    Walk,
}

impl Mode {
    pub fn is_walk(self) -> bool {
        self == Self::Walk
    }
}

/// 单个 tick 的调度结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeStep {
    /// 站立插值，`percent ∈ (0, 1)`
    Stand { percent: f64 },
    /// 本 tick 只切换模式，不做其它动作
    EnterWalk,
    /// 行走
    Walk,
}

/// 模式状态机
///
/// 站立进度用整数 tick 计数表示，`percent = stand_ticks / (duration · frequency)`，
/// 避免逐 tick 浮点累加带来的漂移。
#[derive(Debug, Clone, PartialEq)]
pub struct ModeStateMachine {
    mode: Mode,
    /// 已进入的站立 tick 数（从 1 开始计）
    stand_ticks: u64,
    /// 站立阶段总 tick 数 `duration · frequency`
    stand_total: f64,
}

impl ModeStateMachine {
    pub fn new(stand_duration: f64, loop_frequency: f64) -> Self {
        Self::with_total_ticks(stand_duration * loop_frequency)
    }

    /// 以站立阶段总 tick 数构造
    pub fn with_total_ticks(stand_total: f64) -> Self {
        Self {
            mode: Mode::Stand,
            stand_ticks: 1,
            stand_total,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// 当前站立进度
    pub fn stand_percent(&self) -> f64 {
        if self.stand_total <= 0.0 {
            return 1.0;
        }
        self.stand_ticks as f64 / self.stand_total
    }

    /// 推进一个 tick
    pub fn step(&mut self) -> ModeStep {
        match self.mode {
            Mode::Stand => {
                let percent = self.stand_percent();
                if percent >= 1.0 {
                    self.mode = Mode::Walk;
                    info!(stand_ticks = self.stand_ticks, "Stand complete, entering WALK");
                    ModeStep::EnterWalk
                } else {
                    self.stand_ticks += 1;
                    ModeStep::Stand { percent }
                }
            },
            Mode::Walk => ModeStep::Walk,
        }
    }
}

/// 站立插值：`start · (1 − p) + target · p`
pub fn interpolate_stand(start: &[f64], target: &[f64], percent: f64) -> Vec<f64> {
    start
        .iter()
        .zip(target)
        .map(|(s, t)| s * (1.0 - percent) + t * percent)
        .collect()
}
