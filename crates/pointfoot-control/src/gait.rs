//! 步态相位

use crate::config::GaitConfig;
use std::f64::consts::TAU;

/// 步态命令 `(frequency, phase_offset, duty_ratio)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitCommand {
    /// 步态频率（Hz）
    pub frequency: f64,
    /// 相位偏移 [0, 1]
    pub phase_offset: f64,
    /// 触地占空比 [0, 1]
    pub duty_ratio: f64,
}

impl GaitCommand {
    pub fn as_array(&self) -> [f64; 3] {
        [self.frequency, self.phase_offset, self.duty_ratio]
    }
}

impl Default for GaitCommand {
    fn default() -> Self {
        GaitConfig::default().into()
    }
}

impl From<GaitConfig> for GaitCommand {
    fn from(cfg: GaitConfig) -> Self {
        Self {
            frequency: cfg.frequency,
            phase_offset: cfg.phase_offset,
            duty_ratio: cfg.duty_ratio,
        }
    }
}

/// 步态相位 `(sin, cos)`
///
/// `x = tick / control_hz * gait_hz`，取小数部分后映射到单位圆。
/// 只依赖 tick 计数，无内部状态。
pub fn gait_phase(tick: u64, control_hz: f64, gait_hz: f64) -> [f64; 2] {
    let x = (tick as f64 / control_hz) * gait_hz;
    let mut frac = x.rem_euclid(1.0);
    // rem_euclid 在极小负数上可能舍入到 1.0
    if frac >= 1.0 {
        frac = 0.0;
    }
    let angle = TAU * frac;
    [angle.sin(), angle.cos()]
}
