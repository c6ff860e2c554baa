//! # 动作安全限幅
//!
//! 两级限幅：
//! 1. 对称裁剪到 `[-clip_actions, clip_actions]`（仅推理 tick）
//! 2. 力矩包络限幅（每个 tick，依赖实时 q / dq）
//!
//! 第二级保证 PD 律 `kp·(q_des − q) − kd·dq` 的力矩幅值不超过 `user_torque_limit`：
//!
//! ```text
//! lower = (q − q0 + (kd·dq − τmax) / kp) / scale
//! upper = (q − q0 + (kd·dq + τmax) / kp) / scale
//! q_des = a · scale + q0
//! ```

use crate::config::RobotConfig;
use pointfoot_protocol::RobotState;

/// 动作安全限幅器
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSafetyClamp {
    stiffness: f64,
    damping: f64,
    user_torque_limit: f64,
    action_scale_pos: f64,
    clip_actions: f64,
    /// 中立姿态 q0（逻辑顺序）
    default_joint_angles: Vec<f64>,
}

impl ActionSafetyClamp {
    pub fn new(config: &RobotConfig, default_joint_angles: Vec<f64>) -> Self {
        Self {
            stiffness: config.control.stiffness,
            damping: config.control.damping,
            user_torque_limit: config.control.user_torque_limit,
            action_scale_pos: config.control.action_scale_pos,
            clip_actions: config.normalization.clip_scales.clip_actions,
            default_joint_angles,
        }
    }

    /// 以显式参数构造
    pub fn with_gains(
        stiffness: f64,
        damping: f64,
        user_torque_limit: f64,
        action_scale_pos: f64,
        clip_actions: f64,
        default_joint_angles: Vec<f64>,
    ) -> Self {
        Self {
            stiffness,
            damping,
            user_torque_limit,
            action_scale_pos,
            clip_actions,
            default_joint_angles,
        }
    }

    pub fn joint_num(&self) -> usize {
        self.default_joint_angles.len()
    }

    /// 对称裁剪
    pub fn symmetric_clip(&self, actions: &mut [f64]) {
        let bound = self.clip_actions;
        for a in actions.iter_mut() {
            *a = a.min(bound).max(-bound);
        }
    }

    /// 关节 `joint` 在当前状态下的动作上下界
    pub fn bounds(&self, joint: usize, q: f64, dq: f64) -> (f64, f64) {
        let q0 = self.neutral(joint);
        let lower = (q - q0 + (self.damping * dq - self.user_torque_limit) / self.stiffness)
            / self.action_scale_pos;
        let upper = (q - q0 + (self.damping * dq + self.user_torque_limit) / self.stiffness)
            / self.action_scale_pos;
        (lower, upper)
    }

    /// 单关节力矩包络限幅
    pub fn clamp_joint(&self, joint: usize, action: f64, q: f64, dq: f64) -> f64 {
        let (lower, upper) = self.bounds(joint, q, dq);
        action.min(upper).max(lower)
    }

    /// 对全部关节原地限幅（`state` 为逻辑顺序）
    pub fn clamp(&self, actions: &mut [f64], state: &RobotState) {
        for (joint, a) in actions.iter_mut().enumerate() {
            let q = state.q.get(joint).copied().unwrap_or_default();
            let dq = state.dq.get(joint).copied().unwrap_or_default();
            *a = self.clamp_joint(joint, *a, q, dq);
        }
    }

    /// 动作 → 目标关节位置
    pub fn target_position(&self, joint: usize, action: f64) -> f64 {
        action * self.action_scale_pos + self.neutral(joint)
    }

    /// 以目标位置、零目标速度计算 PD 力矩
    pub fn pd_torque(&self, joint: usize, action: f64, q: f64, dq: f64) -> f64 {
        self.stiffness * (self.target_position(joint, action) - q) - self.damping * dq
    }

    pub fn user_torque_limit(&self) -> f64 {
        self.user_torque_limit
    }

    fn neutral(&self, joint: usize) -> f64 {
        self.default_joint_angles.get(joint).copied().unwrap_or_default()
    }
}
