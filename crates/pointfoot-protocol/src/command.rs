//! 关节命令定义
//!
//! 每个关节一条 PD 命令，执行器侧计算
//! `tau_out = kp * (q - q_meas) + kd * (dq - dq_meas) + tau`。

use crate::{ProtocolError, check_len};

/// 关节 PD 模式（执行器固件模式字 0）
pub const MOTOR_MODE_PD: u8 = 0;

/// 单关节命令
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointCommand {
    /// 执行器模式字
    pub mode: u8,
    /// 目标位置（rad）
    pub q: f64,
    /// 目标速度（rad/s）
    pub dq: f64,
    /// 前馈力矩（N·m）
    pub tau: f64,
    /// 刚度
    pub kp: f64,
    /// 阻尼
    pub kd: f64,
}

/// 整机命令（物理顺序）
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotCmd {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 每个执行器的命令
    pub joints: Vec<JointCommand>,
}

impl RobotCmd {
    /// 创建命令：目标位置为 0，所有关节使用相同的增益
    pub fn new(joint_num: usize, kp: f64, kd: f64) -> Self {
        Self {
            stamp_ns: 0,
            joints: vec![
                JointCommand {
                    mode: MOTOR_MODE_PD,
                    kp,
                    kd,
                    ..Default::default()
                };
                joint_num
            ],
        }
    }

    /// 关节数
    pub fn joint_num(&self) -> usize {
        self.joints.len()
    }

    /// 设置某个执行器的目标位置（物理索引）
    pub fn set_position(&mut self, index: usize, q: f64) -> Result<(), ProtocolError> {
        let joint_num = self.joints.len();
        let joint = self
            .joints
            .get_mut(index)
            .ok_or(ProtocolError::JointOutOfRange { index, joint_num })?;
        joint.q = q;
        Ok(())
    }

    /// 目标位置数组（调试 / 录制用）
    pub fn positions(&self) -> Vec<f64> {
        self.joints.iter().map(|j| j.q).collect()
    }

    /// 检查关节数
    pub fn validate(&self, joint_num: usize) -> Result<(), ProtocolError> {
        check_len("joints", joint_num, self.joints.len())
    }
}
