//! # 观测组装
//!
//! 每个推理 tick 计算一帧八通道观测，写入各自的历史缓冲区，
//! 再按固定通道顺序展平为历史窗口。
//!
//! ## 通道顺序
//!
//! | # | 通道 | 宽度 |
//! |---|------|------|
//! | 1 | 机体角速度 × `ang_vel` | 3 |
//! | 2 | 重力投影 | 3 |
//! | 3 | (q − q0) × `dof_pos` | J |
//! | 4 | dq × `dof_vel` | J |
//! | 5 | 上一次动作 | A |
//! | 6 | 速度命令 × `user_cmd_scales` | 3 |
//! | 7 | 步态相位 (sin, cos) | 2 |
//! | 8 | 步态命令 | 3 |
//!
//! 展平按通道优先：先是通道 1 的全部历史（旧 → 新），然后通道 2，依此类推。

use crate::config::{ObsScales, OrientationOffset, RobotConfig, UserCmdScales};
use crate::gait::{GaitCommand, gait_phase};
use crate::history::HistoryBuffer;
use nalgebra::{Rotation3, Vector3};
use pointfoot_protocol::{ImuData, RobotState};

/// 世界坐标系重力方向
fn gravity_world() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, -1.0)
}

/// 单帧观测（八个通道）
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationFrame {
    pub base_ang_vel: [f64; 3],
    pub projected_gravity: [f64; 3],
    pub joint_pos: Vec<f64>,
    pub joint_vel: Vec<f64>,
    pub last_actions: Vec<f64>,
    pub commands: [f64; 3],
    pub gait_phase: [f64; 2],
    pub gait_command: [f64; 3],
}

impl ObservationFrame {
    /// 单帧宽度
    pub fn width(&self) -> usize {
        3 + 3 + self.joint_pos.len() + self.joint_vel.len() + self.last_actions.len() + 3 + 2 + 3
    }
}

/// 展平后的历史窗口
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    /// 未裁剪（policy 输入的前半部分）
    pub raw: Vec<f32>,
    /// 逐元素裁剪到 `[-clip_observations, clip_observations]`（encoder 输入）
    pub clipped: Vec<f32>,
}

/// 姿态 → 机体坐标系下的重力方向
///
/// 四元数先转为欧拉角，再由欧拉角重建旋转矩阵并取逆，作用在 `(0, 0, -1)` 上。
pub fn projected_gravity(imu: &ImuData) -> Vector3<f64> {
    let (roll, pitch, yaw) = imu.orientation().euler_angles();
    let rotation = Rotation3::from_euler_angles(roll, pitch, yaw);
    rotation.inverse() * gravity_world()
}

/// IMU 安装偏置旋转
pub fn offset_rotation(offset: &OrientationOffset) -> Rotation3<f64> {
    Rotation3::from_euler_angles(offset.roll, offset.pitch, offset.yaw)
}

/// 观测组装器
#[derive(Debug, Clone)]
pub struct ObservationAssembler {
    obs_scales: ObsScales,
    cmd_scales: UserCmdScales,
    clip_observations: f64,
    default_joint_angles: Vec<f64>,
    offset: Rotation3<f64>,
    control_hz: f64,
    gait_command: GaitCommand,
    ang_vel: HistoryBuffer<Vec<f64>>,
    gravity: HistoryBuffer<Vec<f64>>,
    joint_pos: HistoryBuffer<Vec<f64>>,
    joint_vel: HistoryBuffer<Vec<f64>>,
    actions: HistoryBuffer<Vec<f64>>,
    commands: HistoryBuffer<Vec<f64>>,
    phase: HistoryBuffer<Vec<f64>>,
    gait: HistoryBuffer<Vec<f64>>,
    step_len: usize,
}

impl ObservationAssembler {
    pub fn new(config: &RobotConfig, default_joint_angles: Vec<f64>) -> Self {
        let history = config.size.observations_history_length;
        Self {
            obs_scales: config.normalization.obs_scales.clone(),
            cmd_scales: config.user_cmd_scales,
            clip_observations: config.normalization.clip_scales.clip_observations,
            default_joint_angles,
            offset: offset_rotation(&config.imu_orientation_offset),
            control_hz: config.loop_frequency,
            gait_command: config.gait.into(),
            ang_vel: HistoryBuffer::new(history),
            gravity: HistoryBuffer::new(history),
            joint_pos: HistoryBuffer::new(history),
            joint_vel: HistoryBuffer::new(history),
            actions: HistoryBuffer::new(history),
            commands: HistoryBuffer::new(history),
            phase: HistoryBuffer::new(history),
            gait: HistoryBuffer::new(history),
            step_len: config.step_observation_len(),
        }
    }

    /// 历史长度
    pub fn history_len(&self) -> usize {
        self.ang_vel.capacity()
    }

    /// 窗口展平后的长度
    pub fn window_len(&self) -> usize {
        self.step_len * self.history_len()
    }

    /// 各通道当前样本数
    pub fn buffer_lens(&self) -> [usize; 8] {
        [
            self.ang_vel.len(),
            self.gravity.len(),
            self.joint_pos.len(),
            self.joint_vel.len(),
            self.actions.len(),
            self.commands.len(),
            self.phase.len(),
            self.gait.len(),
        ]
    }

    /// 计算单帧观测（不写入历史）
    ///
    /// `state` 必须是已按逻辑顺序对齐的关节状态。
    pub fn frame(
        &self,
        state: &RobotState,
        imu: &ImuData,
        commands: &[f64; 3],
        last_actions: &[f64],
        tick: u64,
    ) -> ObservationFrame {
        let scales = &self.obs_scales;

        let gravity = self.offset * projected_gravity(imu);
        let ang_vel = self.offset * imu.angular_velocity() * scales.ang_vel;

        let joint_pos = state
            .q
            .iter()
            .zip(&self.default_joint_angles)
            .map(|(q, q0)| (q - q0) * scales.dof_pos)
            .collect();
        let joint_vel = state.dq.iter().map(|dq| dq * scales.dof_vel).collect();

        ObservationFrame {
            base_ang_vel: ang_vel.into(),
            projected_gravity: gravity.into(),
            joint_pos,
            joint_vel,
            last_actions: last_actions.to_vec(),
            commands: [
                commands[0] * self.cmd_scales.lin_vel_x,
                commands[1] * self.cmd_scales.lin_vel_y,
                commands[2] * self.cmd_scales.ang_vel_yaw,
            ],
            gait_phase: gait_phase(tick, self.control_hz, self.gait_command.frequency),
            gait_command: self.gait_command.as_array(),
        }
    }

    /// 写入一帧并返回展平后的历史窗口
    pub fn push(&mut self, frame: ObservationFrame) -> HistoryWindow {
        self.ang_vel.push_with_prefill(frame.base_ang_vel.to_vec());
        self.gravity.push_with_prefill(frame.projected_gravity.to_vec());
        self.joint_pos.push_with_prefill(frame.joint_pos);
        self.joint_vel.push_with_prefill(frame.joint_vel);
        self.actions.push_with_prefill(frame.last_actions);
        self.commands.push_with_prefill(frame.commands.to_vec());
        self.phase.push_with_prefill(frame.gait_phase.to_vec());
        self.gait.push_with_prefill(frame.gait_command.to_vec());

        self.window()
    }

    /// 计算单帧、写入历史、返回窗口
    pub fn assemble(
        &mut self,
        state: &RobotState,
        imu: &ImuData,
        commands: &[f64; 3],
        last_actions: &[f64],
        tick: u64,
    ) -> HistoryWindow {
        let frame = self.frame(state, imu, commands, last_actions, tick);
        self.push(frame)
    }

    /// 当前历史窗口
    pub fn window(&self) -> HistoryWindow {
        let mut flat = Vec::with_capacity(self.window_len());
        for buffer in [
            &self.ang_vel,
            &self.gravity,
            &self.joint_pos,
            &self.joint_vel,
            &self.actions,
            &self.commands,
            &self.phase,
            &self.gait,
        ] {
            buffer.extend_flat(&mut flat);
        }

        let bound = self.clip_observations;
        let raw: Vec<f32> = flat.iter().map(|&v| v as f32).collect();
        let clipped = flat.iter().map(|&v| v.min(bound).max(-bound) as f32).collect();
        HistoryWindow { raw, clipped }
    }
}
