//! 反馈数据结构定义
//!
//! 由传输层线程写入，控制线程每个 tick 读取一次快照。

use crate::{ProtocolError, check_len};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// 关节状态（物理顺序）
///
/// 更新频率：与传输层发布频率一致（通常 ≥ 500Hz）
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    /// 时间戳（纳秒，传输层时钟）
    pub stamp_ns: u64,
    /// 关节位置（rad）
    pub q: Vec<f64>,
    /// 关节速度（rad/s）
    pub dq: Vec<f64>,
    /// 关节力矩（N·m）
    pub tau: Vec<f64>,
}

impl RobotState {
    /// 创建全零状态
    pub fn zeros(joint_num: usize) -> Self {
        Self {
            stamp_ns: 0,
            q: vec![0.0; joint_num],
            dq: vec![0.0; joint_num],
            tau: vec![0.0; joint_num],
        }
    }

    /// 关节数
    pub fn joint_num(&self) -> usize {
        self.q.len()
    }

    /// 检查三个数组长度是否都等于 `joint_num`
    pub fn validate(&self, joint_num: usize) -> Result<(), ProtocolError> {
        check_len("q", joint_num, self.q.len())?;
        check_len("dq", joint_num, self.dq.len())?;
        check_len("tau", joint_num, self.tau.len())
    }
}

/// IMU 数据
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuData {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 姿态四元数 `(w, x, y, z)`
    pub quat: [f64; 4],
    /// 角速度（rad/s，IMU 坐标系）
    pub gyro: [f64; 3],
    /// 线加速度（m/s²）
    pub acc: [f64; 3],
}

impl Default for ImuData {
    fn default() -> Self {
        Self {
            stamp_ns: 0,
            quat: [1.0, 0.0, 0.0, 0.0],
            gyro: [0.0; 3],
            acc: [0.0; 3],
        }
    }
}

impl ImuData {
    /// 姿态（单位四元数）
    ///
    /// 传输层偶尔会在启动阶段给出全零四元数，此时退化为单位姿态。
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        let [w, x, y, z] = self.quat;
        UnitQuaternion::try_new(Quaternion::new(w, x, y, z), 1e-9)
            .unwrap_or_else(UnitQuaternion::identity)
    }

    /// 角速度向量
    pub fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::from(self.gyro)
    }
}

/// 手柄输入
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorJoy {
    /// 时间戳（纳秒）
    pub stamp_ns: u64,
    /// 摇杆轴 [-1, 1]
    pub axes: Vec<f32>,
    /// 按键
    pub buttons: Vec<i32>,
}

impl SensorJoy {
    /// 读取某个轴，缺失时为 0
    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_robot_state_zeros() {
        let state = RobotState::zeros(6);
        assert_eq!(state.joint_num(), 6);
        assert!(state.validate(6).is_ok());
        assert!(state.validate(5).is_err());
    }

    #[test]
    fn test_robot_state_validate_reports_field() {
        let mut state = RobotState::zeros(6);
        state.tau.pop();
        match state.validate(6) {
            Err(ProtocolError::LengthMismatch { field, actual, .. }) => {
                assert_eq!(field, "tau");
                assert_eq!(actual, 5);
            },
            other => panic!("Expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_imu_default_is_identity() {
        let imu = ImuData::default();
        assert_relative_eq!(imu.orientation().angle(), 0.0);
    }

    #[test]
    fn test_imu_zero_quat_falls_back_to_identity() {
        let imu = ImuData {
            quat: [0.0; 4],
            ..Default::default()
        };
        assert_eq!(imu.orientation(), UnitQuaternion::identity());
    }

    #[test]
    fn test_imu_orientation_is_normalized() {
        let imu = ImuData {
            quat: [2.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        assert_relative_eq!(imu.orientation().into_inner().norm(), 1.0);
    }

    #[test]
    fn test_joy_missing_axis_reads_zero() {
        let joy = SensorJoy {
            axes: vec![0.5, -0.25],
            ..Default::default()
        };
        assert_eq!(joy.axis(0), 0.5);
        assert_eq!(joy.axis(1), -0.25);
        assert_eq!(joy.axis(2), 0.0);
    }
}
