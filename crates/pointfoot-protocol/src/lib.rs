//! # Pointfoot Protocol
//!
//! 点足机器人传输层数据类型定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `state`: 反馈数据（关节状态、IMU、手柄）
//! - `command`: 关节命令
//!
//! ## 约定
//!
//! - 关节数组按**物理**（执行器）顺序排列，与传输层一致
//! - 四元数按 `(w, x, y, z)` 存储，与传输层发布顺序一致
//! - 角度单位为弧度，角速度为 rad/s，力矩为 N·m

pub mod command;
pub mod state;

// 重新导出常用类型
pub use command::{JointCommand, MOTOR_MODE_PD, RobotCmd};
pub use state::{ImuData, RobotState, SensorJoy};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 数组长度与关节数不一致
    #[error("Invalid length for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// 关节索引越界
    #[error("Joint index {index} out of range (joint count: {joint_num})")]
    JointOutOfRange { index: usize, joint_num: usize },
}

/// 检查切片长度
pub(crate) fn check_len(
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), ProtocolError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProtocolError::LengthMismatch {
            field,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(check_len("q", 6, 6).is_ok());

        let err = check_len("dq", 6, 5).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::LengthMismatch {
                field: "dq",
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::LengthMismatch {
            field: "tau",
            expected: 6,
            actual: 3,
        };
        assert_eq!(format!("{}", err), "Invalid length for tau: expected 6, got 3");

        let err = ProtocolError::JointOutOfRange {
            index: 7,
            joint_num: 6,
        };
        assert!(format!("{}", err).contains("out of range"));
    }
}
