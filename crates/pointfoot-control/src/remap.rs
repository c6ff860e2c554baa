//! 关节重映射
//!
//! 逻辑顺序（策略训练时的关节顺序）与物理顺序（执行器电气顺序）之间的固定置换。
//!
//! 置换表 `physical_index[logical] = physical`：
//! - 入站对齐：`aligned[l] = raw[physical_index[l]]`
//! - 出站写命令：`cmd[physical_index[l]] = target[l]`
//!
//! 表长度之外的索引为恒等映射。

use crate::config::ConfigError;
use pointfoot_protocol::{ProtocolError, RobotCmd, RobotState};

/// 默认置换表（逻辑 1→3, 2→1, 3→4, 4→2）
pub const DEFAULT_PHYSICAL_INDEX: [usize; 5] = [0, 3, 1, 4, 2];

/// 逻辑/物理关节索引置换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointRemapper {
    to_physical: Vec<usize>,
    to_logical: Vec<usize>,
}

impl JointRemapper {
    /// 使用默认置换表
    ///
    /// 默认表要求至少 5 个关节。
    pub fn with_default_table(joint_num: usize) -> Result<Self, ConfigError> {
        if joint_num < DEFAULT_PHYSICAL_INDEX.len() {
            return Err(ConfigError::invalid(
                "joint_remap.physical_index",
                format!(
                    "default table needs at least {} joints (got {})",
                    DEFAULT_PHYSICAL_INDEX.len(),
                    joint_num
                ),
            ));
        }
        Self::from_table(joint_num, &DEFAULT_PHYSICAL_INDEX)
    }

    /// 从置换表构造；`table` 必须是 `0..table.len()` 的一个排列
    pub fn from_table(joint_num: usize, table: &[usize]) -> Result<Self, ConfigError> {
        if table.len() > joint_num {
            return Err(ConfigError::invalid(
                "joint_remap.physical_index",
                format!("table length {} exceeds joint count {}", table.len(), joint_num),
            ));
        }

        let mut to_physical: Vec<usize> = (0..joint_num).collect();
        let mut to_logical: Vec<usize> = (0..joint_num).collect();
        let mut seen = vec![false; table.len()];

        for (logical, &physical) in table.iter().enumerate() {
            if physical >= table.len() || seen[physical] {
                return Err(ConfigError::invalid(
                    "joint_remap.physical_index",
                    format!("{:?} is not a permutation", table),
                ));
            }
            seen[physical] = true;
            to_physical[logical] = physical;
            to_logical[physical] = logical;
        }

        Ok(Self {
            to_physical,
            to_logical,
        })
    }

    /// 恒等映射
    pub fn identity(joint_num: usize) -> Self {
        Self {
            to_physical: (0..joint_num).collect(),
            to_logical: (0..joint_num).collect(),
        }
    }

    pub fn joint_num(&self) -> usize {
        self.to_physical.len()
    }

    /// 逻辑索引 → 物理索引（越界时恒等）
    pub fn to_physical(&self, logical: usize) -> usize {
        self.to_physical.get(logical).copied().unwrap_or(logical)
    }

    /// 物理索引 → 逻辑索引（越界时恒等）
    pub fn to_logical(&self, physical: usize) -> usize {
        self.to_logical.get(physical).copied().unwrap_or(physical)
    }

    /// 入站对齐：物理顺序的关节状态 → 逻辑顺序
    pub fn align_state(&self, raw: &RobotState) -> Result<RobotState, ProtocolError> {
        raw.validate(self.joint_num())?;

        let pick = |values: &[f64]| -> Vec<f64> {
            (0..self.joint_num()).map(|l| values[self.to_physical(l)]).collect()
        };

        Ok(RobotState {
            stamp_ns: raw.stamp_ns,
            q: pick(&raw.q),
            dq: pick(&raw.dq),
            tau: pick(&raw.tau),
        })
    }

    /// 出站写入：逻辑关节 `logical` 的目标位置写到物理槽位
    pub fn write_position(
        &self,
        cmd: &mut RobotCmd,
        logical: usize,
        position: f64,
    ) -> Result<(), ProtocolError> {
        cmd.set_position(self.to_physical(logical), position)
    }

    /// 出站写入整组目标位置（逻辑顺序）
    pub fn write_positions(&self, cmd: &mut RobotCmd, positions: &[f64]) -> Result<(), ProtocolError> {
        for (logical, &position) in positions.iter().enumerate() {
            self.write_position(cmd, logical, position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_state() -> RobotState {
        RobotState {
            stamp_ns: 7,
            q: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            dq: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            tau: vec![-1.0, -2.0, -3.0, -4.0, -5.0, -6.0],
        }
    }

    #[test]
    fn test_inbound_alignment() {
        let remap = JointRemapper::with_default_table(6).unwrap();
        let aligned = remap.align_state(&raw_state()).unwrap();

        assert_eq!(aligned.q, vec![0.1, 0.4, 0.2, 0.5, 0.3, 0.6]);
        assert_eq!(aligned.dq, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(aligned.tau, vec![-1.0, -4.0, -2.0, -5.0, -3.0, -6.0]);
        assert_eq!(aligned.stamp_ns, 7);
    }

    #[test]
    fn test_outbound_table() {
        let remap = JointRemapper::with_default_table(6).unwrap();
        // 出站：逻辑 1→3, 2→1, 3→4, 4→2
        assert_eq!(remap.to_physical(1), 3);
        assert_eq!(remap.to_physical(2), 1);
        assert_eq!(remap.to_physical(3), 4);
        assert_eq!(remap.to_physical(4), 2);
        assert_eq!(remap.to_physical(0), 0);
        assert_eq!(remap.to_physical(5), 5);
        assert_eq!(remap.to_physical(42), 42);
    }

    #[test]
    fn test_write_then_align_is_consistent() {
        let remap = JointRemapper::with_default_table(6).unwrap();
        let mut cmd = RobotCmd::new(6, 30.0, 1.0);
        let targets = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        remap.write_positions(&mut cmd, &targets).unwrap();

        // 出站写入的物理命令，再按入站规则对齐，得到原逻辑目标
        let physical = RobotState {
            stamp_ns: 0,
            q: cmd.positions(),
            dq: vec![0.0; 6],
            tau: vec![0.0; 6],
        };
        assert_eq!(remap.align_state(&physical).unwrap().q, targets.to_vec());
    }

    #[test]
    fn test_default_table_requires_five_joints() {
        assert!(JointRemapper::with_default_table(4).is_err());
        assert!(JointRemapper::with_default_table(5).is_ok());
    }

    #[test]
    fn test_invalid_tables_rejected() {
        assert!(JointRemapper::from_table(6, &[0, 0, 1]).is_err());
        assert!(JointRemapper::from_table(6, &[0, 3]).is_err());
        assert!(JointRemapper::from_table(2, &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_align_rejects_wrong_length() {
        let remap = JointRemapper::with_default_table(6).unwrap();
        let short = RobotState::zeros(5);
        assert!(remap.align_state(&short).is_err());
    }

    #[test]
    fn test_identity() {
        let remap = JointRemapper::identity(3);
        let state = RobotState {
            stamp_ns: 0,
            q: vec![1.0, 2.0, 3.0],
            dq: vec![0.0; 3],
            tau: vec![0.0; 3],
        };
        assert_eq!(remap.align_state(&state).unwrap().q, vec![1.0, 2.0, 3.0]);
    }
}
