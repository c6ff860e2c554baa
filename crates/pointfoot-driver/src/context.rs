//! 共享传感器上下文
//!
//! 传输层回调写入、控制线程读取。每路数据流独立使用 `ArcSwap`：
//! - 写入：整体替换（`store`），不存在半更新状态
//! - 读取：Wait-Free `load`，控制线程每个 tick 调用一次 [`SensorContext::snapshot`]
//!
//! tick 中途到达的更新对本 tick 不可见，下一 tick 才生效（最多一个 tick 的陈旧度）。

use crate::transport::RobotTransport;
use arc_swap::ArcSwap;
use pointfoot_protocol::{ImuData, RobotState, SensorJoy};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 一个 tick 使用的不可变传感器快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    pub robot_state: RobotState,
    pub imu: ImuData,
    pub joy: SensorJoy,
}

impl SensorSnapshot {
    /// 关节状态全零、IMU 为单位姿态、手柄无输入
    pub fn zeros(joint_num: usize) -> Self {
        Self {
            robot_state: RobotState::zeros(joint_num),
            imu: ImuData::default(),
            joy: SensorJoy::default(),
        }
    }
}

/// 共享传感器上下文
#[derive(Debug)]
pub struct SensorContext {
    /// 关节状态（物理顺序）
    pub robot_state: ArcSwap<RobotState>,
    /// IMU
    pub imu: ArcSwap<ImuData>,
    /// 手柄
    pub joy: ArcSwap<SensorJoy>,
    /// 各路接收计数（调试用）
    state_updates: AtomicU64,
    imu_updates: AtomicU64,
    joy_updates: AtomicU64,
}

impl SensorContext {
    /// 创建上下文，关节状态初始化为 `joint_num` 个零
    pub fn new(joint_num: usize) -> Self {
        Self {
            robot_state: ArcSwap::from_pointee(RobotState::zeros(joint_num)),
            imu: ArcSwap::from_pointee(ImuData::default()),
            joy: ArcSwap::from_pointee(SensorJoy::default()),
            state_updates: AtomicU64::new(0),
            imu_updates: AtomicU64::new(0),
            joy_updates: AtomicU64::new(0),
        }
    }

    /// 更新关节状态
    pub fn store_robot_state(&self, state: RobotState) {
        self.robot_state.store(Arc::new(state));
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// 更新 IMU
    pub fn store_imu(&self, imu: ImuData) {
        self.imu.store(Arc::new(imu));
        self.imu_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// 更新手柄
    pub fn store_joy(&self, joy: SensorJoy) {
        self.joy.store(Arc::new(joy));
        self.joy_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// 取一次快照（值拷贝，不持有任何引用）
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            robot_state: RobotState::clone(&self.robot_state.load()),
            imu: **self.imu.load(),
            joy: SensorJoy::clone(&self.joy.load()),
        }
    }

    /// 各路数据流收到的更新次数 `(state, imu, joy)`
    pub fn update_counts(&self) -> (u64, u64, u64) {
        (
            self.state_updates.load(Ordering::Relaxed),
            self.imu_updates.load(Ordering::Relaxed),
            self.joy_updates.load(Ordering::Relaxed),
        )
    }
}

/// 将传输层的三路订阅接到上下文
pub fn attach<T: RobotTransport + ?Sized>(transport: &mut T, ctx: &Arc<SensorContext>) {
    let state_ctx = ctx.clone();
    transport.subscribe_robot_state(Box::new(move |state| state_ctx.store_robot_state(state)));

    let imu_ctx = ctx.clone();
    transport.subscribe_imu(Box::new(move |imu| imu_ctx.store_imu(imu)));

    let joy_ctx = ctx.clone();
    transport.subscribe_sensor_joy(Box::new(move |joy| joy_ctx.store_joy(joy)));
}
