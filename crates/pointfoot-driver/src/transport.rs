//! 传输层抽象
//!
//! 控制核心只消费传输层，不实现它：连接、订阅三路反馈流、发布关节命令。
//!
//! # 线程模型
//!
//! 回调在传输层自己的线程上执行，必须尽快返回（只做拷贝 + 原子替换），
//! 不允许在回调里做推理或阻塞 IO。

use crate::error::DriverError;
use pointfoot_protocol::{ImuData, RobotCmd, RobotState, SensorJoy};

/// 默认机器人地址
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// 关节状态回调
pub type RobotStateCallback = Box<dyn Fn(RobotState) + Send + Sync + 'static>;

/// IMU 回调
pub type ImuCallback = Box<dyn Fn(ImuData) + Send + Sync + 'static>;

/// 手柄回调
pub type SensorJoyCallback = Box<dyn Fn(SensorJoy) + Send + Sync + 'static>;

/// 机器人传输层会话
///
/// 实现者负责网络/总线细节；控制核心只通过本 trait 交互。
pub trait RobotTransport: Send {
    /// 订阅关节状态
    fn subscribe_robot_state(&mut self, callback: RobotStateCallback);

    /// 订阅 IMU 数据
    ///
    /// 四元数必须以 `(w, x, y, z)` 顺序交付。
    fn subscribe_imu(&mut self, callback: ImuCallback);

    /// 订阅手柄输入
    fn subscribe_sensor_joy(&mut self, callback: SensorJoyCallback);

    /// 发布整机命令（物理顺序）
    fn publish_command(&self, cmd: &RobotCmd) -> Result<(), DriverError>;

    /// 执行器数量
    fn joint_num(&self) -> usize;
}

/// 订阅者集合
///
/// 传输实现用它保存回调并在收到数据时分发。通常包在
/// `Arc<parking_lot::RwLock<SubscriberSet>>` 中，订阅走写锁，分发走读锁。
#[derive(Default)]
pub struct SubscriberSet {
    robot_state: Vec<RobotStateCallback>,
    imu: Vec<ImuCallback>,
    sensor_joy: Vec<SensorJoyCallback>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_robot_state(&mut self, callback: RobotStateCallback) {
        self.robot_state.push(callback);
    }

    pub fn add_imu(&mut self, callback: ImuCallback) {
        self.imu.push(callback);
    }

    pub fn add_sensor_joy(&mut self, callback: SensorJoyCallback) {
        self.sensor_joy.push(callback);
    }

    /// 分发关节状态（每个订阅者一份拷贝）
    pub fn dispatch_robot_state(&self, state: &RobotState) {
        for callback in &self.robot_state {
            callback(state.clone());
        }
    }

    /// 分发 IMU 数据
    pub fn dispatch_imu(&self, imu: &ImuData) {
        for callback in &self.imu {
            callback(*imu);
        }
    }

    /// 分发手柄输入
    pub fn dispatch_sensor_joy(&self, joy: &SensorJoy) {
        for callback in &self.sensor_joy {
            callback(joy.clone());
        }
    }

    /// 订阅者数量 `(state, imu, joy)`
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.robot_state.len(), self.imu.len(), self.sensor_joy.len())
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (state, imu, joy) = self.counts();
        f.debug_struct("SubscriberSet")
            .field("robot_state", &state)
            .field("imu", &imu)
            .field("sensor_joy", &joy)
            .finish()
    }
}

/// 连接配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// 机器人地址
    pub address: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

impl ConnectionConfig {
    /// 使用指定地址；`None` 时回退到默认地址
    pub fn with_address(address: Option<String>) -> Self {
        Self {
            address: address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
        }
    }
}
