//! 可编程 Mock 传输层（测试用）
//!
//! 测试代码通过 [`MockHandle`] 注入反馈数据、读取发布的命令、模拟发布失败。

use crate::error::DriverError;
use crate::transport::{
    ImuCallback, RobotStateCallback, RobotTransport, SensorJoyCallback, SubscriberSet,
};
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::RwLock;
use pointfoot_protocol::{ImuData, RobotCmd, RobotState, SensorJoy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mock 传输层
pub struct MockTransport {
    subscribers: Arc<RwLock<SubscriberSet>>,
    published_tx: Sender<RobotCmd>,
    fail_publish: Arc<AtomicBool>,
    joint_num: usize,
    handle: MockHandle,
}

/// 测试侧句柄（可克隆、可跨线程）
#[derive(Clone)]
pub struct MockHandle {
    subscribers: Arc<RwLock<SubscriberSet>>,
    published_rx: Receiver<RobotCmd>,
    fail_publish: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(joint_num: usize) -> Self {
        let subscribers = Arc::new(RwLock::new(SubscriberSet::new()));
        let (published_tx, published_rx) = unbounded();
        let fail_publish = Arc::new(AtomicBool::new(false));
        let handle = MockHandle {
            subscribers: subscribers.clone(),
            published_rx,
            fail_publish: fail_publish.clone(),
        };
        Self {
            subscribers,
            published_tx,
            fail_publish,
            joint_num,
            handle,
        }
    }

    /// 获取测试句柄
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl MockHandle {
    /// 模拟传输层推送关节状态
    pub fn push_robot_state(&self, state: RobotState) {
        self.subscribers.read().dispatch_robot_state(&state);
    }

    /// 模拟传输层推送 IMU
    pub fn push_imu(&self, imu: ImuData) {
        self.subscribers.read().dispatch_imu(&imu);
    }

    /// 模拟传输层推送手柄
    pub fn push_sensor_joy(&self, joy: SensorJoy) {
        self.subscribers.read().dispatch_sensor_joy(&joy);
    }

    /// 已发布命令的接收端
    pub fn published(&self) -> &Receiver<RobotCmd> {
        &self.published_rx
    }

    /// 取出目前为止发布的所有命令
    pub fn drain_published(&self) -> Vec<RobotCmd> {
        self.published_rx.try_iter().collect()
    }

    /// 之后的 `publish_command` 全部失败
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::Relaxed);
    }

    /// 订阅者数量 `(state, imu, joy)`
    pub fn subscriber_counts(&self) -> (usize, usize, usize) {
        self.subscribers.read().counts()
    }
}

impl RobotTransport for MockTransport {
    fn subscribe_robot_state(&mut self, callback: RobotStateCallback) {
        self.subscribers.write().add_robot_state(callback);
    }

    fn subscribe_imu(&mut self, callback: ImuCallback) {
        self.subscribers.write().add_imu(callback);
    }

    fn subscribe_sensor_joy(&mut self, callback: SensorJoyCallback) {
        self.subscribers.write().add_sensor_joy(callback);
    }

    fn publish_command(&self, cmd: &RobotCmd) -> Result<(), DriverError> {
        if self.fail_publish.load(Ordering::Relaxed) {
            return Err(DriverError::Publish("mock publish failure".to_string()));
        }
        cmd.validate(self.joint_num)?;
        self.published_tx
            .send(cmd.clone())
            .map_err(|e| DriverError::Publish(e.to_string()))
    }

    fn joint_num(&self) -> usize {
        self.joint_num
    }
}
