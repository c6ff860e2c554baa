//! 进程内仿真传输层
//!
//! 不依赖任何硬件：后台线程以固定频率积分一个简化的关节动力学模型
//! （每个关节独立的刚体 + 执行器 PD 律），并按订阅分发关节状态和 IMU。
//! 用于无机器人环境下的联调与演示。

use crate::error::DriverError;
use crate::transport::{
    ConnectionConfig, ImuCallback, RobotStateCallback, RobotTransport, SensorJoyCallback,
    SubscriberSet,
};
use parking_lot::{Mutex, RwLock};
use pointfoot_protocol::{ImuData, RobotCmd, RobotState};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// 仿真参数
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 执行器数量
    pub joint_num: usize,
    /// 状态发布频率（Hz）
    pub rate_hz: f64,
    /// 每个关节的等效转动惯量（kg·m²）
    pub link_inertia: f64,
    /// 执行器力矩饱和（N·m）
    pub torque_limit: f64,
    /// 初始关节位置（物理顺序），为空时全零
    pub initial_q: Vec<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            joint_num: 6,
            rate_hz: 1000.0,
            link_inertia: 0.05,
            torque_limit: 40.0,
            initial_q: Vec::new(),
        }
    }
}

/// 仿真关节模型
#[derive(Debug, Clone)]
struct SimJoints {
    q: Vec<f64>,
    dq: Vec<f64>,
    tau: Vec<f64>,
}

impl SimJoints {
    fn new(config: &SimConfig) -> Self {
        let q = if config.initial_q.len() == config.joint_num {
            config.initial_q.clone()
        } else {
            vec![0.0; config.joint_num]
        };
        Self {
            q,
            dq: vec![0.0; config.joint_num],
            tau: vec![0.0; config.joint_num],
        }
    }

    /// 半隐式欧拉积分一步
    fn step(&mut self, cmd: Option<&RobotCmd>, config: &SimConfig, dt: f64) {
        for i in 0..self.q.len() {
            let tau = match cmd.and_then(|c| c.joints.get(i)) {
                Some(j) => j.kp * (j.q - self.q[i]) + j.kd * (j.dq - self.dq[i]) + j.tau,
                None => 0.0,
            };
            let tau = tau.clamp(-config.torque_limit, config.torque_limit);
            self.tau[i] = tau;
            self.dq[i] += tau / config.link_inertia * dt;
            self.q[i] += self.dq[i] * dt;
        }
    }

    fn to_state(&self, stamp_ns: u64) -> RobotState {
        RobotState {
            stamp_ns,
            q: self.q.clone(),
            dq: self.dq.clone(),
            tau: self.tau.clone(),
        }
    }
}

/// 仿真传输层
pub struct SimTransport {
    subscribers: Arc<RwLock<SubscriberSet>>,
    /// 命令邮箱（Overwrite，仿真线程只关心最新命令）
    command_slot: Arc<Mutex<Option<RobotCmd>>>,
    is_running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    joint_num: usize,
}

impl SimTransport {
    /// 启动仿真
    ///
    /// # 错误
    /// - `DriverError::Connection`: 参数非法或仿真线程无法启动
    pub fn connect(conn: &ConnectionConfig, config: SimConfig) -> Result<Self, DriverError> {
        let fail = |reason: String| DriverError::Connection {
            address: conn.address.clone(),
            reason,
        };
        if config.joint_num == 0 {
            return Err(fail("joint_num must be > 0".to_string()));
        }
        if !(config.rate_hz > 0.0) || !(config.link_inertia > 0.0) {
            return Err(fail(format!(
                "invalid simulation parameters: rate_hz={}, link_inertia={}",
                config.rate_hz, config.link_inertia
            )));
        }

        let subscribers = Arc::new(RwLock::new(SubscriberSet::new()));
        let command_slot = Arc::new(Mutex::new(None::<RobotCmd>));
        let is_running = Arc::new(AtomicBool::new(true));
        let joint_num = config.joint_num;

        let thread = {
            let subscribers = subscribers.clone();
            let command_slot = command_slot.clone();
            let is_running = is_running.clone();
            thread::Builder::new()
                .name("pointfoot-sim".to_string())
                .spawn(move || sim_loop(config, subscribers, command_slot, is_running))
                .map_err(|e| fail(e.to_string()))?
        };

        info!(
            "Simulated robot started at {} ({} joints)",
            conn.address, joint_num
        );

        Ok(Self {
            subscribers,
            command_slot,
            is_running,
            thread: Some(thread),
            joint_num,
        })
    }
}

fn sim_loop(
    config: SimConfig,
    subscribers: Arc<RwLock<SubscriberSet>>,
    command_slot: Arc<Mutex<Option<RobotCmd>>>,
    is_running: Arc<AtomicBool>,
) {
    let period = Duration::from_secs_f64(1.0 / config.rate_hz);
    let dt = period.as_secs_f64();
    let start = Instant::now();
    let mut joints = SimJoints::new(&config);
    let mut latest: Option<RobotCmd> = None;
    let mut next_tick = Instant::now();

    while is_running.load(Ordering::Acquire) {
        next_tick += period;

        if let Some(cmd) = command_slot.lock().take() {
            latest = Some(cmd);
        }
        joints.step(latest.as_ref(), &config, dt);

        let stamp_ns = start.elapsed().as_nanos() as u64;
        let state = joints.to_state(stamp_ns);
        let imu = ImuData {
            stamp_ns,
            ..Default::default()
        };
        {
            let subs = subscribers.read();
            subs.dispatch_robot_state(&state);
            subs.dispatch_imu(&imu);
        }

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }
    trace!("Sim thread: loop exited");
}

impl RobotTransport for SimTransport {
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
        if !self.is_running.load(Ordering::Acquire) {
            return Err(DriverError::NotConnected);
        }
        cmd.validate(self.joint_num)?;
        *self.command_slot.lock() = Some(cmd.clone());
        Ok(())
    }

    fn joint_num(&self) -> usize {
        self.joint_num
    }
}

impl Drop for SimTransport {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("Sim thread panicked during shutdown");
        }
    }
}
