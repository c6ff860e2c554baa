//! # Pointfoot Driver
//!
//! 传输层接缝与状态同步：
//! - `RobotTransport` trait：订阅反馈流 / 发布命令（实现者在外部）
//! - `SensorContext`：回调写入、控制线程按 tick 读快照（ArcSwap 无锁读取）
//! - `SimTransport`：进程内仿真，用于无硬件联调
//! - `LoopMetrics`：控制循环原子计数器
//!
//! # 使用场景
//!
//! ```rust,no_run
//! use pointfoot_driver::{ConnectionConfig, SensorContext, SimConfig, SimTransport, attach};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), pointfoot_driver::DriverError> {
//! let mut transport = SimTransport::connect(&ConnectionConfig::default(), SimConfig::default())?;
//! let ctx = Arc::new(SensorContext::new(6));
//! attach(&mut transport, &ctx);
//!
//! let snapshot = ctx.snapshot();
//! assert_eq!(snapshot.robot_state.q.len(), 6);
//! # Ok(())
//! # }
//! ```

pub mod context;
mod error;
pub mod metrics;
#[cfg(feature = "mock")]
pub mod mock;
pub mod sim;
pub mod transport;

pub use context::{SensorContext, SensorSnapshot, attach};
pub use error::DriverError;
pub use metrics::{LoopMetrics, LoopMetricsSnapshot};
#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockTransport};
pub use sim::{SimConfig, SimTransport};
pub use transport::{
    ConnectionConfig, DEFAULT_ADDRESS, ImuCallback, RobotStateCallback, RobotTransport,
    SensorJoyCallback, SubscriberSet,
};
