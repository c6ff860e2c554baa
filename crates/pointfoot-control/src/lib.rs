//! # Pointfoot Control
//!
//! 点足机器人固定频率运动控制核心：
//!
//! - `config`：每种机型一份 TOML 配置（`[PointfootCfg]`）
//! - `remap`：逻辑 / 物理关节置换
//! - `gait`：步态相位 `(sin, cos)`
//! - `history` / `observation`：定长历史窗口与八通道观测
//! - `inference`：encoder + policy 推理适配层
//! - `safety`：力矩包络动作限幅
//! - `mode`：STAND → WALK 状态机
//! - `controller`：单 tick 逻辑
//! - `loop_runner`：固定频率调度、失败处理
//!
//! # 使用场景
//!
//! ```rust,no_run
//! use pointfoot_control::{
//!     ControlLoopDriver, InferenceAdapter, LoopConfig, ModelPaths, PointfootController,
//!     RobotConfig,
//! };
//! use pointfoot_driver::{ConnectionConfig, SimConfig, SimTransport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = ModelPaths::new("model/pointfoot", "PF_TRON1A");
//! let config = RobotConfig::load(&paths.config_file)?;
//!
//! let transport = SimTransport::connect(
//!     &ConnectionConfig::default(),
//!     SimConfig { joint_num: config.joint_num(), ..SimConfig::default() },
//! )?;
//! let controller = PointfootController::new(&config, InferenceAdapter::zeros(&config))?;
//! let mut driver = ControlLoopDriver::new(transport, controller, LoopConfig::from_robot(&config))?;
//! driver.run()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
mod error;
pub mod gait;
pub mod history;
pub mod inference;
pub mod loop_runner;
pub mod mode;
pub mod observation;
pub mod remap;
pub mod safety;

pub use config::{ConfigError, ModelPaths, RobotConfig};
pub use controller::{PointfootController, TickOutcome, joystick_command};
pub use error::ControlError;
pub use gait::{GaitCommand, gait_phase};
pub use history::HistoryBuffer;
#[cfg(feature = "onnx")]
pub use inference::OnnxModel;
pub use inference::{InferenceAdapter, InferenceError, InferenceModel, Stage, ZeroModel};
pub use loop_runner::{ControlLoopDriver, FailurePolicy, LoopConfig, LoopExit};
pub use mode::{Mode, ModeStateMachine, ModeStep};
pub use observation::{HistoryWindow, ObservationAssembler};
pub use remap::{DEFAULT_PHYSICAL_INDEX, JointRemapper};
pub use safety::ActionSafetyClamp;
