//! 控制层错误类型

use crate::config::ConfigError;
use crate::inference::InferenceError;
use pointfoot_driver::DriverError;
use pointfoot_protocol::ProtocolError;
use thiserror::Error;

/// 控制层错误
#[derive(Error, Debug)]
pub enum ControlError {
    /// 配置错误（启动阶段）
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 推理契约错误
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// 传输层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 数据长度 / 索引错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
