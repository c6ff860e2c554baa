//! 驱动层错误类型定义

use pointfoot_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层初始化失败（启动阶段致命）
    #[error("Failed to connect to robot at {address}: {reason}")]
    Connection { address: String, reason: String },

    /// 传输层已关闭
    #[error("Transport not connected")]
    NotConnected,

    /// 命令发布失败
    #[error("Failed to publish command: {0}")]
    Publish(String),

    /// 协议数据错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
