//! 推理后端与传输层的构造

use anyhow::{Context, Result};
use clap::ValueEnum;
use pointfoot_control::{InferenceAdapter, ModelPaths, RobotConfig};
use pointfoot_driver::{ConnectionConfig, SimConfig, SimTransport};
use tracing::info;

/// 传输层类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// 进程内仿真
    Sim,
}

/// 连接传输层，失败时在进入控制循环前退出
pub fn connect(kind: TransportKind, address: &str, config: &RobotConfig) -> Result<SimTransport> {
    let conn = ConnectionConfig::with_address(Some(address.to_string()));
    match kind {
        TransportKind::Sim => {
            let sim = SimConfig {
                joint_num: config.joint_num(),
                ..SimConfig::default()
            };
            SimTransport::connect(&conn, sim)
                .with_context(|| format!("Failed to initialize robot at {}", address))
        },
    }
}

/// 构造 encoder + policy 适配层
///
/// `dry_run` 时两个模型都输出零向量，不读取模型文件。
pub fn build_adapter(
    config: &RobotConfig,
    paths: &ModelPaths,
    dry_run: bool,
) -> Result<InferenceAdapter> {
    if dry_run {
        info!("Dry run: using zero-output models");
        return Ok(InferenceAdapter::zeros(config));
    }
    load_onnx(config, paths)
}

#[cfg(feature = "onnx")]
fn load_onnx(config: &RobotConfig, paths: &ModelPaths) -> Result<InferenceAdapter> {
    use pointfoot_control::OnnxModel;

    let history = config.history_len();
    let latent = config.size.latent_size;
    let encoder = OnnxModel::load(&paths.encoder_model, history, latent)?;
    let policy = OnnxModel::load(&paths.policy_model, history + latent, config.size.actions_size)?;
    InferenceAdapter::new(Box::new(encoder), Box::new(policy), config)
        .context("Model shapes do not match the robot configuration")
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(_config: &RobotConfig, paths: &ModelPaths) -> Result<InferenceAdapter> {
    anyhow::bail!(
        "Cannot load {}: built without the `onnx` feature (rebuild with --features onnx, or pass --dry-run)",
        paths.policy_model.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = include_str!("../../../crates/pointfoot-control/tests/fixtures/params.toml");

    #[test]
    fn test_dry_run_adapter() {
        let config = RobotConfig::from_toml_str(PARAMS).unwrap();
        let paths = ModelPaths::new("/nonexistent", "PF_TRON1A");
        let adapter = build_adapter(&config, &paths, true).unwrap();
        assert_eq!(adapter.latent_len(), 3);
        assert_eq!(adapter.action_len(), 6);
    }

    #[test]
    fn test_missing_models_fail() {
        let config = RobotConfig::from_toml_str(PARAMS).unwrap();
        let paths = ModelPaths::new("/nonexistent", "PF_TRON1A");
        assert!(build_adapter(&config, &paths, false).is_err());
    }
}
