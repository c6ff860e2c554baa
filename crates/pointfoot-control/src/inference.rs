//! # 推理适配层
//!
//! encoder 与 policy 两个模型都是"定长向量 → 定长向量"的纯函数。
//! 适配层只负责长度契约：调用前检查输入长度，调用后检查输出长度。
//!
//! 后端：
//! - [`ZeroModel`]：恒输出零向量，用于 dry-run 与测试
//! - `OnnxModel`：tract-onnx 后端（`onnx` feature）

use crate::config::RobotConfig;
use std::path::PathBuf;
use thiserror::Error;
use tracing::trace;

/// 推理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Encoder,
    Policy,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Encoder => write!(f, "encoder"),
            Stage::Policy => write!(f, "policy"),
        }
    }
}

/// 推理契约错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// 输入长度与模型期望不符
    #[error("{stage} input length mismatch: expected {expected}, got {actual}")]
    InputLength {
        stage: Stage,
        expected: usize,
        actual: usize,
    },

    /// 输出长度与模型声明不符
    #[error("{stage} output length mismatch: expected {expected}, got {actual}")]
    OutputLength {
        stage: Stage,
        expected: usize,
        actual: usize,
    },

    /// 后端运行时错误
    #[error("Inference backend error: {0}")]
    Backend(String),

    /// 模型加载失败
    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },
}

/// 推理模型
///
/// 实现者必须是确定性的：相同输入产生相同输出。
pub trait InferenceModel: Send {
    /// 执行一次推理
    fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, InferenceError>;

    /// 输入向量长度
    fn input_len(&self) -> usize;

    /// 输出向量长度
    fn output_len(&self) -> usize;
}

/// 恒输出零向量的模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroModel {
    input_len: usize,
    output_len: usize,
}

impl ZeroModel {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        Self {
            input_len,
            output_len,
        }
    }
}

impl InferenceModel for ZeroModel {
    fn run(&mut self, _input: &[f32]) -> Result<Vec<f32>, InferenceError> {
        Ok(vec![0.0; self.output_len])
    }

    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.output_len
    }
}

/// encoder + policy 适配层
pub struct InferenceAdapter {
    encoder: Box<dyn InferenceModel>,
    policy: Box<dyn InferenceModel>,
}

impl std::fmt::Debug for InferenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceAdapter")
            .field("encoder", &(self.encoder.input_len(), self.encoder.output_len()))
            .field("policy", &(self.policy.input_len(), self.policy.output_len()))
            .finish()
    }
}

impl InferenceAdapter {
    /// 组合两个模型并检查它们的形状与配置一致
    ///
    /// - encoder：`history_len → latent_size`
    /// - policy：`history_len + latent_size → actions_size`
    pub fn new(
        encoder: Box<dyn InferenceModel>,
        policy: Box<dyn InferenceModel>,
        config: &RobotConfig,
    ) -> Result<Self, InferenceError> {
        let history = config.history_len();
        let latent = config.size.latent_size;

        check_len(Stage::Encoder, history, encoder.input_len(), true)?;
        check_len(Stage::Encoder, latent, encoder.output_len(), false)?;
        check_len(Stage::Policy, history + latent, policy.input_len(), true)?;
        check_len(
            Stage::Policy,
            config.size.actions_size,
            policy.output_len(),
            false,
        )?;

        Ok(Self { encoder, policy })
    }

    /// 按配置创建两个 [`ZeroModel`]
    pub fn zeros(config: &RobotConfig) -> Self {
        let history = config.history_len();
        let latent = config.size.latent_size;
        Self {
            encoder: Box::new(ZeroModel::new(history, latent)),
            policy: Box::new(ZeroModel::new(history + latent, config.size.actions_size)),
        }
    }

    /// 裁剪后的历史窗口 → 隐向量
    pub fn encode(&mut self, history: &[f32]) -> Result<Vec<f32>, InferenceError> {
        run_checked(Stage::Encoder, self.encoder.as_mut(), history)
    }

    /// 观测（历史窗口 ++ 隐向量）→ 动作
    pub fn act(&mut self, observation: &[f32]) -> Result<Vec<f32>, InferenceError> {
        run_checked(Stage::Policy, self.policy.as_mut(), observation)
    }

    pub fn latent_len(&self) -> usize {
        self.encoder.output_len()
    }

    pub fn action_len(&self) -> usize {
        self.policy.output_len()
    }
}

fn check_len(stage: Stage, expected: usize, actual: usize, input: bool) -> Result<(), InferenceError> {
    if expected == actual {
        return Ok(());
    }
    Err(if input {
        InferenceError::InputLength {
            stage,
            expected,
            actual,
        }
    } else {
        InferenceError::OutputLength {
            stage,
            expected,
            actual,
        }
    })
}

fn run_checked(
    stage: Stage,
    model: &mut dyn InferenceModel,
    input: &[f32],
) -> Result<Vec<f32>, InferenceError> {
    check_len(stage, model.input_len(), input.len(), true)?;
    let output = model.run(input)?;
    check_len(stage, model.output_len(), output.len(), false)?;
    trace!(%stage, input = input.len(), output = output.len(), "inference");
    Ok(output)
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{InferenceError, InferenceModel};
    use std::path::Path;
    use tract_onnx::prelude::*;
    use tracing::info;

    type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

    /// tract-onnx 推理后端
    ///
    /// 输入形状固定为 `[1, input_len]`，输出展平后长度须为 `output_len`。
    pub struct OnnxModel {
        plan: Plan,
        input_len: usize,
        output_len: usize,
    }

    impl OnnxModel {
        pub fn load(
            path: impl AsRef<Path>,
            input_len: usize,
            output_len: usize,
        ) -> Result<Self, InferenceError> {
            let path = path.as_ref();
            let load_err = |e: TractError| InferenceError::ModelLoad {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            };

            let plan = tract_onnx::onnx()
                .model_for_path(path)
                .and_then(|model| model.with_input_fact(0, f32::fact([1, input_len]).into()))
                .and_then(|model| model.into_optimized())
                .and_then(|model| model.into_runnable())
                .map_err(load_err)?;

            info!(path = %path.display(), input_len, output_len, "ONNX model loaded");
            Ok(Self {
                plan,
                input_len,
                output_len,
            })
        }
    }

    impl InferenceModel for OnnxModel {
        fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, InferenceError> {
            let backend = |e: TractError| InferenceError::Backend(format!("{e:#}"));

            let tensor = Tensor::from_shape(&[1, input.len()], input).map_err(backend)?;
            let outputs = self.plan.run(tvec!(tensor.into())).map_err(backend)?;
            let first = outputs
                .first()
                .ok_or_else(|| InferenceError::Backend("model produced no outputs".to_string()))?;
            let values = first.as_slice::<f32>().map_err(backend)?;
            Ok(values.to_vec())
        }

        fn input_len(&self) -> usize {
            self.input_len
        }

        fn output_len(&self) -> usize {
            self.output_len
        }
    }
}
