//! # 机器人配置
//!
//! 每种机器人型号一份 TOML 配置，顶层表为 `[PointfootCfg]`。
//!
//! ## 目录布局
//!
//! ```text
//! {model_root}/{robot_type}/params.toml
//! {model_root}/{robot_type}/policy/policy.onnx
//! {model_root}/{robot_type}/policy/encoder.onnx
//! ```
//!
//! 加载后立即执行 [`RobotConfig::validate`]，任何缺失或非法字段都在启动阶段报错。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "params.toml";
/// policy 模型文件名
pub const POLICY_MODEL_FILE_NAME: &str = "policy.onnx";
/// encoder 模型文件名
pub const ENCODER_MODEL_FILE_NAME: &str = "encoder.onnx";

/// 八个观测通道中与关节数无关部分的宽度：
/// 角速度 3 + 重力投影 3 + 速度命令 3 + 步态相位 2 + 步态命令 3
const FIXED_CHANNEL_WIDTH: usize = 14;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取失败
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败（缺字段 / 类型错误）
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 某个关节缺少默认角度
    #[error("Missing default joint angle for joint '{0}'")]
    MissingJointAngle(String),

    /// 字段取值非法
    #[error("Invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 模型与配置文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// `{model_root}/{robot_type}`
    pub robot_dir: PathBuf,
    /// 配置文件
    pub config_file: PathBuf,
    /// policy 模型
    pub policy_model: PathBuf,
    /// encoder 模型
    pub encoder_model: PathBuf,
}

impl ModelPaths {
    pub fn new(model_root: impl AsRef<Path>, robot_type: &str) -> Self {
        let robot_dir = model_root.as_ref().join(robot_type);
        let policy_dir = robot_dir.join("policy");
        Self {
            config_file: robot_dir.join(CONFIG_FILE_NAME),
            policy_model: policy_dir.join(POLICY_MODEL_FILE_NAME),
            encoder_model: policy_dir.join(ENCODER_MODEL_FILE_NAME),
            robot_dir,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "PointfootCfg")]
    pointfoot: RobotConfig,
}

/// 机器人配置（`[PointfootCfg]`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// 关节名（逻辑顺序）
    pub joint_names: Vec<String>,
    pub init_state: InitState,
    pub stand_mode: StandModeConfig,
    pub control: ControlConfig,
    pub normalization: NormalizationConfig,
    pub size: SizeConfig,
    pub imu_orientation_offset: OrientationOffset,
    pub user_cmd_scales: UserCmdScales,
    /// 控制循环频率（Hz）
    pub loop_frequency: f64,
    #[serde(default)]
    pub gait: GaitConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    /// 逻辑→物理关节置换表；缺省时使用内置默认表
    #[serde(default)]
    pub joint_remap: Option<JointRemapConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitState {
    /// 默认站立姿态（按关节名索引，rad）
    pub default_joint_angle: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandModeConfig {
    /// 从零位插值到默认姿态的时长（秒）
    pub stand_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// PD 刚度 Kp
    pub stiffness: f64,
    /// PD 阻尼 Kd
    pub damping: f64,
    /// 每多少个控制 tick 推理一次
    pub decimation: u32,
    /// 动作 → 关节位置增量的缩放
    pub action_scale_pos: f64,
    /// 用户力矩上限（N·m）
    pub user_torque_limit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    pub obs_scales: ObsScales,
    pub clip_scales: ClipScales,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsScales {
    pub ang_vel: f64,
    pub dof_pos: f64,
    pub dof_vel: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipScales {
    pub clip_actions: f64,
    pub clip_observations: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeConfig {
    pub actions_size: usize,
    pub observations_history_length: usize,
    pub latent_size: usize,
    /// 单步观测宽度
    pub observations_size: usize,
}

/// IMU 安装偏置（rad），按 Z-Y-X 顺序合成旋转
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrientationOffset {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserCmdScales {
    pub lin_vel_x: f64,
    pub lin_vel_y: f64,
    pub ang_vel_yaw: f64,
}

/// 步态命令（频率 Hz、相位偏移、触地占空比）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    pub frequency: f64,
    pub phase_offset: f64,
    pub duty_ratio: f64,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            phase_offset: 0.5,
            duty_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoystickConfig {
    /// 摇杆轴 → 速度命令的缩放
    pub axis_scale: f64,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self { axis_scale: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointRemapConfig {
    /// `physical_index[logical] = physical`
    pub physical_index: Vec<usize>,
}

impl RobotConfig {
    /// 从文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.pointfoot.validate()?;
        Ok(file.pointfoot)
    }

    /// 关节数
    pub fn joint_num(&self) -> usize {
        self.joint_names.len()
    }

    /// 单步观测宽度（八个通道之和）
    pub fn step_observation_len(&self) -> usize {
        FIXED_CHANNEL_WIDTH + 2 * self.joint_num() + self.size.actions_size
    }

    /// 历史窗口展平后的长度（encoder 输入）
    pub fn history_len(&self) -> usize {
        self.size.observations_size * self.size.observations_history_length
    }

    /// policy 输入长度：历史窗口 + 隐向量
    pub fn policy_input_len(&self) -> usize {
        self.history_len() + self.size.latent_size
    }

    /// 站立阶段总 tick 数 `stand_duration · loop_frequency`
    pub fn stand_ticks(&self) -> f64 {
        self.stand_mode.stand_duration * self.loop_frequency
    }

    /// 默认站立姿态（逻辑顺序）
    pub fn default_joint_angles(&self) -> Result<Vec<f64>, ConfigError> {
        self.joint_names
            .iter()
            .map(|name| {
                self.init_state
                    .default_joint_angle
                    .get(name)
                    .copied()
                    .ok_or_else(|| ConfigError::MissingJointAngle(name.clone()))
            })
            .collect()
    }

    /// 校验所有字段
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.joint_names.is_empty() {
            return Err(ConfigError::invalid("joint_names", "must not be empty"));
        }
        self.default_joint_angles()?;

        positive("loop_frequency", self.loop_frequency)?;
        positive("stand_mode.stand_duration", self.stand_mode.stand_duration)?;
        positive("control.stiffness", self.control.stiffness)?;
        non_negative("control.damping", self.control.damping)?;
        positive("control.action_scale_pos", self.control.action_scale_pos)?;
        positive("control.user_torque_limit", self.control.user_torque_limit)?;
        positive(
            "normalization.clip_scales.clip_actions",
            self.normalization.clip_scales.clip_actions,
        )?;
        positive(
            "normalization.clip_scales.clip_observations",
            self.normalization.clip_scales.clip_observations,
        )?;
        positive("gait.frequency", self.gait.frequency)?;

        if self.control.decimation == 0 {
            return Err(ConfigError::invalid("control.decimation", "must be >= 1"));
        }
        if self.size.observations_history_length == 0 {
            return Err(ConfigError::invalid(
                "size.observations_history_length",
                "must be >= 1",
            ));
        }
        if self.size.actions_size != self.joint_num() {
            return Err(ConfigError::invalid(
                "size.actions_size",
                format!(
                    "must equal joint count {} (got {})",
                    self.joint_num(),
                    self.size.actions_size
                ),
            ));
        }
        if self.size.observations_size != self.step_observation_len() {
            return Err(ConfigError::invalid(
                "size.observations_size",
                format!(
                    "expected {} for {} joints and {} actions (got {})",
                    self.step_observation_len(),
                    self.joint_num(),
                    self.size.actions_size,
                    self.size.observations_size
                ),
            ));
        }
        if let Some(remap) = &self.joint_remap
            && remap.physical_index.len() > self.joint_num()
        {
            return Err(ConfigError::invalid(
                "joint_remap.physical_index",
                format!(
                    "table length {} exceeds joint count {}",
                    remap.physical_index.len(),
                    self.joint_num()
                ),
            ));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be > 0 (got {})", value)))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be >= 0 (got {})", value)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) const SAMPLE: &str = include_str!("../tests/fixtures/params.toml");

    pub(crate) fn sample_config() -> RobotConfig {
        RobotConfig::from_toml_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_sample_config_parses() {
        let config = sample_config();
        assert_eq!(config.joint_num(), 6);
        assert_eq!(config.control.decimation, 4);
        assert_eq!(config.step_observation_len(), 32);
        assert_eq!(config.history_len(), 320);
        assert_eq!(config.policy_input_len(), 323);
        assert_eq!(config.stand_ticks(), 1000.0);
        assert_eq!(config.default_joint_angles().unwrap(), vec![0.0; 6]);
        assert!(config.joint_remap.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = RobotConfig::load(file.path()).unwrap();
        assert_eq!(config.loop_frequency, 500.0);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RobotConfig::load("/nonexistent/params.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_missing_required_field() {
        let broken = SAMPLE.replace("stand_duration = 2.0", "");
        let err = RobotConfig::from_toml_str(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{:?}", err);
    }

    #[test]
    fn test_missing_joint_angle() {
        let broken = SAMPLE.replace("knee_R_Joint = 0.0", "");
        match RobotConfig::from_toml_str(&broken) {
            Err(ConfigError::MissingJointAngle(name)) => assert_eq!(name, "knee_R_Joint"),
            other => panic!("Expected MissingJointAngle, got {:?}", other),
        }
    }

    #[test]
    fn test_observation_size_mismatch() {
        let broken = SAMPLE.replace("observations_size = 32", "observations_size = 30");
        match RobotConfig::from_toml_str(&broken) {
            Err(ConfigError::Invalid { field, .. }) => {
                assert_eq!(field, "size.observations_size")
            },
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_decimation_rejected() {
        let broken = SAMPLE.replace("decimation = 4", "decimation = 0");
        assert!(matches!(
            RobotConfig::from_toml_str(&broken),
            Err(ConfigError::Invalid {
                field: "control.decimation",
                ..
            })
        ));
    }

    #[test]
    fn test_non_positive_stiffness_rejected() {
        let broken = SAMPLE.replace("stiffness = 30.0", "stiffness = 0.0");
        assert!(matches!(
            RobotConfig::from_toml_str(&broken),
            Err(ConfigError::Invalid {
                field: "control.stiffness",
                ..
            })
        ));
    }

    #[test]
    fn test_optional_sections_default() {
        let trimmed = SAMPLE
            .replace("[PointfootCfg.gait]", "")
            .replace("frequency = 2.0", "")
            .replace("phase_offset = 0.5", "")
            .replace("duty_ratio = 0.5", "")
            .replace("[PointfootCfg.joystick]", "")
            .replace("axis_scale = 0.5", "");
        let config = RobotConfig::from_toml_str(&trimmed).unwrap();
        assert_eq!(config.gait, GaitConfig::default());
        assert_eq!(config.joystick, JoystickConfig::default());
    }

    #[test]
    fn test_remap_table_from_config() {
        let with_remap = format!(
            "{}\n[PointfootCfg.joint_remap]\nphysical_index = [0, 3, 1, 4, 2, 5]\n",
            SAMPLE
        );
        let config = RobotConfig::from_toml_str(&with_remap).unwrap();
        assert_eq!(
            config.joint_remap.unwrap().physical_index,
            vec![0, 3, 1, 4, 2, 5]
        );
    }

    #[test]
    fn test_model_paths_layout() {
        let paths = ModelPaths::new("/opt/model/pointfoot", "PF_TRON1A");
        assert_eq!(
            paths.config_file,
            PathBuf::from("/opt/model/pointfoot/PF_TRON1A/params.toml")
        );
        assert_eq!(
            paths.policy_model,
            PathBuf::from("/opt/model/pointfoot/PF_TRON1A/policy/policy.onnx")
        );
        assert_eq!(
            paths.encoder_model,
            PathBuf::from("/opt/model/pointfoot/PF_TRON1A/policy/encoder.onnx")
        );
    }
}
