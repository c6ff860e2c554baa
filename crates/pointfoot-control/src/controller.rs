//! # 点足控制器
//!
//! 单个 tick 的完整逻辑（不含调度与发布）：
//!
//! ```text
//! SensorSnapshot ─► ModeStateMachine
//!                     ├─ STAND: 插值 ─► 出站重映射 ─► RobotCmd
//!                     └─ WALK : 入站对齐
//!                               ├─ (每 decimation 个 tick) 观测 ─► encoder ─► policy ─► 对称裁剪
//!                               └─ (每个 tick) 力矩包络限幅 ─► 出站重映射 ─► RobotCmd
//! ```
//!
//! 推理之间动作保持不变，但力矩包络依赖实时 q / dq，因此每个 tick 都重新限幅。

use crate::config::RobotConfig;
use crate::error::ControlError;
use crate::inference::InferenceAdapter;
use crate::mode::{Mode, ModeStateMachine, ModeStep, interpolate_stand};
use crate::observation::ObservationAssembler;
use crate::remap::JointRemapper;
use crate::safety::ActionSafetyClamp;
use pointfoot_driver::SensorSnapshot;
use pointfoot_protocol::{RobotCmd, SensorJoy};
use std::time::{Duration, Instant};
use tracing::debug;

/// 单个 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// 本 tick 的全局计数（从 0 开始）
    pub tick: u64,
    /// 本 tick 的调度结果
    pub step: ModeStep,
    /// tick 结束后的模式
    pub mode: Mode,
    /// 本 tick 是否执行了推理
    pub inferred: bool,
    /// encoder + policy 调用耗时（仅推理 tick）
    pub inference_time: Option<Duration>,
}

/// 手柄 → 速度命令 `(vx, vy, yaw_rate)`
///
/// 轴映射：`axes[1] → vx`、`axes[0] → vy`、`axes[2] → yaw_rate`，缺失的轴按 0 处理。
pub fn joystick_command(joy: &SensorJoy, axis_scale: f64) -> [f64; 3] {
    [
        f64::from(joy.axis(1)) * axis_scale,
        f64::from(joy.axis(0)) * axis_scale,
        f64::from(joy.axis(2)) * axis_scale,
    ]
}

/// 点足控制器
#[derive(Debug)]
pub struct PointfootController {
    remapper: JointRemapper,
    modes: ModeStateMachine,
    assembler: ObservationAssembler,
    inference: InferenceAdapter,
    safety: ActionSafetyClamp,
    /// 输出命令（物理顺序），跨 tick 保持
    command: RobotCmd,
    /// 当前动作（推理之间保持）
    actions: Vec<f64>,
    /// 上一 tick 限幅后的动作
    last_actions: Vec<f64>,
    /// 站立插值起点
    zero_pose: Vec<f64>,
    /// 默认站姿 q0
    default_joint_angles: Vec<f64>,
    decimation: u64,
    damping: f64,
    axis_scale: f64,
    loop_count: u64,
}

impl PointfootController {
    /// 构造控制器
    ///
    /// 置换表取配置中的 `joint_remap`，缺省时使用默认表。
    pub fn new(config: &RobotConfig, inference: InferenceAdapter) -> Result<Self, ControlError> {
        config.validate()?;
        let joint_num = config.joint_num();
        let remapper = match &config.joint_remap {
            Some(remap) => JointRemapper::from_table(joint_num, &remap.physical_index)?,
            None => JointRemapper::with_default_table(joint_num)?,
        };
        Self::with_remapper(config, inference, remapper)
    }

    /// 以指定的重映射构造
    pub fn with_remapper(
        config: &RobotConfig,
        inference: InferenceAdapter,
        remapper: JointRemapper,
    ) -> Result<Self, ControlError> {
        let joint_num = config.joint_num();
        let default_joint_angles = config.default_joint_angles()?;

        if remapper.joint_num() != joint_num {
            return Err(crate::config::ConfigError::invalid(
                "joint_remap.physical_index",
                format!(
                    "remapper covers {} joints, config has {}",
                    remapper.joint_num(),
                    joint_num
                ),
            )
            .into());
        }

        Ok(Self {
            remapper,
            modes: ModeStateMachine::with_total_ticks(config.stand_ticks()),
            assembler: ObservationAssembler::new(config, default_joint_angles.clone()),
            inference,
            safety: ActionSafetyClamp::new(config, default_joint_angles.clone()),
            command: RobotCmd::new(joint_num, config.control.stiffness, config.control.damping),
            actions: vec![0.0; config.size.actions_size],
            last_actions: vec![0.0; config.size.actions_size],
            zero_pose: vec![0.0; joint_num],
            default_joint_angles,
            decimation: u64::from(config.control.decimation),
            damping: config.control.damping,
            axis_scale: config.joystick.axis_scale,
            loop_count: 0,
        })
    }

    /// 执行一个 tick，结果写入 [`command`](Self::command)
    pub fn tick(&mut self, snapshot: &SensorSnapshot) -> Result<TickOutcome, ControlError> {
        let tick = self.loop_count;
        let step = self.modes.step();

        let inference_time = match step {
            ModeStep::Stand { percent } => {
                let targets =
                    interpolate_stand(&self.zero_pose, &self.default_joint_angles, percent);
                self.remapper.write_positions(&mut self.command, &targets)?;
                None
            },
            ModeStep::EnterWalk => None,
            ModeStep::Walk => self.walk(snapshot)?,
        };

        self.command.stamp_ns = snapshot.robot_state.stamp_ns;
        self.loop_count += 1;

        Ok(TickOutcome {
            tick,
            step,
            mode: self.modes.mode(),
            inferred: inference_time.is_some(),
            inference_time,
        })
    }

    fn walk(&mut self, snapshot: &SensorSnapshot) -> Result<Option<Duration>, ControlError> {
        let aligned = self.remapper.align_state(&snapshot.robot_state)?;

        let mut inference_time = None;
        if self.loop_count % self.decimation == 0 {
            let commands = joystick_command(&snapshot.joy, self.axis_scale);
            let window = self.assembler.assemble(
                &aligned,
                &snapshot.imu,
                &commands,
                &self.last_actions,
                self.loop_count,
            );

            let start = Instant::now();
            let latent = self.inference.encode(&window.clipped)?;
            let mut observation = window.raw;
            observation.extend_from_slice(&latent);
            let raw_actions = self.inference.act(&observation)?;
            inference_time = Some(start.elapsed());

            self.actions = raw_actions.into_iter().map(f64::from).collect();
            self.safety.symmetric_clip(&mut self.actions);
            debug!(tick = self.loop_count, actions = ?self.actions, "policy step");
        }

        self.safety.clamp(&mut self.actions, &aligned);
        for (joint, &action) in self.actions.iter().enumerate() {
            let target = self.safety.target_position(joint, action);
            self.remapper.write_position(&mut self.command, joint, target)?;
        }
        self.last_actions.copy_from_slice(&self.actions);

        Ok(inference_time)
    }

    /// 当前输出命令（物理顺序）
    pub fn command(&self) -> &RobotCmd {
        &self.command
    }

    /// 安全停止命令：Kp = 0、Kd = damping，目标位置取实测 q，dq 与 tau 为 0
    pub fn safe_stop_command(&self, snapshot: &SensorSnapshot) -> RobotCmd {
        let mut cmd = RobotCmd::new(self.command.joint_num(), 0.0, self.damping);
        for (joint, q) in cmd.joints.iter_mut().zip(&snapshot.robot_state.q) {
            joint.q = *q;
        }
        cmd.stamp_ns = snapshot.robot_state.stamp_ns;
        cmd
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    /// 已执行的 tick 数
    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    pub fn joint_num(&self) -> usize {
        self.command.joint_num()
    }

    /// 当前动作（逻辑顺序，限幅后）
    pub fn actions(&self) -> &[f64] {
        &self.actions
    }

    pub fn last_actions(&self) -> &[f64] {
        &self.last_actions
    }

    pub fn assembler(&self) -> &ObservationAssembler {
        &self.assembler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::inference::{InferenceError, InferenceModel, ZeroModel};
    use pointfoot_protocol::RobotState;
    use std::sync::{Arc, Mutex};

    /// 输出常数动作的 policy
    struct ConstPolicy(f32);

    impl InferenceModel for ConstPolicy {
        fn run(&mut self, _input: &[f32]) -> Result<Vec<f32>, InferenceError> {
            Ok(vec![self.0; 6])
        }

        fn input_len(&self) -> usize {
            323
        }

        fn output_len(&self) -> usize {
            6
        }
    }

    fn controller_with_policy(value: f32) -> PointfootController {
        let config = sample_config();
        let adapter = InferenceAdapter::new(
            Box::new(ZeroModel::new(320, 3)),
            Box::new(ConstPolicy(value)),
            &config,
        )
        .unwrap();
        PointfootController::new(&config, adapter).unwrap()
    }

    /// 记录每次输入，输出固定值
    struct RecordingModel {
        inputs: Arc<Mutex<Vec<Vec<f32>>>>,
        input_len: usize,
        output: Vec<f32>,
    }

    impl InferenceModel for RecordingModel {
        fn run(&mut self, input: &[f32]) -> Result<Vec<f32>, InferenceError> {
            self.inputs.lock().unwrap().push(input.to_vec());
            Ok(self.output.clone())
        }

        fn input_len(&self) -> usize {
            self.input_len
        }

        fn output_len(&self) -> usize {
            self.output.len()
        }
    }

    fn run_until_walk(controller: &mut PointfootController, snapshot: &SensorSnapshot) {
        while controller.mode() != Mode::Walk {
            controller.tick(snapshot).unwrap();
        }
    }

    #[test]
    fn test_joystick_mapping() {
        let joy = SensorJoy {
            axes: vec![0.2, 1.0, -0.4],
            ..Default::default()
        };
        let cmd = joystick_command(&joy, 0.5);
        assert!((cmd[0] - 0.5).abs() < 1e-6);
        assert!((cmd[1] - 0.1).abs() < 1e-6);
        assert!((cmd[2] + 0.2).abs() < 1e-6);

        assert_eq!(joystick_command(&SensorJoy::default(), 0.5), [0.0; 3]);
    }

    #[test]
    fn test_stand_phase_interpolates_toward_default() {
        let mut config = sample_config();
        config
            .init_state
            .default_joint_angle
            .insert("hip_L_Joint".to_string(), 1.0);
        let mut controller =
            PointfootController::new(&config, InferenceAdapter::zeros(&config)).unwrap();
        let snapshot = SensorSnapshot::zeros(6);

        let outcome = controller.tick(&snapshot).unwrap();
        assert_eq!(outcome.tick, 0);
        assert_eq!(outcome.mode, Mode::Stand);
        assert!(!outcome.inferred);

        // 逻辑关节 1 写入物理槽位 3
        let q = controller.command().positions();
        assert!((q[3] - 0.001).abs() < 1e-12);
        assert_eq!(q[1], 0.0);
    }

    #[test]
    fn test_transition_tick_leaves_command_untouched() {
        let config = sample_config();
        let mut controller =
            PointfootController::new(&config, InferenceAdapter::zeros(&config)).unwrap();
        let snapshot = SensorSnapshot::zeros(6);

        for _ in 0..999 {
            controller.tick(&snapshot).unwrap();
        }
        let before = controller.command().clone();
        let outcome = controller.tick(&snapshot).unwrap();
        assert_eq!(outcome.step, ModeStep::EnterWalk);
        assert_eq!(outcome.tick, 999);
        assert_eq!(controller.command(), &before);
    }

    #[test]
    fn test_walk_inference_every_decimation_ticks() {
        let mut controller = controller_with_policy(0.1);
        let snapshot = SensorSnapshot::zeros(6);
        run_until_walk(&mut controller, &snapshot);

        let mut inferred = Vec::new();
        for _ in 0..12 {
            let outcome = controller.tick(&snapshot).unwrap();
            assert_eq!(outcome.step, ModeStep::Walk);
            inferred.push(outcome.inferred);
        }
        // 第一个 WALK tick 的全局计数为 1000，1000 % 4 == 0
        let pattern: Vec<bool> = (0..12).map(|i| i % 4 == 0).collect();
        assert_eq!(inferred, pattern);
    }

    #[test]
    fn test_walk_command_from_actions() {
        let mut controller = controller_with_policy(0.1);
        let snapshot = SensorSnapshot::zeros(6);
        run_until_walk(&mut controller, &snapshot);
        controller.tick(&snapshot).unwrap();

        // 0.1 × action_scale 0.5 + q0 0
        for q in controller.command().positions() {
            assert!((q - 0.05).abs() < 1e-6);
        }
        assert_eq!(controller.actions(), controller.last_actions());
        assert_eq!(controller.assembler().buffer_lens(), [10; 8]);
    }

    #[test]
    fn test_encoder_reads_clipped_window_policy_reads_raw() {
        let config = sample_config();
        let clip = config.normalization.clip_scales.clip_observations as f32;
        let history = config.history_len();
        let encoder_inputs = Arc::new(Mutex::new(Vec::new()));
        let policy_inputs = Arc::new(Mutex::new(Vec::new()));
        let adapter = InferenceAdapter::new(
            Box::new(RecordingModel {
                inputs: encoder_inputs.clone(),
                input_len: history,
                output: vec![7.0; config.size.latent_size],
            }),
            Box::new(RecordingModel {
                inputs: policy_inputs.clone(),
                input_len: config.policy_input_len(),
                output: vec![0.0; config.size.actions_size],
            }),
            &config,
        )
        .unwrap();
        let mut controller = PointfootController::new(&config, adapter).unwrap();

        let mut snapshot = SensorSnapshot::zeros(6);
        run_until_walk(&mut controller, &snapshot);
        // dq × dof_vel = 5000，远超 clip_observations
        snapshot.robot_state.dq = vec![1.0e5; 6];
        let outcome = controller.tick(&snapshot).unwrap();
        assert!(outcome.inferred);
        assert!(outcome.inference_time.is_some());

        let encoder_inputs = encoder_inputs.lock().unwrap();
        let policy_inputs = policy_inputs.lock().unwrap();
        assert_eq!(encoder_inputs.len(), 1);
        assert_eq!(policy_inputs.len(), 1);
        let encoded = &encoder_inputs[0];
        let policy = &policy_inputs[0];

        assert_eq!(encoded.len(), history);
        assert_eq!(policy.len(), history + 3);
        assert!(encoded.iter().all(|v| v.abs() <= clip));
        assert_eq!(encoded.iter().cloned().fold(f32::MIN, f32::max), clip);
        assert_eq!(policy.iter().cloned().fold(f32::MIN, f32::max), 5000.0);
        for (e, p) in encoded.iter().zip(&policy[..history]) {
            assert_eq!(*e, p.min(clip).max(-clip));
        }
        assert_eq!(&policy[history..], &[7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_inference_time_only_on_inference_ticks() {
        let mut controller = controller_with_policy(0.1);
        let snapshot = SensorSnapshot::zeros(6);

        let stand = controller.tick(&snapshot).unwrap();
        assert_eq!(stand.inference_time, None);

        run_until_walk(&mut controller, &snapshot);
        let first = controller.tick(&snapshot).unwrap();
        let second = controller.tick(&snapshot).unwrap();
        assert!(first.inference_time.is_some());
        assert_eq!(second.inference_time, None);
    }

    #[test]
    fn test_walk_clamps_large_actions() {
        let mut controller = controller_with_policy(50.0);
        let snapshot = SensorSnapshot::zeros(6);
        run_until_walk(&mut controller, &snapshot);
        controller.tick(&snapshot).unwrap();

        for &a in controller.actions() {
            assert!((a - 4.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_held_action_reclamped_each_tick() {
        let mut controller = controller_with_policy(1.0);
        let mut snapshot = SensorSnapshot::zeros(6);
        run_until_walk(&mut controller, &snapshot);
        controller.tick(&snapshot).unwrap();
        assert!((controller.actions()[0] - 1.0).abs() < 1e-9);

        // 非推理 tick：关节 0 以大负速度运动，上界收紧到 (−40 + 20) / 30 / 0.5
        snapshot.robot_state.dq[0] = -40.0;
        let outcome = controller.tick(&snapshot).unwrap();
        assert!(!outcome.inferred);
        assert!((controller.actions()[0] - (-20.0 / 30.0 / 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_state_length_error_propagates() {
        let config = sample_config();
        let adapter = InferenceAdapter::zeros(&config);
        let mut controller = PointfootController::new(&config, adapter).unwrap();
        let mut snapshot = SensorSnapshot::zeros(6);
        run_until_walk(&mut controller, &snapshot);

        snapshot.robot_state = RobotState::zeros(4);
        let err = controller.tick(&snapshot).unwrap_err();
        assert!(matches!(err, ControlError::Protocol(_)));
    }

    #[test]
    fn test_safe_stop_command() {
        let controller = controller_with_policy(0.0);
        let mut snapshot = SensorSnapshot::zeros(6);
        snapshot.robot_state.q = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        snapshot.robot_state.dq = vec![9.0; 6];

        let cmd = controller.safe_stop_command(&snapshot);
        assert_eq!(cmd.positions(), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        for joint in &cmd.joints {
            assert_eq!(joint.kp, 0.0);
            assert_eq!(joint.kd, 1.0);
            assert_eq!(joint.dq, 0.0);
            assert_eq!(joint.tau, 0.0);
        }
    }
}
