//! # Pointfoot Controller
//!
//! 点足机器人运动控制进程。
//!
//! ```bash
//! export ROBOT_TYPE=PF_TRON1A
//! pointfoot-controller 10.192.5.2 --model-root model/pointfoot
//!
//! # 不加载模型，零动作联调
//! pointfoot-controller --dry-run --max-ticks 5000
//! ```
//!
//! 启动顺序：读取配置 → 连接 → 等待 3 秒 → 加载模型 → 控制循环。

use anyhow::{Context, Result};
use clap::Parser;
use pointfoot_control::{
    ControlLoopDriver, FailurePolicy, LoopConfig, LoopExit, ModelPaths, PointfootController,
    RobotConfig,
};
use pointfoot_driver::DEFAULT_ADDRESS;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::info;

mod backend;

use backend::TransportKind;

/// 连接成功后、进入控制循环前的等待时间
const STARTUP_DELAY: Duration = Duration::from_secs(3);

/// Pointfoot Controller - 点足机器人运动控制
#[derive(Parser, Debug)]
#[command(name = "pointfoot-controller")]
#[command(about = "Fixed-rate locomotion controller for point-foot robots", long_about = None)]
#[command(version)]
struct Cli {
    /// 机器人地址
    #[arg(default_value = DEFAULT_ADDRESS)]
    address: String,

    /// 机型（决定配置与模型目录）
    #[arg(long, env = "ROBOT_TYPE")]
    robot_type: Option<String>,

    /// 模型根目录：`{model_root}/{robot_type}/...`
    #[arg(long, default_value = "model/pointfoot")]
    model_root: PathBuf,

    /// 传输层
    #[arg(long, value_enum, default_value_t = TransportKind::Sim)]
    transport: TransportKind,

    /// 不加载模型，encoder / policy 输出全零
    #[arg(long)]
    dry_run: bool,

    /// 运行指定 tick 数后退出
    #[arg(long)]
    max_ticks: Option<u64>,

    /// 失败时立即退出，不发布安全停止命令
    #[arg(long)]
    fail_fast: bool,
}

impl Cli {
    fn robot_type(&self) -> Result<&str> {
        self.robot_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("Please set the ROBOT_TYPE using 'export ROBOT_TYPE=<robot_type>'")
    }

    fn loop_config(&self, config: &RobotConfig) -> LoopConfig {
        LoopConfig {
            max_iterations: self.max_ticks,
            failure_policy: if self.fail_fast {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::SafeStop
            },
            ..LoopConfig::from_robot(config)
        }
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pointfoot=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let robot_type = cli.robot_type()?;

    let paths = ModelPaths::new(&cli.model_root, robot_type);
    let config = RobotConfig::load(&paths.config_file)
        .with_context(|| format!("Failed to load config for robot type {}", robot_type))?;
    info!(
        robot_type,
        joints = config.joint_num(),
        loop_frequency = config.loop_frequency,
        "Config loaded"
    );

    let transport = backend::connect(cli.transport, &cli.address, &config)?;
    std::thread::sleep(STARTUP_DELAY);

    let adapter = backend::build_adapter(&config, &paths, cli.dry_run)?;
    let controller = PointfootController::new(&config, adapter)?;
    let mut driver = ControlLoopDriver::new(transport, controller, cli.loop_config(&config))?;

    let shutdown = driver.shutdown_flag();
    ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
        .context("Failed to install Ctrl-C handler")?;

    let exit = driver.run()?;
    let metrics = driver.metrics().snapshot();
    info!(
        ?exit,
        ticks = metrics.ticks_total,
        inferences = metrics.inferences_total,
        overruns = metrics.overruns_total,
        max_tick_us = metrics.max_tick_us,
        "Controller stopped"
    );
    if exit == LoopExit::Shutdown {
        info!("Interrupted");
    }
    Ok(())
}
