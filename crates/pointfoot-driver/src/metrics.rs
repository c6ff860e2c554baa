//! 控制循环指标
//!
//! 原子计数器，控制线程写入，任意线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 控制循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use pointfoot_driver::LoopMetrics;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let metrics = Arc::new(LoopMetrics::new());
///
/// // 控制线程中
/// metrics.record_tick(Duration::from_micros(350));
///
/// // 监控线程中
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.ticks_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// 已执行的 tick 总数
    pub ticks_total: AtomicU64,

    /// 推理流水线（encoder + policy）执行次数
    pub inferences_total: AtomicU64,

    /// 超时 tick 次数（tick 耗时超过周期）
    ///
    /// 如果这个值持续增长，说明推理耗时超过了控制周期，
    /// 实际频率会低于配置频率。
    pub overruns_total: AtomicU64,

    /// 发布的命令总数
    pub commands_published: AtomicU64,

    /// 单个 tick 最大耗时（微秒）
    pub max_tick_us: AtomicU64,

    /// 最近一次 encoder + policy 调用耗时（微秒）
    pub last_inference_us: AtomicU64,
}

impl LoopMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 tick 及其耗时
    pub fn record_tick(&self, elapsed: Duration) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        self.max_tick_us
            .fetch_max(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// 记录一次推理及其耗时
    pub fn record_inference(&self, elapsed: Duration) {
        self.inferences_total.fetch_add(1, Ordering::Relaxed);
        self.last_inference_us
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// 记录一次超时
    pub fn record_overrun(&self) {
        self.overruns_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次命令发布
    pub fn record_publish(&self) {
        self.commands_published.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        LoopMetricsSnapshot {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            inferences_total: self.inferences_total.load(Ordering::Relaxed),
            overruns_total: self.overruns_total.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            max_tick_us: self.max_tick_us.load(Ordering::Relaxed),
            last_inference_us: self.last_inference_us.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.ticks_total.store(0, Ordering::Relaxed);
        self.inferences_total.store(0, Ordering::Relaxed);
        self.overruns_total.store(0, Ordering::Relaxed);
        self.commands_published.store(0, Ordering::Relaxed);
        self.max_tick_us.store(0, Ordering::Relaxed);
        self.last_inference_us.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopMetricsSnapshot {
    pub ticks_total: u64,
    pub inferences_total: u64,
    pub overruns_total: u64,
    pub commands_published: u64,
    pub max_tick_us: u64,
    pub last_inference_us: u64,
}

impl LoopMetricsSnapshot {
    /// 超时率（百分比），`ticks_total` 为 0 时返回 0.0
    pub fn overrun_rate(&self) -> f64 {
        if self.ticks_total == 0 {
            return 0.0;
        }
        (self.overruns_total as f64 / self.ticks_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = LoopMetrics::new().snapshot();
        assert_eq!(snapshot, LoopMetricsSnapshot::default());
    }

    #[test]
    fn test_record_tick_tracks_max() {
        let metrics = LoopMetrics::new();
        metrics.record_tick(Duration::from_micros(300));
        metrics.record_tick(Duration::from_micros(900));
        metrics.record_tick(Duration::from_micros(100));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks_total, 3);
        assert_eq!(snapshot.max_tick_us, 900);
    }

    #[test]
    fn test_record_inference() {
        let metrics = LoopMetrics::new();
        metrics.record_inference(Duration::from_micros(1200));
        metrics.record_inference(Duration::from_micros(800));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inferences_total, 2);
        assert_eq!(snapshot.last_inference_us, 800);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = LoopMetrics::new();
        metrics.record_tick(Duration::from_micros(10));
        metrics.record_overrun();
        metrics.record_publish();

        metrics.reset();
        assert_eq!(metrics.snapshot(), LoopMetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_updates() {
        let metrics = Arc::new(LoopMetrics::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_publish();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().commands_published, 1000);
    }

    #[test]
    fn test_overrun_rate() {
        let snapshot = LoopMetricsSnapshot {
            ticks_total: 200,
            overruns_total: 5,
            ..Default::default()
        };
        assert_eq!(snapshot.overrun_rate(), 2.5);
        assert_eq!(LoopMetricsSnapshot::default().overrun_rate(), 0.0);
    }
}
