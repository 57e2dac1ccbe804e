use crate::utils::error::TripError;
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct StageStats {
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub stage_time: Duration,
    pub elapsed_time: Duration,
}

/// 記錄每個規劃階段的耗時與記憶體用量
#[cfg(feature = "cli")]
pub struct StageMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    stage_start: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl StageMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
            start_time: Instant::now(),
            stage_start: Mutex::new(Instant::now()),
            peak_memory: Mutex::new(0),
            enabled,
        }
    }

    pub fn begin_stage(&self, stage: &str) {
        if !self.enabled {
            return;
        }
        if let Ok(mut start) = self.stage_start.lock() {
            *start = Instant::now();
        }
        tracing::debug!("⏱ Stage '{}' started", stage);
    }

    fn sample(&self) -> Option<StageStats> {
        if !self.enabled {
            return None;
        }

        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let memory_mb = system.process(pid)?.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        let stage_time = self.stage_start.lock().ok()?.elapsed();

        Some(StageStats {
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            stage_time,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn end_stage(&self, stage: &str) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 {} - Stage time: {:?}, Memory: {}MB, Peak: {}MB, Total: {:?}",
                stage,
                stats.stage_time,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn fail_stage(&self, stage: &str, error: &TripError) {
        if let Some(stats) = self.sample() {
            tracing::warn!(
                "📊 {} failed after {:?} ({}), Memory: {}MB, Total: {:?}",
                stage,
                stats.stage_time,
                error,
                stats.memory_usage_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for StageMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct StageMonitor;

#[cfg(not(feature = "cli"))]
impl StageMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn begin_stage(&self, _stage: &str) {}

    pub fn end_stage(&self, _stage: &str) {}

    pub fn fail_stage(&self, _stage: &str, _error: &TripError) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = StageMonitor::new(false);
        monitor.begin_stage("style");
        assert!(monitor.sample().is_none());
        assert!(!monitor.is_enabled());
        monitor.fail_stage("style", &TripError::llm("overloaded"));
    }

    #[test]
    fn test_enabled_monitor_samples_failed_stage() {
        let monitor = StageMonitor::new(true);
        monitor.begin_stage("budget");
        std::thread::sleep(Duration::from_millis(5));

        let stats = monitor.sample().expect("current process should be visible");
        assert!(stats.stage_time >= Duration::from_millis(5));
        assert!(stats.elapsed_time >= stats.stage_time);
        monitor.fail_stage("budget", &TripError::validation("bad budget"));
    }
}
