//! Post-run accounting of command executions

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info};

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Success,
    Failure { reason: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub command_id: String,
    pub user_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: ExecutionOutcome,
}

/// Receives one record per invoked handler
pub trait ExecutionRecorder: Send + Sync {
    fn record(&self, record: ExecutionRecord);
}

/// Aggregated metrics for one command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandMetrics {
    pub command_id: String,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub avg_duration_ms: f64,
    pub last_execution: Option<DateTime<Utc>>,
    pub last_failure: Option<String>,
}

impl CommandMetrics {
    fn apply(&mut self, record: &ExecutionRecord) {
        let previous = self.total_executions as f64;
        self.total_executions += 1;

        match &record.outcome {
            ExecutionOutcome::Success => self.successful_executions += 1,
            ExecutionOutcome::Failure { reason } => {
                self.failed_executions += 1;
                self.last_failure = Some(reason.clone());
            }
        }

        self.min_duration_ms = if previous == 0.0 {
            record.duration_ms
        } else {
            self.min_duration_ms.min(record.duration_ms)
        };
        self.max_duration_ms = self.max_duration_ms.max(record.duration_ms);
        self.avg_duration_ms =
            (self.avg_duration_ms * previous + record.duration_ms as f64) / self.total_executions as f64;
        self.last_execution = Some(record.timestamp);
    }

    /// Success rate as percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            return 0.0;
        }
        (self.successful_executions as f64 / self.total_executions as f64) * 100.0
    }
}

/// Thread-safe in-process metrics
#[derive(Debug)]
pub struct MetricsManager {
    history: DashMap<String, VecDeque<ExecutionRecord>>,
    command_metrics: DashMap<String, CommandMetrics>,
    total_executions: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    start_time: Instant,
    max_history_per_command: usize,
}

impl Default for MetricsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsManager {
    pub fn new() -> Self {
        Self::with_history_limit(1000)
    }

    pub fn with_history_limit(max_history_per_command: usize) -> Self {
        Self {
            history: DashMap::new(),
            command_metrics: DashMap::new(),
            total_executions: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            start_time: Instant::now(),
            max_history_per_command,
        }
    }

    pub fn get_command_metrics(&self, command_id: &str) -> Option<CommandMetrics> {
        self.command_metrics.get(command_id).map(|m| m.clone())
    }

    pub fn get_all_command_metrics(&self) -> Vec<CommandMetrics> {
        let mut all: Vec<CommandMetrics> = self.command_metrics.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.command_id.cmp(&b.command_id));
        all
    }

    /// Most recent records of a command, newest first
    pub fn get_command_history(&self, command_id: &str, limit: usize) -> Vec<ExecutionRecord> {
        self.history
            .get(command_id)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// (total, successes, failures)
    pub fn get_global_counts(&self) -> (u64, u64, u64) {
        (
            self.total_executions.load(Ordering::Relaxed),
            self.total_successes.load(Ordering::Relaxed),
            self.total_failures.load(Ordering::Relaxed),
        )
    }

    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Drop history older than `retention`; aggregates are kept
    pub fn cleanup_old_executions(&self, retention: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
        else {
            return 0;
        };
        let mut cleaned = 0;

        for mut entry in self.history.iter_mut() {
            let before = entry.len();
            entry.retain(|record| record.timestamp > cutoff);
            cleaned += before - entry.len();
        }

        if cleaned > 0 {
            info!("Cleaned up {} execution records", cleaned);
        }
        cleaned
    }

    /// Summary for logs and status commands
    pub fn summary(&self) -> serde_json::Value {
        let (total, successes, failures) = self.get_global_counts();
        let commands: Vec<serde_json::Value> = self
            .get_all_command_metrics()
            .iter()
            .map(|m| {
                serde_json::json!({
                    "command_id": m.command_id,
                    "executions": m.total_executions,
                    "success_rate": m.success_rate(),
                    "avg_duration_ms": m.avg_duration_ms,
                })
            })
            .collect();

        serde_json::json!({
            "uptime_seconds": self.get_uptime().as_secs(),
            "total_executions": total,
            "successful_executions": successes,
            "failed_executions": failures,
            "commands": commands,
        })
    }

    /// Periodically trim history beyond `retention`
    pub fn start_cleanup_task(self: Arc<Self>, every: Duration, retention: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                self.cleanup_old_executions(retention);

                if self.total_executions.load(Ordering::Relaxed) > 0 {
                    info!(summary = %self.summary(), "Metrics cleanup complete");
                }
            }
        })
    }
}

impl ExecutionRecorder for MetricsManager {
    fn record(&self, record: ExecutionRecord) {
        self.total_executions.fetch_add(1, Ordering::Relaxed);
        if record.outcome.is_success() {
            self.total_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }

        self.command_metrics
            .entry(record.command_id.clone())
            .or_insert_with(|| CommandMetrics {
                command_id: record.command_id.clone(),
                ..CommandMetrics::default()
            })
            .apply(&record);

        debug!(
            "Recorded execution: command={}, user={}, success={}, duration={}ms",
            record.command_id,
            record.user_id,
            record.outcome.is_success(),
            record.duration_ms
        );

        let mut history = self.history.entry(record.command_id.clone()).or_default();
        history.push_back(record);
        while history.len() > self.max_history_per_command {
            history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, duration_ms: u64, outcome: ExecutionOutcome) -> ExecutionRecord {
        ExecutionRecord {
            command_id: id.to_string(),
            user_id: 1,
            guild_id: None,
            channel_id: 2,
            timestamp: Utc::now(),
            duration_ms,
            outcome,
        }
    }

    #[test]
    fn test_aggregates() {
        let metrics = MetricsManager::new();
        metrics.record(record("ChatInput/ping", 10, ExecutionOutcome::Success));
        metrics.record(record("ChatInput/ping", 30, ExecutionOutcome::Failure { reason: "boom".into() }));

        let ping = metrics.get_command_metrics("ChatInput/ping").unwrap();
        assert_eq!(ping.total_executions, 2);
        assert_eq!(ping.min_duration_ms, 10);
        assert_eq!(ping.max_duration_ms, 30);
        assert!((ping.avg_duration_ms - 20.0).abs() < f64::EPSILON);
        assert_eq!(ping.last_failure.as_deref(), Some("boom"));
        assert!((ping.success_rate() - 50.0).abs() < f64::EPSILON);
        assert_eq!(metrics.get_global_counts(), (2, 1, 1));
    }

    #[test]
    fn test_history_is_bounded() {
        let metrics = MetricsManager::with_history_limit(2);
        for duration in [1, 2, 3] {
            metrics.record(record("Button/a", duration, ExecutionOutcome::Success));
        }

        let history = metrics.get_command_history("Button/a", 10);
        let durations: Vec<u64> = history.iter().map(|r| r.duration_ms).collect();
        assert_eq!(durations, [3, 2]);
        assert_eq!(metrics.get_command_metrics("Button/a").unwrap().total_executions, 3);
    }

    #[test]
    fn test_summary_lists_commands_in_id_order() {
        let metrics = MetricsManager::new();
        metrics.record(record("ChatInput/ping", 4, ExecutionOutcome::Success));
        metrics.record(record("Button/a", 2, ExecutionOutcome::Failure { reason: "gone".into() }));
        metrics.record(record("ChatInput/ping", 6, ExecutionOutcome::Success));

        let summary = metrics.summary();
        assert_eq!(summary["total_executions"], 3);
        assert_eq!(summary["failed_executions"], 1);

        let commands = summary["commands"].as_array().unwrap();
        let ids: Vec<&str> = commands.iter().map(|c| c["command_id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["Button/a", "ChatInput/ping"]);
        assert_eq!(commands[0]["success_rate"], 0.0);
        assert_eq!(commands[1]["executions"], 2);
        assert_eq!(commands[1]["avg_duration_ms"], 5.0);
    }
}
