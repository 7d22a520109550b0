//! File-backed usage log and running aggregates.
//!
//! One JSON file holds `{logs, stats}`: a capped window of recent entries plus
//! cumulative totals. The file is read, modified and rewritten in full under a
//! single async mutex, which serializes concurrent appends and gives readers a
//! consistent snapshot. Storage failures never propagate to the request path.

use chrono::Utc;
use log::error;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::usage::{UsageLogEntry, UsageLogFile, UsageLogInput};

/// Entries kept in the persisted log window; aggregates keep counting past it.
const MAX_LOG_ENTRIES: usize = 1000;

// Approximate DeepSeek pricing per 1K tokens (input / output).
const INPUT_COST_PER_1K: f64 = 0.00014;
const OUTPUT_COST_PER_1K: f64 = 0.00028;

/// Monetary cost of a call given its total token count. The provider reports
/// only a total, so half is billed at the input rate and half at the output
/// rate.
pub fn calculate_cost(tokens: i64, _model: &str) -> f64 {
    let input_tokens = tokens as f64 * 0.5;
    let output_tokens = tokens as f64 * 0.5;
    (input_tokens / 1000.0) * INPUT_COST_PER_1K + (output_tokens / 1000.0) * OUTPUT_COST_PER_1K
}

pub struct UsageStore {
    path: PathBuf,
    // Serializes the read-modify-write of the backing file. Readers take it
    // too so they never observe a partially rewritten file.
    lock: Mutex<()>,
    max_entries: usize,
}

impl UsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            max_entries: MAX_LOG_ENTRIES,
        }
    }

    #[cfg(test)]
    pub fn with_max_entries(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            max_entries,
        }
    }

    /// Creates the log directory and an empty log file if none exists yet.
    pub async fn init(&self) -> std::io::Result<()> {
        let _guard = self.lock.lock().await;
        self.ensure_parent_dir().await;
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.write_file(&UsageLogFile::default()).await
    }

    /// Appends one entry and updates the aggregates, rewriting the backing
    /// file. Persistence failures are logged and swallowed; the calling
    /// request must never fail because the log could not be written.
    pub async fn record(&self, input: UsageLogInput) {
        let _guard = self.lock.lock().await;
        let mut data = self.read_file().await;

        let now = Utc::now();
        let entry = UsageLogEntry {
            id: now.timestamp_millis().to_string(),
            timestamp: now,
            endpoint: input.endpoint,
            ip: input.ip,
            source: input.source,
            project_type: input.project_type,
            tokens_used: input.tokens_used,
            cost: input.cost,
            model: input.model,
            success: input.success,
            error: input.error,
            response_time_ms: input.response_time_ms,
        };

        let stats = &mut data.stats;
        stats.total_calls += 1;
        stats.total_tokens += entry.tokens_used;
        stats.total_cost += entry.cost;
        if entry.success {
            stats.successful_calls += 1;
        } else {
            stats.failed_calls += 1;
        }

        let endpoint_stats = stats.by_endpoint.entry(entry.endpoint.clone()).or_default();
        endpoint_stats.count += 1;
        endpoint_stats.tokens += entry.tokens_used;
        endpoint_stats.cost += entry.cost;

        let date = entry.timestamp.format("%Y-%m-%d").to_string();
        let daily_stats = stats.by_date.entry(date).or_default();
        daily_stats.calls += 1;
        daily_stats.tokens += entry.tokens_used;
        daily_stats.cost += entry.cost;

        data.logs.push(entry);
        if data.logs.len() > self.max_entries {
            let excess = data.logs.len() - self.max_entries;
            data.logs.drain(..excess);
        }

        self.ensure_parent_dir().await;
        if let Err(e) = self.write_file(&data).await {
            error!("Failed to persist usage log entry: {}", e);
        }
    }

    /// Full snapshot of the capped log window plus the cumulative aggregates.
    /// Returns an empty default when the file cannot be read.
    pub async fn stats(&self) -> UsageLogFile {
        let _guard = self.lock.lock().await;
        self.read_file().await
    }

    /// Up to `limit` most recent entries, newest first, optionally filtered by
    /// the `source` tag. A 2x superset is fetched before filtering so the
    /// filter does not artificially shorten the result.
    pub async fn recent_entries(&self, limit: usize, source: Option<&str>) -> Vec<UsageLogEntry> {
        let _guard = self.lock.lock().await;
        let data = self.read_file().await;

        let mut entries: Vec<UsageLogEntry> = data
            .logs
            .iter()
            .rev()
            .take(limit.saturating_mul(2))
            .cloned()
            .collect();
        if let Some(tag) = source {
            entries.retain(|entry| entry.source == tag);
        }
        entries.truncate(limit);
        entries
    }

    /// Resets the log and aggregates to empty. Irreversible.
    pub async fn clear(&self) {
        let _guard = self.lock.lock().await;
        self.ensure_parent_dir().await;
        if let Err(e) = self.write_file(&UsageLogFile::default()).await {
            error!("Failed to clear usage log: {}", e);
        }
    }

    async fn ensure_parent_dir(&self) {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("Failed to create usage log directory: {}", e);
            }
        }
    }

    // Callers must hold `self.lock`.
    async fn read_file(&self) -> UsageLogFile {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                error!("Usage log file is corrupt, starting from empty: {}", e);
                UsageLogFile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UsageLogFile::default(),
            Err(e) => {
                error!("Failed to read usage log file: {}", e);
                UsageLogFile::default()
            }
        }
    }

    async fn write_file(&self, data: &UsageLogFile) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(data).map_err(std::io::Error::other)?;
        tokio::fs::write(&self.path, json).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
