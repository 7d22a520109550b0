use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One metered provider call, success or failure. Entries are immutable once
/// appended to the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub ip: String,
    pub source: String,
    pub project_type: Option<String>,
    pub tokens_used: i64,
    pub cost: f64,
    pub model: String,
    pub success: bool,
    pub error: Option<String>,
    pub response_time_ms: i64,
}

/// Input for a new log entry; the store assigns the id and timestamp.
#[derive(Clone, Debug)]
pub struct UsageLogInput {
    pub endpoint: String,
    pub ip: String,
    pub source: String,
    pub project_type: Option<String>,
    pub tokens_used: i64,
    pub cost: f64,
    pub model: String,
    pub success: bool,
    pub error: Option<String>,
    pub response_time_ms: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub count: u64,
    pub tokens: i64,
    pub cost: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub calls: u64,
    pub tokens: i64,
    pub cost: f64,
}

/// Running aggregate over every entry ever recorded. Totals are cumulative
/// forever and are never decremented when old entries fall out of the capped
/// log window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_calls: u64,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub by_endpoint: HashMap<String, EndpointStats>,
    pub by_date: HashMap<String, DailyStats>,
}

/// On-disk layout of the usage log file, rewritten in full on every record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLogFile {
    pub logs: Vec<UsageLogEntry>,
    pub stats: UsageStats,
}
