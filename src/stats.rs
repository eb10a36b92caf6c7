use std::collections::HashMap;

use tokio::sync::Mutex;

/// Point-in-time copy of the counters. Detached from the aggregator, so the
/// reporter can format it while classification keeps running.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Lifetime message count, never reset.
    pub total_messages: u64,
    /// New members since the last scheduled report.
    pub new_members: u64,
    /// Hit count per keyword, in keyword registration order.
    pub keyword_hits: Vec<(String, u64)>,
    pub sender_activity: HashMap<u64, u64>,
}

struct Counters {
    total_messages: u64,
    new_members: u64,
    keyword_hits: HashMap<String, u64>,
    sender_activity: HashMap<u64, u64>,
}

/// In-process usage counters, owned by one instance and shared by handle.
/// All mutation and the snapshot go through one mutex, so the reporter can
/// never observe a torn read while the classifier is updating.
pub struct StatsAggregator {
    /// Keyword registration order, kept for digest tie-breaking.
    keyword_order: Vec<String>,
    counters: Mutex<Counters>,
}

impl StatsAggregator {
    pub fn new(keyword_order: Vec<String>) -> Self {
        Self {
            keyword_order,
            counters: Mutex::new(Counters {
                total_messages: 0,
                new_members: 0,
                keyword_hits: HashMap::new(),
                sender_activity: HashMap::new(),
            }),
        }
    }

    pub async fn record_message(&self, sender_id: u64) {
        let mut counters = self.counters.lock().await;
        counters.total_messages += 1;
        *counters.sender_activity.entry(sender_id).or_insert(0) += 1;
    }

    /// One increment per matched term. A message matching several keywords
    /// bumps each of them, so hit sums can exceed the message total.
    pub async fn record_keyword_hits(&self, matched: &[String]) {
        let mut counters = self.counters.lock().await;
        for term in matched {
            *counters.keyword_hits.entry(term.clone()).or_insert(0) += 1;
        }
    }

    pub async fn record_new_member(&self) {
        let mut counters = self.counters.lock().await;
        counters.new_members += 1;
    }

    /// Consistent point-in-time copy of all counters.
    pub async fn snapshot(&self) -> StatsSnapshot {
        let counters = self.counters.lock().await;
        StatsSnapshot {
            total_messages: counters.total_messages,
            new_members: counters.new_members,
            keyword_hits: self
                .keyword_order
                .iter()
                .map(|term| {
                    (
                        term.clone(),
                        counters.keyword_hits.get(term).copied().unwrap_or(0),
                    )
                })
                .collect(),
            sender_activity: counters.sender_activity.clone(),
        }
    }

    /// Reset the per-period counters. Lifetime totals are left alone.
    pub async fn reset_windowed(&self) {
        let mut counters = self.counters.lock().await;
        counters.new_members = 0;
    }
}
