use std::sync::Arc;

use tracing::{error, info};

use crate::platform::{NotificationCommand, NotificationSink};
use crate::stats::{StatsAggregator, StatsSnapshot};

/// Keywords shown in one digest, busiest first.
const TOP_KEYWORDS: usize = 10;

/// Produces the periodic digest for the operator. Holds its collaborators
/// from construction; the scheduler only calls `run_once`.
pub struct ScheduledReporter {
    operator_chat_id: i64,
    stats: Arc<StatsAggregator>,
    sink: Arc<dyn NotificationSink>,
}

impl ScheduledReporter {
    pub fn new(
        operator_chat_id: i64,
        stats: Arc<StatsAggregator>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            operator_chat_id,
            stats,
            sink,
        }
    }

    /// Snapshot the counters, deliver one digest to the operator, then reset
    /// the windowed counters. Delivery failure is logged and dropped — the
    /// window still rolls over.
    pub async fn run_once(&self) {
        let snapshot = self.stats.snapshot().await;
        let command = NotificationCommand {
            chat_id: self.operator_chat_id,
            body: format_digest(&snapshot),
        };

        match self.sink.deliver(&command).await {
            Ok(()) => info!("Periodic digest delivered"),
            Err(e) => error!("Failed to deliver digest: {:#}", e),
        }

        self.stats.reset_windowed().await;
    }
}

/// Digest body: lifetime totals first, then the busiest keywords. The sort
/// is stable, so equal counts keep keyword registration order.
fn format_digest(snapshot: &StatsSnapshot) -> String {
    let mut report = format!(
        "📊 每周统计\n总消息数：{}\n本期新成员：{}\n",
        snapshot.total_messages, snapshot.new_members
    );

    let mut hits: Vec<&(String, u64)> = snapshot
        .keyword_hits
        .iter()
        .filter(|(_, count)| *count > 0)
        .collect();
    hits.sort_by(|a, b| b.1.cmp(&a.1));

    for (term, count) in hits.into_iter().take(TOP_KEYWORDS) {
        report.push_str(&format!(" - {}: {} 次\n", term, count));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    const OPERATOR: i64 = 1000;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<NotificationCommand>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, command: &NotificationCommand) -> Result<()> {
            self.delivered.lock().await.push(command.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn deliver(&self, _command: &NotificationCommand) -> Result<()> {
            anyhow::bail!("network down")
        }
    }

    async fn seeded_stats() -> Arc<StatsAggregator> {
        let stats = Arc::new(StatsAggregator::new(vec![
            "vpn".to_string(),
            "Netflix".to_string(),
        ]));
        for _ in 0..10 {
            stats.record_message(1).await;
        }
        for _ in 0..3 {
            stats.record_keyword_hits(&["vpn".to_string()]).await;
        }
        stats.record_keyword_hits(&["Netflix".to_string()]).await;
        stats.record_new_member().await;
        stats.record_new_member().await;
        stats
    }

    #[tokio::test]
    async fn test_digest_contents_and_windowed_reset() {
        let stats = seeded_stats().await;
        let sink = Arc::new(RecordingSink::default());
        let reporter = ScheduledReporter::new(OPERATOR, Arc::clone(&stats), sink.clone());

        reporter.run_once().await;

        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        let digest = &delivered[0];
        assert_eq!(digest.chat_id, OPERATOR);
        assert!(digest.body.contains("总消息数：10"));
        assert!(digest.body.contains("本期新成员：2"));
        // Descending by count: vpn (3) must come before Netflix (1).
        let vpn_pos = digest.body.find("vpn: 3").unwrap();
        let netflix_pos = digest.body.find("Netflix: 1").unwrap();
        assert!(vpn_pos < netflix_pos);

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.new_members, 0);
        assert_eq!(snapshot.total_messages, 10);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_rolls_the_window() {
        let stats = seeded_stats().await;
        let reporter = ScheduledReporter::new(OPERATOR, Arc::clone(&stats), Arc::new(FailingSink));

        reporter.run_once().await;

        assert_eq!(stats.snapshot().await.new_members, 0);
    }

    #[test]
    fn test_digest_ties_keep_registration_order() {
        let snapshot = StatsSnapshot {
            total_messages: 4,
            new_members: 0,
            keyword_hits: vec![
                ("上车".to_string(), 2),
                ("合租".to_string(), 2),
                ("机场".to_string(), 0),
            ],
            sender_activity: Default::default(),
        };

        let digest = format_digest(&snapshot);
        let first = digest.find("上车: 2").unwrap();
        let second = digest.find("合租: 2").unwrap();
        assert!(first < second);
        // Zero-hit keywords stay out of the digest.
        assert!(!digest.contains("机场"));
    }

    #[test]
    fn test_digest_truncates_to_top_keywords() {
        let keyword_hits: Vec<(String, u64)> = (0..15)
            .map(|i| (format!("kw{:02}", i), (15 - i) as u64))
            .collect();
        let snapshot = StatsSnapshot {
            total_messages: 100,
            new_members: 0,
            keyword_hits,
            sender_activity: Default::default(),
        };

        let digest = format_digest(&snapshot);
        assert!(digest.contains("kw09"));
        assert!(!digest.contains("kw10"));
    }
}
