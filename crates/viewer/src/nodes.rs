#![forbid(unsafe_code)]

use crate::ecosystem::{
    Breakdown, ContractLogs, academy_metrics, sky_lynx_metrics, ultra_magnus_metrics,
};
use st_core::Timestamp;
use st_core::activity::{normalize_activity, truncate_feed};
use st_core::model::{NodeDetail, RecentRecord};
use st_core::topology::{ACADEMY, SKY_LYNX, ULTRA_MAGNUS, known_node};

pub const RECENT_RECORDS: usize = 20;

/// `None` for ids outside the three-node topology.
pub fn node_detail(logs: &ContractLogs, node_id: &str, now: Timestamp) -> Option<NodeDetail> {
    let node_id = known_node(node_id)?;
    let (metrics, events) = match node_id {
        ULTRA_MAGNUS => (
            ultra_magnus_metrics(logs, now),
            normalize_activity(&logs.outcomes, &[], &[]),
        ),
        SKY_LYNX => (
            sky_lynx_metrics(logs, now, Breakdown::Detail),
            normalize_activity(&[], &logs.recommendations, &[]),
        ),
        ACADEMY => (
            academy_metrics(logs, now),
            normalize_activity(&[], &[], &logs.patches),
        ),
        _ => return None,
    };
    let recent_records = truncate_feed(events, Some(RECENT_RECORDS))
        .into_iter()
        .map(RecentRecord::from)
        .collect();
    Some(NodeDetail {
        node_id: metrics.node_id.clone(),
        display_name: metrics.display_name.clone(),
        health_status: metrics.health_status,
        last_activity: metrics.last_activity,
        metrics,
        recent_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use st_core::contracts::{OutcomeRecord, TerminalOutcome};

    #[test]
    fn unknown_node_has_no_detail() {
        let now = Timestamp::from_unix_seconds(1_700_000_000);
        assert!(node_detail(&ContractLogs::default(), "research", now).is_none());
    }

    #[test]
    fn keeps_the_twenty_most_recent_records() {
        let now = Timestamp::from_unix_seconds(1_700_000_000);
        let mut logs = ContractLogs::default();
        for id in 0..25 {
            let at = Timestamp::from_unix_seconds(1_699_000_000 + id * 60);
            logs.outcomes
                .push(OutcomeRecord::new(id, format!("idea {id}"), TerminalOutcome::Deferred, at));
        }
        let detail = node_detail(&logs, ULTRA_MAGNUS, now).unwrap();
        assert_eq!(detail.recent_records.len(), RECENT_RECORDS);
        assert_eq!(detail.recent_records[0].id, "24");
        assert_eq!(detail.recent_records[0].record_type, "outcome");
        assert_eq!(detail.metrics.record_count, 25);
        assert_eq!(detail.display_name, "Ultra Magnus");
    }
}
