//! Fan-out aggregators: concurrent extraction strategies over one input,
//! merged with priority ordering and deduplication.
//!
//! Two instances of the same pattern exist: image search and in-page video
//! discovery. Both launch every configured strategy at once, let each settle
//! independently (a failing, panicking, or slow strategy contributes an
//! empty set, never an exception), then merge in a fixed priority-tier
//! order. The merged ordering is deterministic by tier and per-strategy
//! insertion order, not by completion time.

mod images;
mod videos;

pub use images::ImageAggregator;
pub use videos::VideoAggregator;

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::canonical;

/// Runs strategies concurrently and waits for all of them to settle.
///
/// Returns per-strategy results in launch order. A strategy that panics or
/// outlives `timeout` settles as an empty set.
pub async fn run_settled<R, F>(strategies: Vec<(&'static str, F)>, timeout: Duration) -> Vec<Vec<R>>
where
    R: Send + 'static,
    F: Future<Output = Vec<R>> + Send + 'static,
{
    let handles: Vec<_> = strategies
        .into_iter()
        .map(|(name, fut)| (name, tokio::spawn(tokio::time::timeout(timeout, fut))))
        .collect();

    let mut settled = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(records)) => settled.push(records),
            Ok(Err(_)) => {
                warn!(strategy = name, "strategy timed out");
                settled.push(Vec::new());
            }
            Err(_) => {
                warn!(strategy = name, "strategy panicked");
                settled.push(Vec::new());
            }
        }
    }
    settled
}

/// Walks tiers in priority order, inserting records whose key URL is not a
/// duplicate of anything already inserted, up to `cap`.
pub fn merge_tiers<R, K>(tiers: Vec<Vec<R>>, key: K, cap: usize) -> Vec<R>
where
    K: Fn(&R) -> String,
{
    let mut merged: Vec<R> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for tier in tiers {
        for record in tier {
            if merged.len() >= cap {
                return merged;
            }
            let url = canonical::unescape_url(&key(&record));
            if canonical::is_duplicate(&url, &seen) {
                continue;
            }
            seen.push(url);
            merged.push(record);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_run_settled_isolates_failures() {
        let strategies: Vec<(&'static str, std::pin::Pin<Box<dyn Future<Output = Vec<u32>> + Send>>)> = vec![
            ("ok", Box::pin(async { vec![1, 2] })),
            ("panics", Box::pin(async { panic!("boom") })),
            (
                "slow",
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    vec![9]
                }),
            ),
        ];
        let settled = run_settled(strategies, Duration::from_millis(50)).await;
        assert_eq!(settled, vec![vec![1, 2], vec![], vec![]]);
    }

    #[tokio::test]
    async fn test_run_settled_preserves_launch_order() {
        let strategies: Vec<(&'static str, std::pin::Pin<Box<dyn Future<Output = Vec<u32>> + Send>>)> = vec![
            (
                "slow-first",
                Box::pin(async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    vec![1]
                }),
            ),
            ("fast-second", Box::pin(async { vec![2] })),
        ];
        let settled = run_settled(strategies, Duration::from_millis(200)).await;
        assert_eq!(settled, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_merge_dedups_across_tiers_by_filename() {
        let tier_a = vec![
            "https://cdn-a.example.com/dog-photo-0001.jpg".to_string(),
            "https://cdn-a.example.com/dog-photo-0002.jpg".to_string(),
        ];
        let tier_b = vec![
            "https://cdn-b.example.net/mirror/dog-photo-0001.jpg".to_string(),
            "https://cdn-b.example.net/dog-photo-0003.jpg".to_string(),
        ];
        let merged = merge_tiers(vec![tier_a, tier_b], std::clone::Clone::clone, 10);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_respects_global_cap() {
        let tier: Vec<String> = (0..30)
            .map(|i| format!("https://cdn.example.com/unique-photo-{i:04}.jpg"))
            .collect();
        assert_eq!(merge_tiers(vec![tier], std::clone::Clone::clone, 20).len(), 20);
    }

    #[test]
    fn test_merge_identical_sets_across_hosts() {
        // Five records, then the same five under different hosts with
        // identical long filenames: exactly five survive.
        let tier_a: Vec<String> = (0..5)
            .map(|i| format!("https://host-a.example.com/asset-file-{i:04}.jpg"))
            .collect();
        let tier_b: Vec<String> = (0..5)
            .map(|i| format!("https://host-b.example.net/other/asset-file-{i:04}.jpg"))
            .collect();
        let merged = merge_tiers(vec![tier_a, tier_b], std::clone::Clone::clone, 24);
        assert_eq!(merged.len(), 5);
    }
}
