//! Criteria resolution against an in-memory snapshot.

use switcher_core::entry::Entry;
use switcher_core::error::SwitcherError;
use switcher_core::result::ResultDetail;
use switcher_core::snapshot::{Config, Snapshot};

use crate::operation::evaluate;
use crate::timed_match::TimedMatch;

/// Resolve a switcher key against the snapshot domain tree.
///
/// Walks domain → group → config → strategies. The first config whose key
/// matches wins; groups are scanned in order and keys are unique across
/// groups by invariant. Deactivation at any level short-circuits with a
/// disabled result.
///
/// # Errors
///
/// [`SwitcherError::SnapshotNotLoaded`] when `snapshot` is `None`;
/// [`SwitcherError::KeyNotFound`] when no config carries the key.
pub async fn check_criteria(
    snapshot: Option<&Snapshot>,
    key: &str,
    entries: &[Entry],
    matcher: &TimedMatch,
) -> Result<ResultDetail, SwitcherError> {
    let snapshot = snapshot.ok_or(SwitcherError::SnapshotNotLoaded)?;
    let domain = &snapshot.domain;

    if !domain.activated {
        return Ok(ResultDetail::disabled("Domain is disabled"));
    }

    for group in &domain.groups {
        if let Some(config) = group.configs.iter().find(|c| c.key == key) {
            if !group.activated {
                return Ok(ResultDetail::disabled("Group disabled"));
            }
            return check_config(config, entries, matcher).await;
        }
    }

    Err(SwitcherError::KeyNotFound(key.to_string()))
}

async fn check_config(
    config: &Config,
    entries: &[Entry],
    matcher: &TimedMatch,
) -> Result<ResultDetail, SwitcherError> {
    if !config.activated {
        return Ok(ResultDetail::disabled("Config disabled"));
    }

    for strategy_config in &config.strategies {
        if !strategy_config.activated {
            continue;
        }

        let Some(entry) = entries
            .iter()
            .find(|e| e.strategy == strategy_config.strategy)
        else {
            return Ok(ResultDetail::disabled(format!(
                "Strategy '{}' did not receive any input",
                strategy_config.strategy
            )));
        };

        if evaluate(strategy_config, &entry.input, matcher).await != Some(true) {
            return Ok(ResultDetail::disabled(format!(
                "Strategy '{}' does not agree",
                strategy_config.strategy
            )));
        }
    }

    Ok(ResultDetail::success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switcher_core::snapshot::{SnapshotDocument, StrategyKind};

    fn snapshot(json: &str) -> Snapshot {
        Snapshot::from_document(serde_json::from_str::<SnapshotDocument>(json).unwrap())
    }

    fn playground() -> Snapshot {
        snapshot(
            r#"{
                "data": {
                    "domain": {
                        "name": "Playground",
                        "version": 1,
                        "activated": true,
                        "group": [
                            {
                                "name": "Release 1",
                                "activated": true,
                                "config": [
                                    {
                                        "key": "FF2FOR2020",
                                        "activated": true,
                                        "strategies": [
                                            {
                                                "strategy": "VALUE_VALIDATION",
                                                "activated": true,
                                                "operation": "EXIST",
                                                "values": ["Japan"]
                                            }
                                        ]
                                    },
                                    {"key": "FF2FOR2021", "activated": true},
                                    {"key": "FF2FOR2022", "activated": false}
                                ]
                            },
                            {
                                "name": "Release 2",
                                "activated": false,
                                "config": [
                                    {"key": "FF2FOR2040", "activated": true}
                                ]
                            }
                        ]
                    }
                }
            }"#,
        )
    }

    fn entries(list: &[(StrategyKind, &str)]) -> Vec<Entry> {
        list.iter().map(|(s, i)| Entry::new(*s, *i)).collect()
    }

    #[tokio::test]
    async fn resolves_success_with_agreeing_strategy() {
        let matcher = TimedMatch::default();
        let input = entries(&[(StrategyKind::Value, "Japan")]);
        let detail = check_criteria(Some(&playground()), "FF2FOR2020", &input, &matcher)
            .await
            .unwrap();
        assert!(detail.result);
    }

    #[tokio::test]
    async fn resolves_success_without_strategies() {
        let matcher = TimedMatch::default();
        let detail = check_criteria(Some(&playground()), "FF2FOR2021", &[], &matcher)
            .await
            .unwrap();
        assert!(detail.result);
        assert_eq!(detail.reason.as_deref(), Some("Success"));
    }

    #[tokio::test]
    async fn missing_snapshot_is_an_error() {
        let matcher = TimedMatch::default();
        let err = check_criteria(None, "FF2FOR2020", &[], &matcher)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitcherError::SnapshotNotLoaded));
    }

    #[tokio::test]
    async fn disabled_domain_short_circuits() {
        let matcher = TimedMatch::default();
        let tree = snapshot(
            r#"{"data": {"domain": {"activated": false, "group": [
                {"activated": true, "config": [{"key": "ANY", "activated": true}]}
            ]}}}"#,
        );
        let detail = check_criteria(Some(&tree), "ANY", &[], &matcher).await.unwrap();
        assert!(!detail.result);
        assert_eq!(detail.reason.as_deref(), Some("Domain is disabled"));
    }

    #[tokio::test]
    async fn disabled_group_short_circuits() {
        let matcher = TimedMatch::default();
        let detail = check_criteria(Some(&playground()), "FF2FOR2040", &[], &matcher)
            .await
            .unwrap();
        assert!(!detail.result);
        assert_eq!(detail.reason.as_deref(), Some("Group disabled"));
    }

    #[tokio::test]
    async fn disabled_config_short_circuits() {
        let matcher = TimedMatch::default();
        let detail = check_criteria(Some(&playground()), "FF2FOR2022", &[], &matcher)
            .await
            .unwrap();
        assert!(!detail.result);
        assert_eq!(detail.reason.as_deref(), Some("Config disabled"));
    }

    #[tokio::test]
    async fn unknown_key_is_an_error() {
        let matcher = TimedMatch::default();
        let err = check_criteria(Some(&playground()), "UNKNOWN", &[], &matcher)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitcherError::KeyNotFound(key) if key == "UNKNOWN"));
    }

    #[tokio::test]
    async fn strategy_without_input_reports_missing_entry() {
        let matcher = TimedMatch::default();
        let detail = check_criteria(Some(&playground()), "FF2FOR2020", &[], &matcher)
            .await
            .unwrap();
        assert!(!detail.result);
        assert_eq!(
            detail.reason.as_deref(),
            Some("Strategy 'VALUE_VALIDATION' did not receive any input")
        );
    }

    #[tokio::test]
    async fn strategy_that_disagrees_reports_it() {
        let matcher = TimedMatch::default();
        let input = entries(&[(StrategyKind::Value, "Brazil")]);
        let detail = check_criteria(Some(&playground()), "FF2FOR2020", &input, &matcher)
            .await
            .unwrap();
        assert!(!detail.result);
        assert_eq!(
            detail.reason.as_deref(),
            Some("Strategy 'VALUE_VALIDATION' does not agree")
        );
    }

    #[tokio::test]
    async fn deactivated_strategy_is_skipped() {
        let matcher = TimedMatch::default();
        let tree = snapshot(
            r#"{"data": {"domain": {"activated": true, "group": [
                {"activated": true, "config": [{
                    "key": "SKIPPED",
                    "activated": true,
                    "strategies": [{
                        "strategy": "VALUE_VALIDATION",
                        "activated": false,
                        "operation": "EXIST",
                        "values": ["Japan"]
                    }]
                }]}
            ]}}}"#,
        );
        let detail = check_criteria(Some(&tree), "SKIPPED", &[], &matcher).await.unwrap();
        assert!(detail.result);
    }

    #[tokio::test]
    async fn first_group_wins_on_duplicate_keys() {
        let matcher = TimedMatch::default();
        let tree = snapshot(
            r#"{"data": {"domain": {"activated": true, "group": [
                {"name": "first", "activated": true, "config": [{"key": "DUP", "activated": true}]},
                {"name": "second", "activated": true, "config": [{"key": "DUP", "activated": false}]}
            ]}}}"#,
        );
        let detail = check_criteria(Some(&tree), "DUP", &[], &matcher).await.unwrap();
        // The second group's deactivated copy is never considered.
        assert!(detail.result);
    }

    #[tokio::test]
    async fn all_active_strategies_must_agree() {
        let matcher = TimedMatch::default();
        let tree = snapshot(
            r#"{"data": {"domain": {"activated": true, "group": [
                {"activated": true, "config": [{
                    "key": "COMBINED",
                    "activated": true,
                    "strategies": [
                        {
                            "strategy": "VALUE_VALIDATION",
                            "activated": true,
                            "operation": "EXIST",
                            "values": ["Japan"]
                        },
                        {
                            "strategy": "NETWORK_VALIDATION",
                            "activated": true,
                            "operation": "EXIST",
                            "values": ["10.0.0.0/24"]
                        }
                    ]
                }]}
            ]}}}"#,
        );

        let agreeing = entries(&[
            (StrategyKind::Value, "Japan"),
            (StrategyKind::Network, "10.0.0.3"),
        ]);
        assert!(
            check_criteria(Some(&tree), "COMBINED", &agreeing, &matcher)
                .await
                .unwrap()
                .result
        );

        let outside = entries(&[
            (StrategyKind::Value, "Japan"),
            (StrategyKind::Network, "192.168.0.1"),
        ]);
        let detail = check_criteria(Some(&tree), "COMBINED", &outside, &matcher)
            .await
            .unwrap();
        assert!(!detail.result);
        assert_eq!(
            detail.reason.as_deref(),
            Some("Strategy 'NETWORK_VALIDATION' does not agree")
        );
    }
}
