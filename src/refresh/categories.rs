// src/refresh/categories.rs

//! Deciding which classifications a run should rescan.

use chrono::{Local, NaiveDateTime};
use std::collections::HashSet;

use crate::config::PluginConfig;
use crate::error::{ConfigError, RefreshResult};
use crate::history::{HistorySource, MediaKind, TransferRecord};
use crate::zspace::Classification;

/// Classifications targeted by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelection {
    /// Every classification the server lists.
    All,
    /// Only these names, in order.
    Named(Vec<String>),
}

impl CategorySelection {
    pub fn is_empty(&self) -> bool {
        matches!(self, CategorySelection::Named(names) if names.is_empty())
    }

    /// Names to refresh once the server's directory is known.
    pub fn resolve(&self, directory: &[Classification]) -> Vec<String> {
        match self {
            CategorySelection::All => directory.iter().map(|c| c.name.clone()).collect(),
            CategorySelection::Named(names) => names.clone(),
        }
    }
}

/// Split a `,` or `，` separated name list, dropping blanks.
pub fn split_category_list(raw: &str) -> Vec<String> {
    raw.replace('，', ",")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Successful transfers whose destination sits under `prefix`.
pub fn filter_records<'a>(records: &'a [TransferRecord], prefix: &str) -> Vec<&'a TransferRecord> {
    records
        .iter()
        .filter(|r| r.is_success())
        .filter(|r| r.dest.as_deref().is_some_and(|d| d.starts_with(prefix)))
        .collect()
}

fn categories_for(kind: MediaKind, config: &PluginConfig) -> Vec<String> {
    match kind {
        MediaKind::Movie => split_category_list(&config.movie_categories),
        MediaKind::Show => split_category_list(&config.show_categories),
        MediaKind::Other => Vec::new(),
    }
}

pub async fn determine_categories(
    config: &PluginConfig,
    history: &dyn HistorySource,
) -> RefreshResult<CategorySelection> {
    determine_categories_at(config, history, Local::now().naive_local()).await
}

/// Same as [`determine_categories`] with an explicit "now".
pub async fn determine_categories_at(
    config: &PluginConfig,
    history: &dyn HistorySource,
    now: NaiveDateTime,
) -> RefreshResult<CategorySelection> {
    if config.refresh_all {
        return Ok(CategorySelection::All);
    }

    let prefix = config.path_prefix()?;
    let cutoff = now
        .checked_sub_signed(config.window_duration()?)
        .ok_or_else(|| ConfigError::WindowOutOfRange {
            window: config.window,
            unit: config.unit.clone(),
        })?;

    let records = history.list_since(cutoff).await?;
    if records.is_empty() {
        log::info!(
            "Refresh: no transfers in the last {} {}(s)",
            config.window,
            config.unit
        );
        return Ok(CategorySelection::Named(Vec::new()));
    }

    let matching = filter_records(&records, prefix);
    if matching.is_empty() {
        log::info!(
            "Refresh: no transfers under {} in the last {} {}(s)",
            prefix,
            config.window,
            config.unit
        );
        return Ok(CategorySelection::Named(Vec::new()));
    }

    let kinds: HashSet<MediaKind> = matching.iter().map(|r| r.kind).collect();
    let mut seen = HashSet::new();
    let names: Vec<String> = [MediaKind::Movie, MediaKind::Show]
        .into_iter()
        .filter(|k| kinds.contains(k))
        .flat_map(|k| categories_for(k, config))
        .filter(|name| seen.insert(name.clone()))
        .collect();

    log::info!(
        "Refresh: {} transfer(s) under {} in the last {} {}(s), classifications to refresh: {:?}",
        matching.len(),
        prefix,
        config.window,
        config.unit,
        names
    );
    Ok(CategorySelection::Named(names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefreshError;
    use crate::history::InMemoryHistory;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn record(kind: MediaKind, status: i64, dest: Option<&str>, age: Duration) -> TransferRecord {
        TransferRecord {
            kind,
            status,
            dest: dest.map(str::to_string),
            date: now() - age,
        }
    }

    fn config() -> PluginConfig {
        PluginConfig {
            path_prefix: Some("/cloud".into()),
            movie_categories: "Movies，Kids, ".into(),
            show_categories: "Shows,Kids".into(),
            ..PluginConfig::default()
        }
    }

    #[test]
    fn test_split_category_list() {
        assert_eq!(split_category_list("A，B,C"), vec!["A", "B", "C"]);
        assert_eq!(split_category_list(" A , ,B "), vec!["A", "B"]);
        assert!(split_category_list("").is_empty());
    }

    #[test]
    fn test_filter_excludes_failed_and_foreign_paths() {
        let records = vec![
            record(MediaKind::Movie, 1, Some("/cloud/m.mkv"), Duration::hours(1)),
            record(MediaKind::Movie, 0, Some("/cloud/failed.mkv"), Duration::hours(1)),
            record(MediaKind::Show, 1, Some("/local/s.mkv"), Duration::hours(1)),
            record(MediaKind::Show, 1, None, Duration::hours(1)),
        ];
        let kept = filter_records(&records, "/cloud");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].dest.as_deref(), Some("/cloud/m.mkv"));
    }

    #[tokio::test]
    async fn test_refresh_all_skips_history() {
        let config = PluginConfig {
            refresh_all: true,
            unit: "fortnight".into(),
            ..PluginConfig::default()
        };
        let selection = determine_categories_at(&config, &InMemoryHistory::default(), now())
            .await
            .unwrap();
        assert_eq!(selection, CategorySelection::All);
    }

    #[tokio::test]
    async fn test_one_day_window_boundary() {
        let history = InMemoryHistory::new(vec![
            record(MediaKind::Movie, 1, Some("/cloud/new.mkv"), Duration::hours(23)),
            record(MediaKind::Show, 1, Some("/cloud/old.mkv"), Duration::hours(25)),
        ]);
        let selection = determine_categories_at(&config(), &history, now()).await.unwrap();
        assert_eq!(
            selection,
            CategorySelection::Named(vec!["Movies".into(), "Kids".into()])
        );
    }

    #[tokio::test]
    async fn test_both_kinds_union_without_duplicates() {
        let history = InMemoryHistory::new(vec![
            record(MediaKind::Show, 1, Some("/cloud/s.mkv"), Duration::minutes(5)),
            record(MediaKind::Movie, 1, Some("/cloud/m.mkv"), Duration::minutes(5)),
            record(MediaKind::Other, 1, Some("/cloud/x.mkv"), Duration::minutes(5)),
        ]);
        let selection = determine_categories_at(&config(), &history, now()).await.unwrap();
        assert_eq!(
            selection,
            CategorySelection::Named(vec!["Movies".into(), "Kids".into(), "Shows".into()])
        );
    }

    #[tokio::test]
    async fn test_nothing_recent_is_empty() {
        let history = InMemoryHistory::new(vec![record(
            MediaKind::Movie,
            1,
            Some("/cloud/m.mkv"),
            Duration::days(3),
        )]);
        let selection = determine_categories_at(&config(), &history, now()).await.unwrap();
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn test_kind_without_mapping_contributes_nothing() {
        let config = PluginConfig {
            movie_categories: String::new(),
            ..config()
        };
        let history = InMemoryHistory::new(vec![record(
            MediaKind::Movie,
            1,
            Some("/cloud/m.mkv"),
            Duration::hours(1),
        )]);
        let selection = determine_categories_at(&config, &history, now()).await.unwrap();
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn test_missing_prefix_and_bad_unit_fail_fast() {
        let no_prefix = PluginConfig {
            path_prefix: None,
            ..config()
        };
        let err = determine_categories_at(&no_prefix, &InMemoryHistory::default(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Config(ConfigError::MissingPathPrefix)));

        let bad_unit = PluginConfig {
            unit: "week".into(),
            ..config()
        };
        let err = determine_categories_at(&bad_unit, &InMemoryHistory::default(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Config(ConfigError::UnknownUnit(_))));
    }

    #[tokio::test]
    async fn test_huge_window_is_an_error_not_a_panic() {
        let config = PluginConfig {
            window: 200_000_000,
            unit: "day".into(),
            ..config()
        };
        let err = determine_categories_at(&config, &InMemoryHistory::default(), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RefreshError::Config(ConfigError::WindowOutOfRange { window: 200_000_000, .. })
        ));

        let widest = PluginConfig {
            window: u32::MAX,
            unit: "minute".into(),
            ..self::config()
        };
        assert!(determine_categories_at(&widest, &InMemoryHistory::default(), now())
            .await
            .is_ok());
    }

    #[test]
    fn test_resolve_all_against_directory() {
        let directory = vec![
            Classification {
                name: "Movies".into(),
                id: "1".into(),
            },
            Classification {
                name: "Shows".into(),
                id: "2".into(),
            },
        ];
        assert_eq!(CategorySelection::All.resolve(&directory), vec!["Movies", "Shows"]);
        assert!(!CategorySelection::All.is_empty());
    }
}
