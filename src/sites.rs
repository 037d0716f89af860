//! Per-site merge presets.
//!
//! Each scraped site gets a canonical merge configuration: which feed
//! directory to read, what identifies a row, and how cleaned output is
//! shaped. Presets layer site-specific overrides over shared defaults, with
//! explicit path or key overrides always winning.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::errors::MergeError;
use crate::key::KeyExpr;
use crate::merge::MergeConfig;
use crate::schema::ItemType;

/// Sites covered by an `all` run, in merge order. `bgg` comes last because
/// its three item types dominate the runtime.
pub const ALL_SITES: [&str; 6] = [
    "bgg_hotness",
    "dbpedia",
    "luding",
    "spielen",
    "wikidata",
    "bgg",
];

const CLEAN_EXCLUDE: [&str; 3] = ["published_at", "updated_at", "scraped_at"];
const CLEAN_EXCLUDE_BGG_SOCIAL: [&str; 2] = ["published_at", "scraped_at"];
const HOTNESS_CLEAN_INCLUDE: [&str; 7] = [
    "published_at",
    "rank",
    "add_rank",
    "bgg_id",
    "name",
    "year",
    "image_url",
];

/// Run-level inputs shared by every preset.
#[derive(Debug, Clone)]
pub struct PresetOptions {
    pub item: ItemType,
    /// Explicit input files or directories; empty means the site's feed
    /// directory.
    pub in_paths: Vec<PathBuf>,
    pub out_path: Option<PathBuf>,
    pub clean_results: bool,
    pub latest_min_days: Option<f64>,
    pub feeds_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Wall clock, injected so output names and cutoffs are reproducible.
    pub now: DateTime<Utc>,
}

/// Site-specific choices layered over [`with_defaults`].
#[derive(Debug, Clone, Default)]
struct Overrides {
    key_cols: Option<Vec<KeyExpr>>,
    sort_fields: Option<Vec<KeyExpr>>,
    /// Outer `Some` means the preset decided the exclusion list itself,
    /// possibly deciding there is none, pre-empting the clean-run default.
    fieldnames_exclude: Option<Option<Vec<String>>>,
    fieldnames_include: Option<Vec<String>>,
}

/// Build the merge configuration for one site and item type.
///
/// # Errors
///
/// Returns [`MergeError::UnsupportedSiteItem`] when a non-`bgg` site is asked
/// for anything other than games.
pub fn site_config(site: &str, opts: &PresetOptions) -> Result<MergeConfig, MergeError> {
    if site == "bgg" {
        return Ok(bgg_config(opts));
    }
    if opts.item != ItemType::Game {
        return Err(MergeError::UnsupportedSiteItem {
            site: site.to_owned(),
            item: opts.item.as_str(),
        });
    }
    if site == "bgg_hotness" {
        return Ok(bgg_hotness_config(opts));
    }
    Ok(with_defaults(site, opts, Overrides::default()))
}

/// Configurations for every known site, in [`ALL_SITES`] order; `bgg`
/// expands to all three item types. Path overrides never apply here: an
/// `all` run always uses the canonical feed layout.
pub fn all_sites_config(opts: &PresetOptions) -> Result<Vec<MergeConfig>, MergeError> {
    let base = PresetOptions {
        in_paths: Vec::new(),
        out_path: None,
        ..opts.clone()
    };
    let mut configs = Vec::new();
    for site in ALL_SITES {
        if site == "bgg" {
            for item in [ItemType::Game, ItemType::User, ItemType::Rating] {
                configs.push(site_config(site, &PresetOptions { item, ..base.clone() })?);
            }
        } else {
            configs.push(site_config(
                site,
                &PresetOptions {
                    item: ItemType::Game,
                    ..base.clone()
                },
            )?);
        }
    }
    Ok(configs)
}

fn bgg_config(opts: &PresetOptions) -> MergeConfig {
    let overrides = match opts.item {
        ItemType::Game => Overrides::default(),
        ItemType::User => Overrides {
            key_cols: Some(vec![KeyExpr::lowercase("bgg_user_name")]),
            fieldnames_exclude: opts
                .clean_results
                .then(|| Some(owned(&CLEAN_EXCLUDE_BGG_SOCIAL))),
            ..Overrides::default()
        },
        ItemType::Rating => Overrides {
            key_cols: Some(vec![
                KeyExpr::lowercase("bgg_user_name"),
                KeyExpr::column("bgg_id"),
            ]),
            fieldnames_exclude: opts
                .clean_results
                .then(|| Some(owned(&CLEAN_EXCLUDE_BGG_SOCIAL))),
            ..Overrides::default()
        },
    };
    with_defaults("bgg", opts, overrides)
}

/// The hotness feed is a time series: one row per (publication, game), never
/// collapsed across publications.
fn bgg_hotness_config(opts: &PresetOptions) -> MergeConfig {
    let overrides = Overrides {
        key_cols: Some(vec![
            KeyExpr::datetime("published_at"),
            KeyExpr::column("bgg_id"),
        ]),
        sort_fields: Some(vec![
            KeyExpr::datetime("published_at"),
            KeyExpr::column("rank"),
        ]),
        fieldnames_exclude: Some(None),
        fieldnames_include: opts.clean_results.then(|| owned(&HOTNESS_CLEAN_INCLUDE)),
    };
    with_defaults("bgg_hotness", opts, overrides)
}

fn with_defaults(site: &str, opts: &PresetOptions, overrides: Overrides) -> MergeConfig {
    let item = opts.item;
    let key_cols = overrides
        .key_cols
        .unwrap_or_else(|| vec![KeyExpr::column(format!("{site}_id"))]);
    let latest_min = opts
        .latest_min_days
        .filter(|days| *days > 0.0)
        .map(|days| latest_cutoff(opts.now, days));

    let in_paths = if opts.in_paths.is_empty() {
        vec![opts.feeds_dir.join(site).join(item.as_str())]
    } else {
        opts.in_paths.clone()
    };

    let (out_path, sort_fields, fieldnames_exclude) = if opts.clean_results {
        let out = opts.out_path.clone().unwrap_or_else(|| {
            opts.data_dir
                .join("scraped")
                .join(format!("{site}_{item}.jl"))
        });
        let sort = overrides.sort_fields.or_else(|| Some(key_cols.clone()));
        let exclude = overrides
            .fieldnames_exclude
            .unwrap_or_else(|| Some(owned(&CLEAN_EXCLUDE)));
        (out, sort, exclude)
    } else {
        let stamp = opts.now.format("%Y-%m-%dT%H-%M-%S");
        let out = opts.out_path.clone().unwrap_or_else(|| {
            opts.feeds_dir
                .join(site)
                .join(item.as_str())
                .join(format!("{stamp}-merged.jl"))
        });
        let exclude = overrides.fieldnames_exclude.flatten();
        (out, overrides.sort_fields, exclude)
    };

    MergeConfig {
        schema: item.schema(),
        in_paths,
        out_path,
        key_cols,
        latest_cols: vec![KeyExpr::datetime("scraped_at")],
        latest_min,
        sort_fields,
        sort_descending: false,
        fieldnames_include: overrides.fieldnames_include,
        fieldnames_exclude,
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "day fractions scale to whole seconds"
)]
fn latest_cutoff(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    now - Duration::seconds((days * 86_400.0) as i64)
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn opts(item: ItemType, clean: bool) -> PresetOptions {
        PresetOptions {
            item,
            in_paths: Vec::new(),
            out_path: None,
            clean_results: clean,
            latest_min_days: None,
            feeds_dir: PathBuf::from("feeds"),
            data_dir: PathBuf::from("data"),
            now: Utc
                .with_ymd_and_hms(2021, 4, 1, 12, 30, 5)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[rstest]
    #[case::dbpedia("dbpedia")]
    #[case::luding("luding")]
    #[case::spielen("spielen")]
    #[case::wikidata("wikidata")]
    fn default_key_is_site_id(#[case] site: &str) {
        let config = site_config(site, &opts(ItemType::Game, false)).expect("preset");
        assert_eq!(config.key_cols, vec![KeyExpr::column(format!("{site}_id"))]);
        assert_eq!(config.latest_cols, vec![KeyExpr::datetime("scraped_at")]);
        assert_eq!(
            config.in_paths,
            vec![PathBuf::from(format!("feeds/{site}/GameItem"))]
        );
    }

    #[test]
    fn non_bgg_sites_only_merge_games() {
        let err = site_config("luding", &opts(ItemType::Rating, false)).expect_err("unsupported");
        assert!(matches!(
            err,
            MergeError::UnsupportedSiteItem { site, item }
                if site == "luding" && item == "RatingItem"
        ));
    }

    #[test]
    fn timestamped_output_for_feed_merges() {
        let config = site_config("bgg", &opts(ItemType::Game, false)).expect("preset");
        assert_eq!(
            config.out_path,
            PathBuf::from("feeds/bgg/GameItem/2021-04-01T12-30-05-merged.jl")
        );
        assert!(config.sort_fields.is_none());
        assert!(config.fieldnames_exclude.is_none());
    }

    #[test]
    fn clean_runs_sort_by_key_and_strip_timestamps() {
        let config = site_config("bgg", &opts(ItemType::Game, true)).expect("preset");
        assert_eq!(config.out_path, PathBuf::from("data/scraped/bgg_GameItem.jl"));
        assert_eq!(config.sort_fields, Some(vec![KeyExpr::column("bgg_id")]));
        assert_eq!(
            config.fieldnames_exclude,
            Some(owned(&["published_at", "updated_at", "scraped_at"]))
        );
    }

    #[test]
    fn bgg_users_key_on_lowercased_names() {
        let config = site_config("bgg", &opts(ItemType::User, true)).expect("preset");
        assert_eq!(config.key_cols, vec![KeyExpr::lowercase("bgg_user_name")]);
        assert_eq!(
            config.fieldnames_exclude,
            Some(owned(&["published_at", "scraped_at"]))
        );
    }

    #[test]
    fn bgg_ratings_key_on_user_and_game() {
        let config = site_config("bgg", &opts(ItemType::Rating, false)).expect("preset");
        assert_eq!(
            config.key_cols,
            vec![
                KeyExpr::lowercase("bgg_user_name"),
                KeyExpr::column("bgg_id")
            ]
        );
        assert!(config.fieldnames_exclude.is_none());
    }

    #[test]
    fn hotness_keeps_every_publication() {
        let config = site_config("bgg_hotness", &opts(ItemType::Game, false)).expect("preset");
        assert_eq!(
            config.key_cols,
            vec![
                KeyExpr::datetime("published_at"),
                KeyExpr::column("bgg_id")
            ]
        );
        assert_eq!(
            config.sort_fields,
            Some(vec![
                KeyExpr::datetime("published_at"),
                KeyExpr::column("rank")
            ])
        );
        assert!(config.fieldnames_exclude.is_none());
        assert!(config.fieldnames_include.is_none());
    }

    #[test]
    fn hotness_clean_selects_ranking_columns() {
        let config = site_config("bgg_hotness", &opts(ItemType::Game, true)).expect("preset");
        assert_eq!(
            config.fieldnames_include,
            Some(owned(&HOTNESS_CLEAN_INCLUDE))
        );
        assert!(config.fieldnames_exclude.is_none());
    }

    #[test]
    fn latest_min_days_sets_a_cutoff() {
        let mut options = opts(ItemType::Game, false);
        options.latest_min_days = Some(30.0);
        let config = site_config("bgg", &options).expect("preset");
        let cutoff = Utc
            .with_ymd_and_hms(2021, 3, 2, 12, 30, 5)
            .single()
            .expect("valid timestamp");
        assert_eq!(config.latest_min, Some(cutoff));

        options.latest_min_days = Some(0.0);
        let config = site_config("bgg", &options).expect("preset");
        assert_eq!(config.latest_min, None);
    }

    #[test]
    fn all_sites_expand_bgg_item_types() {
        let configs = all_sites_config(&opts(ItemType::Game, false)).expect("presets");
        assert_eq!(configs.len(), 8);
        let outputs: Vec<_> = configs
            .iter()
            .map(|c| c.out_path.to_string_lossy().into_owned())
            .collect();
        assert!(
            outputs
                .iter()
                .any(|path| path.contains("bgg/RatingItem"))
        );
    }

    #[test]
    fn all_sites_ignore_path_overrides() {
        let mut options = opts(ItemType::Game, false);
        options.in_paths = vec![PathBuf::from("override.jl")];
        options.out_path = Some(PathBuf::from("override-out.jl"));
        let configs = all_sites_config(&options).expect("presets");
        assert!(
            configs
                .iter()
                .all(|c| c.in_paths != vec![PathBuf::from("override.jl")])
        );
        assert!(
            configs
                .iter()
                .all(|c| c.out_path != PathBuf::from("override-out.jl"))
        );
    }
}
