#![forbid(unsafe_code)]

//! Filtering, ordering, and truncation applied once every detail record has
//! been fetched.

use crate::model::{FilterSortConfig, SortOrder, VideoSummary};
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use std::cmp::Reverse;
use std::sync::OnceLock;

/// Shorts and minimum-duration exclusions. Also applied per record while
/// chunks arrive so large channels never hold discarded records.
pub fn passes_duration_filter(duration_seconds: u64, config: &FilterSortConfig) -> bool {
    if !config.include_shorts && crate::duration::is_short(duration_seconds) {
        return false;
    }
    if let Some(minutes) = config.min_duration_minutes
        && (duration_seconds as f64) < minutes * 60.0
    {
        return false;
    }
    true
}

/// Case-insensitive plain substring match on title or description.
pub fn matches_keyword(video: &VideoSummary, keyword: &str) -> bool {
    let needle = keyword.to_lowercase();
    video.title.to_lowercase().contains(&needle)
        || video.description.to_lowercase().contains(&needle)
}

pub fn filter_by_keyword(videos: Vec<VideoSummary>, keyword: Option<&str>) -> Vec<VideoSummary> {
    match keyword.filter(|keyword| !keyword.is_empty()) {
        Some(keyword) => videos
            .into_iter()
            .filter(|video| matches_keyword(video, keyword))
            .collect(),
        None => videos,
    }
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").expect("year pattern compiles")
    })
}

/// Leftmost `19xx`/`20xx` run of exactly four ASCII digits in a title. Letters,
/// underscores, and CJK text may touch it; other ASCII digits may not.
pub fn title_year(title: &str) -> Option<u16> {
    year_pattern()
        .captures(title)
        .and_then(|captures| captures.get(1))
        .and_then(|year| year.as_str().parse().ok())
}

/// Sorts in place. Every order except `Random` is a stable sort, so equal keys
/// keep their fetch order and repeated runs agree.
pub fn sort_videos<R: Rng + ?Sized>(videos: &mut [VideoSummary], order: SortOrder, rng: &mut R) {
    match order {
        SortOrder::NewestFirst => videos.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortOrder::OldestFirst => videos.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
        // Titles without a year go last in both directions.
        SortOrder::YearInTitleAscending => videos.sort_by_cached_key(|video| {
            let year = title_year(&video.title);
            (year.is_none(), year)
        }),
        SortOrder::YearInTitleDescending => videos.sort_by_cached_key(|video| {
            let year = title_year(&video.title);
            (year.is_none(), Reverse(year))
        }),
        SortOrder::DurationDescending => {
            videos.sort_by(|a, b| b.duration_seconds.cmp(&a.duration_seconds))
        }
        SortOrder::DurationAscending => {
            videos.sort_by(|a, b| a.duration_seconds.cmp(&b.duration_seconds))
        }
        SortOrder::Random => videos.shuffle(rng),
    }
}

/// Keyword filter, sort, then cap. Duration exclusions are applied here too so
/// the function stands on its own for pre-collected lists.
pub fn rank_videos<R: Rng + ?Sized>(
    videos: Vec<VideoSummary>,
    config: &FilterSortConfig,
    rng: &mut R,
) -> Vec<VideoSummary> {
    let videos: Vec<VideoSummary> = videos
        .into_iter()
        .filter(|video| passes_duration_filter(video.duration_seconds, config))
        .collect();
    let mut videos = filter_by_keyword(videos, config.active_keyword());
    sort_videos(&mut videos, config.order, rng);
    videos.truncate(config.max_results);
    videos
}
