#![forbid(unsafe_code)]

//! Values passed into and returned from the pipeline. All of them are created
//! fresh for each run.

use crate::duration;
use crate::error::{PipelineError, PipelineResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MAX_RESULTS: usize = 50;

/// A resolved channel. `display_name` is only a label and need not be unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: String,
    pub display_name: String,
}

/// How the caller identifies the channel to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelInput {
    /// Trusted as-is; no lookup until the uploads collection is resolved.
    Id(String),
    /// Free text sent to the search endpoint; the first hit wins.
    Name(String),
}

impl ChannelInput {
    /// Channel ids are `UC` followed by 22 url-safe base64 characters.
    pub fn guess(value: &str) -> Self {
        let trimmed = value.trim();
        let looks_like_id = trimmed.len() == 24
            && trimmed.starts_with("UC")
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if looks_like_id {
            ChannelInput::Id(trimmed.to_string())
        } else {
            ChannelInput::Name(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_seconds: u64,
    /// Zero-padded UTC timestamp; plain string comparison orders it correctly.
    pub published_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl VideoSummary {
    pub fn is_short(&self) -> bool {
        duration::is_short(self.duration_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    YearInTitleAscending,
    YearInTitleDescending,
    DurationDescending,
    DurationAscending,
    Random,
}

impl SortOrder {
    pub const ALL: [SortOrder; 7] = [
        SortOrder::NewestFirst,
        SortOrder::OldestFirst,
        SortOrder::YearInTitleAscending,
        SortOrder::YearInTitleDescending,
        SortOrder::DurationDescending,
        SortOrder::DurationAscending,
        SortOrder::Random,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "newest",
            SortOrder::OldestFirst => "oldest",
            SortOrder::YearInTitleAscending => "year-asc",
            SortOrder::YearInTitleDescending => "year-desc",
            SortOrder::DurationDescending => "longest",
            SortOrder::DurationAscending => "shortest",
            SortOrder::Random => "random",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" | "newest-first" | "date-desc" => Ok(SortOrder::NewestFirst),
            "oldest" | "oldest-first" | "date-asc" => Ok(SortOrder::OldestFirst),
            "year-asc" | "year-in-title-ascending" => Ok(SortOrder::YearInTitleAscending),
            "year-desc" | "year-in-title-descending" => Ok(SortOrder::YearInTitleDescending),
            "longest" | "duration-desc" | "duration-descending" => {
                Ok(SortOrder::DurationDescending)
            }
            "shortest" | "duration-asc" | "duration-ascending" => Ok(SortOrder::DurationAscending),
            "random" | "shuffle" => Ok(SortOrder::Random),
            _ => Err(PipelineError::invalid_input(format!(
                "unknown sort order: {value}"
            ))),
        }
    }
}

/// Request parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSortConfig {
    pub order: SortOrder,
    pub keyword: Option<String>,
    pub min_duration_minutes: Option<f64>,
    pub include_shorts: bool,
    pub max_results: usize,
}

impl Default for FilterSortConfig {
    fn default() -> Self {
        Self {
            order: SortOrder::default(),
            keyword: None,
            min_duration_minutes: None,
            include_shorts: false,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl FilterSortConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.max_results == 0 {
            return Err(PipelineError::invalid_input(
                "max results must be a positive number",
            ));
        }
        if let Some(minutes) = self.min_duration_minutes
            && (!minutes.is_finite() || minutes < 0.0)
        {
            return Err(PipelineError::invalid_input(format!(
                "minimum duration must be a non-negative number of minutes, got {minutes}"
            )));
        }
        Ok(())
    }

    /// Keyword to match, or `None` when the filter is disabled.
    pub fn active_keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .filter(|keyword| !keyword.is_empty())
    }
}
