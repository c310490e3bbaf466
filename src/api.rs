#![forbid(unsafe_code)]

//! YouTube Data API v3 client covering the four endpoints the pipeline needs:
//! channel search, channel lookup, uploads-playlist pagination, and batched
//! video details.
//!
//! Response types only model the fields that are read. Everything nested is
//! optional because the platform omits blocks freely (thumbnails on private
//! videos, `contentDetails` on upcoming premieres, the page cursor on the last
//! page).

use crate::duration::duration_seconds_or_zero;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{ChannelRef, FilterSortConfig, VideoSummary};
use crate::ranking::passes_duration_filter;
use crate::transport::Transport;
use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Server-enforced maximum for `playlistItems.list`.
pub const PLAYLIST_PAGE_SIZE: usize = 50;
/// Hard limit of ids per `videos.list` call.
pub const VIDEO_BATCH_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: SearchResultId,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_title: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    #[serde(default)]
    snippet: VideoSnippet,
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoSnippet {
    title: String,
    description: String,
    published_at: String,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

impl Thumbnails {
    /// Medium first, then default; neither is fine.
    fn display_url(&self) -> Option<String> {
        self.medium
            .as_ref()
            .or(self.default.as_ref())
            .map(|thumbnail| thumbnail.url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

impl VideoResource {
    fn into_summary(self) -> VideoSummary {
        let duration_seconds = duration_seconds_or_zero(
            &self.id,
            self.content_details
                .as_ref()
                .and_then(|details| details.duration.as_deref()),
        );
        let thumbnail_url = self.snippet.thumbnails.display_url();
        VideoSummary {
            id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            duration_seconds,
            published_at: self.snippet.published_at,
            thumbnail_url,
        }
    }
}

/// Thin, stateless client. The API key rides along as the `key` query
/// parameter on every request; the cancellation token is raced against every
/// call.
pub struct YouTubeClient<T> {
    transport: T,
    api_key: String,
    cancel: CancellationToken,
}

impl<T: Transport> YouTubeClient<T> {
    pub fn new(transport: T, api_key: impl Into<String>) -> PipelineResult<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(PipelineError::invalid_input("API key is empty"));
        }
        Ok(Self {
            transport,
            api_key,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fails with `Cancelled` once the caller abandoned the run.
    pub fn ensure_active(&self) -> PipelineResult<()> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn request<R: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
    ) -> PipelineResult<R> {
        self.ensure_active()?;
        query.push(("key", self.api_key.clone()));

        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.transport.get(path, &query) => result?,
        };

        serde_json::from_str(&body)
            .map_err(|err| PipelineError::malformed(format!("decoding {path} response: {err}")))
    }

    /// Searches channels by name and returns the first hit. No disambiguation.
    pub async fn search_channel(&self, name: &str) -> PipelineResult<ChannelRef> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PipelineError::invalid_input("channel name is empty"));
        }

        let response: SearchListResponse = self
            .request(
                "search",
                vec![
                    ("part", "snippet".to_string()),
                    ("type", "channel".to_string()),
                    ("q", name.to_string()),
                    ("maxResults", "1".to_string()),
                ],
            )
            .await?;

        response
            .items
            .into_iter()
            .find_map(|item| {
                let id = item.id.channel_id?;
                let display_name = item
                    .snippet
                    .and_then(|snippet| snippet.channel_title.or(snippet.title))
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| id.clone());
                Some(ChannelRef { id, display_name })
            })
            .ok_or_else(|| PipelineError::not_found(format!("no channel matches {name:?}")))
    }

    /// Resolves the channel's implicit "uploads" playlist.
    pub async fn uploads_playlist_id(&self, channel_id: &str) -> PipelineResult<String> {
        let channel_id = channel_id.trim();
        if channel_id.is_empty() {
            return Err(PipelineError::invalid_input("channel id is empty"));
        }

        let response: ChannelListResponse = self
            .request(
                "channels",
                vec![
                    ("part", "contentDetails".to_string()),
                    ("id", channel_id.to_string()),
                ],
            )
            .await?;

        let channel = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::not_found(format!("channel {channel_id}")))?;

        channel
            .content_details
            .and_then(|details| details.related_playlists)
            .and_then(|playlists| playlists.uploads)
            .filter(|uploads| !uploads.is_empty())
            .ok_or_else(|| {
                PipelineError::malformed(format!(
                    "channel {channel_id} has no contentDetails.relatedPlaylists.uploads"
                ))
            })
    }

    /// Walks every page of the playlist and returns member ids in encounter
    /// order. An empty playlist is an empty list.
    pub async fn playlist_video_ids(&self, playlist_id: &str) -> PipelineResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut query = vec![
                ("part", "contentDetails".to_string()),
                ("playlistId", playlist_id.to_string()),
                ("maxResults", PLAYLIST_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: PlaylistItemListResponse = match self.request("playlistItems", query).await
            {
                Ok(page) => page,
                // Channels that never uploaded answer 404 playlistNotFound.
                Err(PipelineError::Upstream(err))
                    if pages == 0
                        && err.status == Some(404)
                        && err.has_reason("playlistNotFound") =>
                {
                    debug!("uploads playlist {playlist_id} does not exist yet; treating as empty");
                    return Ok(ids);
                }
                Err(err) => return Err(err),
            };
            pages += 1;

            let before = ids.len();
            for item in page.items {
                match item.content_details.and_then(|details| details.video_id) {
                    Some(video_id) => ids.push(video_id),
                    None => warn!("playlist {playlist_id} returned an item without a video id"),
                }
            }
            debug!(
                "playlist {playlist_id} page {pages}: {} ids ({} total)",
                ids.len() - before,
                ids.len()
            );

            page_token = page.next_page_token.filter(|token| !token.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    /// Fetches details in chunks of `VIDEO_BATCH_SIZE`, keeping chunk order and
    /// the requested order inside each chunk. Shorts and too-short videos are
    /// dropped as records arrive. Any failed chunk fails the whole call.
    pub async fn video_details(
        &self,
        video_ids: &[String],
        config: &FilterSortConfig,
    ) -> PipelineResult<Vec<VideoSummary>> {
        let mut summaries = Vec::new();

        for (index, chunk) in video_ids.chunks(VIDEO_BATCH_SIZE).enumerate() {
            let response: VideoListResponse = self
                .request(
                    "videos",
                    vec![
                        ("part", "snippet,contentDetails".to_string()),
                        ("id", chunk.join(",")),
                        ("maxResults", VIDEO_BATCH_SIZE.to_string()),
                    ],
                )
                .await?;

            let positions: HashMap<&str, usize> = chunk
                .iter()
                .enumerate()
                .map(|(position, id)| (id.as_str(), position))
                .collect();
            let mut records: Vec<(usize, VideoSummary)> = response
                .items
                .into_iter()
                .filter_map(|resource| {
                    let position = *positions.get(resource.id.as_str())?;
                    Some((position, resource.into_summary()))
                })
                .collect();
            records.sort_by_key(|(position, _)| *position);

            let received = records.len();
            summaries.extend(
                records
                    .into_iter()
                    .map(|(_, summary)| summary)
                    .filter(|summary| passes_duration_filter(summary.duration_seconds, config)),
            );
            debug!(
                "details chunk {}: requested {}, received {received}",
                index + 1,
                chunk.len()
            );
        }

        Ok(summaries)
    }
}
