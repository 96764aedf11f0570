//! Format negotiation: list the selectable video and audio variants of a
//! source before a job is created.

use serde::{Deserialize, Serialize};

use crate::fetcher::MediaFetcher;

/// One encoded variant offered by a source, as reported by the downloader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormatVariant {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl FormatVariant {
    pub fn is_video(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some(v) if v != "none")
    }

    /// Audio-bearing variant without video: `acodec` missing or not "none".
    pub fn is_audio(&self) -> bool {
        !self.is_video() && self.acodec.as_deref() != Some("none")
    }
}

/// A variant plus the selector string a client posts back to pick it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOption {
    pub selector: String,
    #[serde(flatten)]
    pub variant: FormatVariant,
}

impl FormatOption {
    fn video(variant: FormatVariant) -> Self {
        let selector = join_fields(&[
            ("format_id", Some(variant.format_id.clone())),
            ("format", variant.format.clone()),
            ("fps", variant.fps.map(|f| f.to_string())),
            ("protocol", variant.protocol.clone()),
            ("vcodec", variant.vcodec.clone()),
            ("ext", variant.ext.clone()),
        ]);
        Self { selector, variant }
    }

    fn audio(variant: FormatVariant) -> Self {
        let selector = join_fields(&[
            ("format_id", Some(variant.format_id.clone())),
            ("format", variant.format.clone()),
            ("protocol", variant.protocol.clone()),
            ("ext", variant.ext.clone()),
        ]);
        Self { selector, variant }
    }
}

fn join_fields(fields: &[(&str, Option<String>)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v.as_deref().unwrap_or("None")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Variants split by kind, in the order the downloader listed them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatList {
    pub video_variants: Vec<FormatOption>,
    pub audio_variants: Vec<FormatOption>,
}

impl FormatList {
    pub fn from_variants(variants: impl IntoIterator<Item = FormatVariant>) -> Self {
        let mut list = FormatList::default();
        for v in variants {
            if v.is_video() {
                list.video_variants.push(FormatOption::video(v));
            } else if v.is_audio() {
                list.audio_variants.push(FormatOption::audio(v));
            }
        }
        list
    }

    pub fn is_empty(&self) -> bool {
        self.video_variants.is_empty() && self.audio_variants.is_empty()
    }
}

/// List the variants of `source_id`. Any failure (unreachable source, no
/// formats, missing downloader) is logged and yields an empty list.
pub fn negotiate(fetcher: &dyn MediaFetcher, source_id: &str) -> FormatList {
    match fetcher.probe_formats(source_id) {
        Ok(variants) => {
            let list = FormatList::from_variants(variants);
            tracing::info!(
                source_id,
                video = list.video_variants.len(),
                audio = list.audio_variants.len(),
                "available formats"
            );
            list
        }
        Err(e) => {
            tracing::error!(source_id, "format probe failed: {}", e);
            FormatList::default()
        }
    }
}
