//! Format selection: turning a task form's output type, resolution and
//! quality fields into the selector string handed to the downloader.

use serde::{Deserialize, Serialize};

/// Key that marks an explicit variant in a resolution/quality field, as
/// produced by [`crate::formats::FormatOption::selector`].
pub const FORMAT_ID_KEY: &str = "format_id=";

const VIDEO_RESOLUTIONS: [&str; 3] = ["1080", "720", "480"];
const AUDIO_QUALITIES: [&str; 2] = ["best", "worst"];

/// Kind of output a task produces; also picks the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Video,
    Audio,
}

impl std::str::FromStr for OutputType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "video" => Ok(OutputType::Video),
            "audio" => Ok(OutputType::Audio),
            _ => Err(()),
        }
    }
}

/// Downloader format selector. Empty means "let the downloader decide".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatSpec(String);

impl FormatSpec {
    pub fn new(selector: impl Into<String>) -> Self {
        FormatSpec(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_default() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Preset selectors (optional `[formats]` section in config.toml).
///
/// The video preset's `720` is replaced with the requested resolution; the
/// audio preset's `best` is replaced with the requested quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPresets {
    pub video: String,
    pub audio: String,
}

impl Default for FormatPresets {
    fn default() -> Self {
        Self {
            video: "bestvideo[ext=mp4][height<=720][vcodec!~=av01]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]"
                .to_string(),
            audio: "bestaudio[ext=m4a][acodec!~=opus]/best".to_string(),
        }
    }
}

impl FormatPresets {
    /// Build the selector for one task.
    ///
    /// A `format_id=<id>` token in `resolution` (video) or `quality` (audio)
    /// selects that exact variant; otherwise the preset is used when the
    /// value is one of the supported resolutions/qualities, else the
    /// downloader default.
    pub fn build(&self, output: OutputType, resolution: &str, quality: &str) -> FormatSpec {
        let video_id = selector_arg(resolution, FORMAT_ID_KEY);
        let audio_id = selector_arg(quality, FORMAT_ID_KEY);
        let resolution = resolution.trim();
        let quality = quality.trim();

        match output {
            OutputType::Video => match (video_id, audio_id) {
                (Some(v), Some(a)) => FormatSpec::new(format!("{v}+{a}")),
                (Some(v), None) => FormatSpec::new(format!("{v}+bestaudio/{v}")),
                (None, Some(a)) => FormatSpec::new(format!("bestvideo+{a}")),
                (None, None) if VIDEO_RESOLUTIONS.contains(&resolution) => {
                    FormatSpec::new(self.video.replace("720", resolution))
                }
                (None, None) => FormatSpec::default(),
            },
            OutputType::Audio => match audio_id {
                Some(a) => FormatSpec::new(a),
                None if AUDIO_QUALITIES.contains(&quality) => {
                    FormatSpec::new(self.audio.replace("best", quality))
                }
                None => FormatSpec::default(),
            },
        }
    }
}

/// Value following `key` up to the next comma, if present and non-empty.
pub fn selector_arg<'a>(input: &'a str, key: &str) -> Option<&'a str> {
    let start = input.find(key)? + key.len();
    let rest = &input[start..];
    let value = rest.split(',').next().unwrap_or("").trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
