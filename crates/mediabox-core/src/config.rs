use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::format_spec::{FormatPresets, OutputType};

/// Worker process settings (optional `[worker]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker executable; if missing, the server re-runs itself with `worker`.
    #[serde(default)]
    pub program: Option<PathBuf>,
    /// Arguments placed before the request arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// How long a stop waits for the terminated worker to die, in milliseconds.
    pub stop_grace_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            stop_grace_ms: 100,
        }
    }
}

/// External downloader settings (optional `[downloader]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Downloader executable (`yt-dlp` or a compatible fork).
    pub program: String,
    /// Extra arguments passed on every invocation (e.g. `--cookies`).
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// Global configuration loaded from `~/.config/mediabox/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaboxConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: String,
    /// Output directory for video tasks (home directory if unset or invalid).
    #[serde(default)]
    pub video_dir: Option<PathBuf>,
    /// Output directory for audio tasks (home directory if unset or invalid).
    #[serde(default)]
    pub audio_dir: Option<PathBuf>,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub formats: FormatPresets,
}

impl Default for MediaboxConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8008".to_string(),
            video_dir: None,
            audio_dir: None,
            worker: WorkerConfig::default(),
            downloader: DownloaderConfig::default(),
            formats: FormatPresets::default(),
        }
    }
}

impl MediaboxConfig {
    pub fn stop_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.worker.stop_grace_ms)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mediabox")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MediaboxConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<MediaboxConfig> {
    if !path.exists() {
        let default_cfg = MediaboxConfig::default();
        save_at(path, &default_cfg)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: MediaboxConfig = toml::from_str(&data)?;
    Ok(cfg)
}

fn save_at(path: &Path, cfg: &MediaboxConfig) -> Result<()> {
    let toml = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml)?;
    Ok(())
}

/// Response to an output directory update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirUpdate {
    /// 200 stored, 201 rejected (previous kept), 500 rejected (reset to `/`).
    pub code: u16,
    pub dir: PathBuf,
}

/// The configuration file plus the output-directory operations the server
/// needs at request time.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: MediaboxConfig,
}

impl ConfigStore {
    pub fn open_default() -> Result<Self> {
        Self::open_at(config_path()?)
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load_or_init_at(&path)?;
        Ok(Self { path, config })
    }

    pub fn config(&self) -> &MediaboxConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&mut self, output: OutputType) -> &mut Option<PathBuf> {
        match output {
            OutputType::Video => &mut self.config.video_dir,
            OutputType::Audio => &mut self.config.audio_dir,
        }
    }

    fn persist(&self) {
        if let Err(e) = save_at(&self.path, &self.config) {
            tracing::warn!(path = %self.path.display(), "could not save config: {:#}", e);
        }
    }

    /// Configured directory for `output`. An unset or no-longer-valid entry
    /// is replaced by the home directory (and saved).
    pub fn output_dir(&mut self, output: OutputType) -> PathBuf {
        if let Some(dir) = self.slot(output).as_ref() {
            if dir.is_dir() {
                return dir.clone();
            }
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        *self.slot(output) = Some(home.clone());
        self.persist();
        home
    }

    /// Directory for `output` as configured, without validation or fallback.
    pub fn configured_dir(&self, output: OutputType) -> Option<&Path> {
        match output {
            OutputType::Video => self.config.video_dir.as_deref(),
            OutputType::Audio => self.config.audio_dir.as_deref(),
        }
    }

    /// Store `new_dir` for `output` if it is a directory. Otherwise keep a
    /// still-valid previous value (code 201) or reset to `/` (code 500).
    pub fn update_dir(&mut self, output: OutputType, new_dir: &Path) -> DirUpdate {
        let update = if new_dir.is_dir() {
            *self.slot(output) = Some(new_dir.to_path_buf());
            self.persist();
            DirUpdate {
                code: 200,
                dir: new_dir.to_path_buf(),
            }
        } else if let Some(old) = self.slot(output).clone().filter(|d| d.is_dir()) {
            DirUpdate { code: 201, dir: old }
        } else {
            let root = PathBuf::from(std::path::MAIN_SEPARATOR_STR);
            *self.slot(output) = Some(root.clone());
            self.persist();
            DirUpdate {
                code: 500,
                dir: root,
            }
        };
        tracing::debug!(?output, dir = %update.dir.display(), code = update.code, "updated directory");
        update
    }
}
