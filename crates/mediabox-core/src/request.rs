//! What a job downloads and where; passed verbatim to each worker process.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::format_spec::FormatSpec;

/// Identity and parameters of one download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Unique key of the job, e.g. the source URL.
    pub source_id: String,
    pub format: FormatSpec,
    pub output_dir: PathBuf,
    /// Playlist subset such as `1-3,7`; empty for all items.
    pub item_range: String,
}

impl DownloadRequest {
    pub fn new(source_id: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            format: FormatSpec::default(),
            output_dir: output_dir.into(),
            item_range: String::new(),
        }
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.format = format;
        self
    }

    pub fn with_item_range(mut self, item_range: impl Into<String>) -> Self {
        self.item_range = item_range.into();
        self
    }

    /// Arguments understood by the `worker` subcommand. Values are attached
    /// with `=` so ids and paths starting with `-` are not read as flags.
    pub fn to_worker_args(&self) -> Vec<OsString> {
        let mut args = vec![
            option_arg("--source", self.source_id.as_ref()),
            option_arg("--dir", self.output_dir.as_os_str()),
        ];
        if !self.format.is_default() {
            args.push(option_arg("--format", self.format.as_str().as_ref()));
        }
        if !self.item_range.trim().is_empty() {
            args.push(option_arg("--items", self.item_range.trim().as_ref()));
        }
        args
    }
}

fn option_arg(name: &str, value: &OsStr) -> OsString {
    let mut arg = OsString::with_capacity(name.len() + 1 + value.len());
    arg.push(name);
    arg.push("=");
    arg.push(value);
    arg
}
