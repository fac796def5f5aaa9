use serde::{Deserialize, Serialize};

/// External downloader invocation.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FetcherConfig {
    /// Executable used for both metadata and downloads.
    #[serde(default = "default_program")]
    pub program: String,
    /// Prepended to the item id to form the page URL.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            url_prefix: default_url_prefix(),
            merge_output_format: default_merge_output_format(),
        }
    }
}

fn default_program() -> String {
    "yt-dlp".to_string()
}

fn default_url_prefix() -> String {
    "https://youtu.be/".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}
