use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{entry::ItemMetadata, media::MediaDir};
use crate::{
    common::types::{ItemId, MediaFormat},
    configs::FetcherConfig,
};

const FIELD_SEPARATOR: &str = " ;22qi3mmwa7hfmn994433ki; ";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("unexpected metadata output: {0:?}")]
    Malformed(String),
    #[error("download finished but no media file was found")]
    NoOutput,
}

/// External source of item metadata and media files.
///
/// Failures are reported as `None`; the caller records them on the catalog
/// entry rather than surfacing them to clients.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_metadata(&self, id: &ItemId) -> Option<ItemMetadata>;

    /// Downloads the media for `id` and returns the container it landed in.
    async fn download(&self, id: &ItemId) -> Option<MediaFormat>;
}

/// Drives a yt-dlp compatible executable.
pub struct YtDlpFetcher {
    config: FetcherConfig,
    media: MediaDir,
}

impl YtDlpFetcher {
    pub fn new(config: FetcherConfig, media: MediaDir) -> Self {
        Self { config, media }
    }

    fn url(&self, id: &ItemId) -> String {
        format!("{}{}", self.config.url_prefix, id)
    }

    async fn run(&self, args: Vec<String>) -> Result<String, FetchError> {
        debug!("running {} {:?}", self.config.program, args);
        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::Exit {
                program: self.config.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn try_fetch_metadata(&self, id: &ItemId) -> Result<ItemMetadata, FetchError> {
        let template = format!("%(duration)s{FIELD_SEPARATOR}%(uploader)s{FIELD_SEPARATOR}%(title)s");
        let stdout = self
            .run(vec![
                "--no-warnings".into(),
                "--skip-download".into(),
                "--print".into(),
                template,
                self.url(id),
            ])
            .await?;
        parse_metadata(&stdout)
    }

    async fn try_download(&self, id: &ItemId) -> Result<MediaFormat, FetchError> {
        let output: PathBuf = self.media.root().join(id.as_str());
        self.run(vec![
            "--no-warnings".into(),
            "--no-playlist".into(),
            self.url(id),
            "-o".into(),
            output.to_string_lossy().into_owned(),
            "--merge-output-format".into(),
            self.config.merge_output_format.clone(),
            "--remux-video".into(),
            self.config.merge_output_format.clone(),
        ])
        .await?;
        self.media.find(id).await.ok_or(FetchError::NoOutput)
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_metadata(&self, id: &ItemId) -> Option<ItemMetadata> {
        match self.try_fetch_metadata(id).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("metadata fetch failed for {}: {}", id, e);
                None
            }
        }
    }

    async fn download(&self, id: &ItemId) -> Option<MediaFormat> {
        match self.try_download(id).await {
            Ok(format) => Some(format),
            Err(e) => {
                warn!("download failed for {}: {}", id, e);
                None
            }
        }
    }
}

/// Parses `duration<sep>uploader<sep>title` as printed by the downloader.
///
/// An unparseable duration (live streams print `NA`) becomes unknown length.
pub fn parse_metadata(stdout: &str) -> Result<ItemMetadata, FetchError> {
    let line = stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut parts = line.splitn(3, FIELD_SEPARATOR);
    let (Some(duration), Some(uploader), Some(title)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(FetchError::Malformed(line.to_string()));
    };

    let length_seconds = duration
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(super::entry::UNKNOWN_LENGTH);

    Ok(ItemMetadata {
        title: title.trim().to_string(),
        uploader: uploader.trim().to_string(),
        length_seconds,
    })
}
