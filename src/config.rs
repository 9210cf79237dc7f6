use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// Where photo bytes live
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// Files in a local folder, reconciled against the database on each request
    Local,
    /// Files in an S3 bucket; the database is authoritative and never reconciled
    S3,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Local => f.write_str("local"),
            StorageBackend::S3 => f.write_str("s3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "photo-gallery", about = "Serve a personal photo gallery")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "GALLERY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "GALLERY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Folder holding the photos (local backend)
    #[arg(long, env = "GALLERY_PHOTOS_DIR", default_value = "static/images")]
    pub photos_dir: PathBuf,

    /// SQLite database file [default: <data dir>/photo-gallery/gallery.db]
    #[arg(long, env = "GALLERY_DATABASE")]
    pub database: Option<PathBuf>,

    /// Thumbnail cache folder [default: <cache dir>/photo-gallery/thumbnails]
    #[arg(long, env = "GALLERY_THUMBNAIL_DIR")]
    pub thumbnail_dir: Option<PathBuf>,

    /// Storage backend for photo bytes
    #[arg(long, env = "STORAGE_BACKEND", value_enum, default_value_t = StorageBackend::Local)]
    pub storage_backend: StorageBackend,

    /// Bucket holding the photos (s3 backend)
    #[arg(long, env = "S3_BUCKET_NAME")]
    pub bucket_name: Option<String>,

    /// CDN domain fronting the bucket, e.g. photos.example.com
    #[arg(long, env = "CDN_DOMAIN")]
    pub cdn_domain: Option<String>,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "GALLERY_MAX_UPLOAD_MB", default_value_t = 25)]
    pub max_upload_mb: usize,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Insert sample records if the database is empty
    #[arg(long)]
    pub seed: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("the s3 storage backend needs --bucket-name or --cdn-domain")]
    MissingBucket,

    #[error("could not determine a {0} directory; pass it explicitly")]
    NoDefaultDir(&'static str),
}

/// Gallery configuration, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub photos_dir: PathBuf,
    pub database: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub storage_backend: StorageBackend,
    pub bucket_name: Option<String>,
    pub cdn_domain: Option<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let bucket_name = non_empty(cli.bucket_name.as_deref());
        let cdn_domain = non_empty(cli.cdn_domain.as_deref())
            .map(|d| d.trim_end_matches('/').to_string());

        if cli.storage_backend == StorageBackend::S3 && bucket_name.is_none() && cdn_domain.is_none() {
            return Err(ConfigError::MissingBucket);
        }

        let database = match &cli.database {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .or_else(dirs::home_dir)
                .ok_or(ConfigError::NoDefaultDir("data"))?
                .join("photo-gallery")
                .join("gallery.db"),
        };

        let thumbnail_dir = match &cli.thumbnail_dir {
            Some(path) => path.clone(),
            None => dirs::cache_dir()
                .or_else(dirs::home_dir)
                .ok_or(ConfigError::NoDefaultDir("cache"))?
                .join("photo-gallery")
                .join("thumbnails"),
        };

        Ok(Config {
            host: cli.host.clone(),
            port: cli.port,
            photos_dir: cli.photos_dir.clone(),
            database,
            thumbnail_dir,
            storage_backend: cli.storage_backend,
            bucket_name,
            cdn_domain,
            max_upload_bytes: cli.max_upload_mb.saturating_mul(1024 * 1024),
        })
    }

    pub fn is_cloud(&self) -> bool {
        self.storage_backend == StorageBackend::S3
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public URL for a photo's bytes.
    ///
    /// Local files are served by the gallery itself; in cloud mode the CDN
    /// domain wins over the bucket's own endpoint.
    pub fn photo_url(&self, filename: &str) -> String {
        let name = urlencoding::encode(filename);
        match self.storage_backend {
            StorageBackend::Local => format!("/images/{name}"),
            StorageBackend::S3 => match (&self.cdn_domain, &self.bucket_name) {
                (Some(cdn), _) => format!("https://{cdn}/{name}"),
                (None, Some(bucket)) => format!("https://{bucket}.s3.amazonaws.com/{name}"),
                // from_cli rejects this combination
                (None, None) => format!("/images/{name}"),
            },
        }
    }

    /// Config for tests: local backend rooted in the given folder
    #[cfg(test)]
    pub fn for_tests(root: &std::path::Path) -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            photos_dir: root.join("images"),
            database: root.join("gallery.db"),
            thumbnail_dir: root.join("thumbs"),
            storage_backend: StorageBackend::Local,
            bucket_name: None,
            cdn_domain: None,
            max_upload_bytes: 1024 * 1024,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
