//! Metric source seam and a filesystem-backed implementation.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;

use bucketscale_core::{CredentialRef, ScalingRule};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::FetchError;

/// Boxed future returned by [`MetricSource::fetch_count`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<u64, FetchError>> + Send + 'a>>;

/// What the metric source needs to count a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    /// Passed through untouched; only the source interprets it.
    pub credentials: Option<CredentialRef>,
}

impl FetchRequest {
    pub fn for_rule(rule: &ScalingRule) -> Self {
        Self {
            bucket: rule.bucket().to_string(),
            prefix: rule.blob_prefix().map(str::to_string),
            credentials: rule.credentials().cloned(),
        }
    }
}

/// Counts objects pending in a bucket — injected so the controller can
/// be driven by any storage client.
pub trait MetricSource: Send + Sync {
    fn fetch_count<'a>(&'a self, request: &'a FetchRequest) -> FetchFuture<'a>;
}

/// Treats `<root>/<bucket>` as a bucket and every regular file beneath
/// it as one object, keyed by its `/`-separated relative path.
#[derive(Debug, Clone)]
pub struct LocalBucketSource {
    root: PathBuf,
}

impl LocalBucketSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MetricSource for LocalBucketSource {
    fn fetch_count<'a>(&'a self, request: &'a FetchRequest) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Some(CredentialRef::FromEnv(var)) = &request.credentials {
                resolve_env_credentials(var)?;
            }

            let bucket = Path::new(&request.bucket);
            if !bucket
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                return Err(FetchError::Source(format!(
                    "invalid bucket name: {}",
                    request.bucket
                )));
            }

            let dir = self.root.join(bucket);
            let prefix = request.prefix.clone();
            let count = tokio::task::spawn_blocking(move || count_objects(&dir, prefix.as_deref()))
                .await
                .map_err(|e| FetchError::Source(format!("listing task failed: {e}")))??;

            debug!(bucket = %request.bucket, count, "listed bucket");
            Ok(count)
        })
    }
}

fn resolve_env_credentials(var: &str) -> Result<(), FetchError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(()),
        Ok(_) => Err(FetchError::Auth(format!("environment variable {var} is empty"))),
        Err(_) => Err(FetchError::Auth(format!("environment variable {var} is not set"))),
    }
}

fn count_objects(dir: &Path, prefix: Option<&str>) -> Result<u64, FetchError> {
    if !dir.is_dir() {
        return Err(FetchError::Network(format!(
            "bucket not found: {}",
            dir.display()
        )));
    }

    let mut count = 0;
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| FetchError::Network(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(prefix) = prefix {
            let key = object_key(dir, entry.path());
            if !key.starts_with(prefix) {
                continue;
            }
        }
        count += 1;
    }
    Ok(count)
}

fn object_key(bucket_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(bucket_dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
