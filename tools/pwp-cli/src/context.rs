//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use http::HeaderValue;
use pwp_worker::prelude::{
    init_tracing, DiskCacheStorage, FileQueue, HttpFetcher, RecordingRegistry, TimeoutConfig,
    Worker, WorkerParts,
};

use crate::config::CliConfig;
use crate::output::Output;

const CONFIG_NAMES: [&str; 3] = ["pwp.toml", ".pwp.toml", "pwp.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// Config file in use, if any.
    pub config_path: Option<PathBuf>,
}

/// A worker together with the host facilities it was built on.
pub struct Host {
    pub worker: Worker,
    pub registry: Arc<RecordingRegistry>,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            (CliConfig::load(path)?, Some(cwd.join(path)))
        } else {
            match Self::find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (CliConfig::default(), None),
            }
        };

        Ok(Self {
            config,
            output,
            cwd,
            config_path,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(CliConfig, PathBuf)> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    if let Ok(config) = CliConfig::load(config_path.to_str()?) {
                        return Some((config, config_path));
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Directory that relative storage paths resolve against.
    pub fn root(&self) -> &Path {
        self.config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(&self.cwd)
    }

    /// Install the log subscriber.
    pub fn init_logging(&self) -> Result<()> {
        let mut logging = self.config.logging.clone();
        if self.output.is_verbose() {
            logging.level = logging.level.min(pwp_worker::prelude::LogLevel::Debug);
        }
        init_tracing(&logging)?;
        Ok(())
    }

    /// Get the data directory.
    pub fn data_dir(&self) -> PathBuf {
        let dir = Path::new(&self.config.storage.data_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root().join(dir)
        }
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir().join("caches")
    }

    /// Get the submission queue file.
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir().join("queue.json")
    }

    /// Open the submission queue without building a worker.
    pub async fn open_queue(&self) -> Result<Arc<FileQueue>> {
        let path = self.queue_path();
        let queue = FileQueue::open(&path)
            .await
            .with_context(|| format!("Failed to open queue: {}", path.display()))?;
        Ok(Arc::new(queue))
    }

    /// Build a worker on the local data directory.
    ///
    /// A worker installed by an earlier run is restored and activated.
    pub async fn host(&self) -> Result<Host> {
        let network = &self.config.network;
        let mut fetcher =
            HttpFetcher::new(&TimeoutConfig::from_total(Duration::from_secs(network.timeout_secs)))?
                .with_credential_origin(self.config.worker.origin.clone());
        if let Some(cookie) = &network.cookie {
            let cookie = HeaderValue::from_str(cookie).context("network.cookie is not a valid header value")?;
            fetcher = fetcher.with_cookie(cookie);
        }

        let queue = self.open_queue().await?;
        let registry = Arc::new(RecordingRegistry::new());
        let parts = WorkerParts {
            fetcher: Arc::new(fetcher),
            storage: Arc::new(DiskCacheStorage::new(self.cache_dir())),
            queue,
            registry: registry.clone(),
        };

        let worker = Worker::new(self.config.worker.clone(), parts).await?;
        if worker.restore().await? {
            worker.activate()?;
        } else {
            self.output
                .debug("Worker not installed; requests go straight to the network");
        }

        Ok(Host { worker, registry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join("pwp.toml"),
            "[storage]\ndata_dir = \"state\"\n",
        )
        .unwrap();

        let (config, path) = Context::find_config(&nested).unwrap();
        assert_eq!(config.storage.data_dir, "state");
        assert_eq!(path, dir.path().join("pwp.toml"));
    }

    #[test]
    fn test_data_dir_is_relative_to_config() {
        let ctx = Context {
            config: CliConfig::default(),
            output: Output::new(false, true),
            cwd: PathBuf::from("/work/sub"),
            config_path: Some(PathBuf::from("/work/pwp.toml")),
        };
        assert_eq!(ctx.data_dir(), PathBuf::from("/work/.pwp"));
        assert_eq!(ctx.queue_path(), PathBuf::from("/work/.pwp/queue.json"));
        assert_eq!(ctx.cache_dir(), PathBuf::from("/work/.pwp/caches"));
    }
}
