/// Worker process configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent consume loops.
    pub concurrency: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default |
    /// |----------------------|---------|
    /// | `WORKER_CONCURRENCY` | `4`     |
    pub fn from_env() -> Self {
        let concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        Self { concurrency }
    }
}
