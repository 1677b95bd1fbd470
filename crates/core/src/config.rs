use std::path::PathBuf;

/// File-handling configuration shared by ingress and the worker.
///
/// Constructed once in each binary's `main` and passed into component
/// constructors; there is no ambient global lookup.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Directory where uploaded source artifacts are written.
    pub upload_dir: PathBuf,
    /// Directory where converted artifacts are written.
    pub converted_dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_file_size: u64,
    /// Lowercase format allow-list for both source extensions and targets.
    pub allowed_formats: Vec<String>,
}

impl ConversionConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                   |
    /// |-------------------|---------------------------|
    /// | `UPLOAD_DIR`      | `uploads`                 |
    /// | `CONVERTED_DIR`   | `converted`               |
    /// | `MAX_FILE_SIZE`   | `10000000`                |
    /// | `ALLOWED_FORMATS` | `jpg,jpeg,png,gif,webp`   |
    pub fn from_env() -> Self {
        let upload_dir = std::env::var("UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".into())
            .into();

        let converted_dir = std::env::var("CONVERTED_DIR")
            .unwrap_or_else(|_| "converted".into())
            .into();

        let max_file_size: u64 = std::env::var("MAX_FILE_SIZE")
            .unwrap_or_else(|_| "10000000".into())
            .parse()
            .expect("MAX_FILE_SIZE must be a valid u64");

        let allowed_formats: Vec<String> = std::env::var("ALLOWED_FORMATS")
            .unwrap_or_else(|_| "jpg,jpeg,png,gif,webp".into())
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            upload_dir,
            converted_dir,
            max_file_size,
            allowed_formats,
        }
    }

    /// Create the upload and converted directories if they do not exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.converted_dir)?;
        Ok(())
    }
}
