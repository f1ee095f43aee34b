use std::path::PathBuf;

/// Environment variable that relocates the bridge's home directory.
pub const HOME_ENV: &str = "SKILLBRIDGE_HOME";

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        if let Some(base) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self { base: PathBuf::from(base) };
        }
        let base = dirs::home_dir()
            .map(|h| h.join(".skillbridge"))
            .unwrap_or_else(|| PathBuf::from(".skillbridge"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
