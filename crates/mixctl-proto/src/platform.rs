use std::path::PathBuf;

/// Default port of the mixplay HTTP control surface.
pub const MIXPLAY_PORT: u16 = 2347;
const MIXPLAY_HOST: &str = "127.0.0.1";

pub fn default_server_url() -> String {
    format!("http://{}:{}", MIXPLAY_HOST, MIXPLAY_PORT)
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/mixctl on every unix, macOS included.
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("mixctl")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mixctl")
    }
}

pub fn config_dir() -> PathBuf {
    // A config.toml next to the executable makes a portable install.
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_config = exe_dir.join("config.toml");
                if portable_config.exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("mixctl")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mixctl")
    }
}
