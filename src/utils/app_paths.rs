use std::fs;
use std::io;
use std::path::PathBuf;

pub struct AppPaths;

impl AppPaths {
    pub fn data_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Cannot determine data directory"))?
            .join("bakery-client");

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn log_dir() -> io::Result<PathBuf> {
        let log_dir = Self::data_dir()?.join("logs");
        fs::create_dir_all(&log_dir)?;
        Ok(log_dir)
    }

    /// Session token and device state
    pub fn state_file() -> io::Result<PathBuf> {
        Ok(Self::data_dir()?.join("state.json"))
    }
}
