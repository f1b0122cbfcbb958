//! Runtime configuration of the machine.
//!
//! The configuration is read once from a small JSON document and is immutable
//! afterwards. Every key is optional:
//!
//! ```json
//! {
//!     "MEM_SIZE": 4196,
//!     "VMEM_SIZE": 256,
//!     "MAX_PROGRAM_SIZE": 512,
//!     "REG_COUNT": 2,
//!     "SCREEN_WIDTH": 16,
//!     "SCREEN_HEIGHT": 16
//! }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use log::*;
use serde::Deserialize;

mod defaults {
    pub const MEM_SIZE: usize = 4196;
    pub const VMEM_SIZE: usize = 1024;
    pub const MAX_PROGRAM_SIZE: usize = 512;
    pub const REG_COUNT: usize = 2;
    pub const SCREEN_WIDTH: usize = 16;
    pub const SCREEN_HEIGHT: usize = 16;
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] io::Error),
    #[error("malformed config file")]
    Malformed(#[from] serde_json::Error),
    #[error("`{key}` must be a positive integer")]
    NotPositive { key: &'static str },
    #[error("screen of {width}x{height} cells does not fit into memory")]
    ScreenTooLarge { width: usize, height: usize },
}

/// Sizes of the machine's buffers and the assembler's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RuntimeConfig {
    /// Size of system memory in bytes
    pub mem_size: usize,
    /// Declared size of video memory. The buffer itself is always
    /// `screen_width * screen_height` bytes long.
    pub vmem_size: usize,
    /// Largest program the assembler will produce
    pub max_program_size: usize,
    /// Number of 8-bit registers
    pub reg_count: usize,
    pub screen_width: usize,
    pub screen_height: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mem_size: defaults::MEM_SIZE,
            vmem_size: defaults::VMEM_SIZE,
            max_program_size: defaults::MAX_PROGRAM_SIZE,
            reg_count: defaults::REG_COUNT,
            screen_width: defaults::SCREEN_WIDTH,
            screen_height: defaults::SCREEN_HEIGHT,
        }
    }
}

impl RuntimeConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration file at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Like [`RuntimeConfig::from_file`], but any failure only produces a
    /// warning and yields the default configuration.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match Self::from_file(path) {
            Ok(config) => {
                debug!("Loaded configuration from `{}`: {:?}", path.display(), config);
                config
            }
            Err(err) => {
                warn!(
                    "Could not load `{}` ({}), using defaults",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Checks that every size is usable.
    ///
    /// A `vmem_size` that disagrees with the screen geometry is only reported,
    /// since the video buffer is sized from the geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("MEM_SIZE", self.mem_size),
            ("MAX_PROGRAM_SIZE", self.max_program_size),
            ("REG_COUNT", self.reg_count),
            ("SCREEN_WIDTH", self.screen_width),
            ("SCREEN_HEIGHT", self.screen_height),
        ];
        if let Some(&(key, _)) = sizes.iter().find(|&&(_, size)| size == 0) {
            return Err(ConfigError::NotPositive { key });
        }

        let video_len = self
            .screen_width
            .checked_mul(self.screen_height)
            .ok_or(ConfigError::ScreenTooLarge {
                width: self.screen_width,
                height: self.screen_height,
            })?;

        if video_len != self.vmem_size {
            warn!(
                "VMEM_SIZE ({}) differs from the {}x{} screen, video memory will hold {} bytes",
                self.vmem_size, self.screen_width, self.screen_height, video_len
            );
        }

        Ok(())
    }

    /// Length of the video memory buffer.
    pub fn video_len(&self) -> usize {
        self.screen_width * self.screen_height
    }
}
