use std::path::{Path, PathBuf};

use serde::Deserialize;

use crabapple_machines::apple1::{Apple1Config, LoadImage};

/// On-disk configuration, merged under the command line.
///
/// ```toml
/// ram-kb = 4
/// himem = 0xE000
/// port = 2121
///
/// [[rom]]
/// path = "roms/monitor.bin"
/// address = 0xFF00
///
/// [[load]]
/// path = "programs/demo.bin"
/// address = 0x0280
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub ram_kb: Option<u32>,
    pub himem: Option<u16>,
    pub port: Option<u16>,
    #[serde(default, rename = "rom")]
    pub roms: Vec<FileImage>,
    #[serde(default, rename = "load")]
    pub loads: Vec<FileImage>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileImage {
    pub path: PathBuf,
    pub address: u16,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| format!("bad config {}: {e}", path.display()))
    }

    /// The default config location: `<config dir>/crabapple/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("crabapple").join("config.toml"))
    }

    /// Fold the file settings into a machine configuration; command-line
    /// values are applied on top by the caller.
    pub fn apply(&self, config: &mut Apple1Config) {
        if let Some(ram_kb) = self.ram_kb {
            config.ram_kb = ram_kb;
        }
        if let Some(himem) = self.himem {
            config.himem = himem;
        }
        if let Some(port) = self.port {
            config.telnet_port = port;
        }
        config.roms.extend(self.roms.iter().map(FileImage::to_load_image));
        config.ram_images.extend(self.loads.iter().map(FileImage::to_load_image));
    }
}

impl FileImage {
    fn to_load_image(&self) -> LoadImage {
        LoadImage {
            path: self.path.clone(),
            address: self.address,
        }
    }
}
