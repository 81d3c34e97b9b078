use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bitmap::Rect;
use crate::error::Result;

/// Last window placement, restored on the next start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl From<Rect> for Placement {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<Placement> for Rect {
    fn from(p: Placement) -> Self {
        Rect::new(p.x, p.y, p.width, p.height)
    }
}

impl Placement {
    /// Load the saved placement, if there is a usable one.
    pub fn load() -> Option<Self> {
        let path = Self::state_path()?;
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Placement>(&content) {
            Ok(p) if p.width > 0 && p.height > 0 => Some(p),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Save placement to the state file.
    pub fn save(&self) {
        let path = match Self::state_path() {
            Some(p) => p,
            None => {
                log::warn!("Cannot determine config directory for state file");
                return;
            }
        };

        if let Err(e) = self.write_to(&path) {
            log::warn!("Cannot save state: {}", e);
        }
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn state_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("xbackdrop").join("state.json"))
    }
}
