// Loader Settings

use crate::aslr::{FixedSlide, NoSlide, SlideSource};
use crate::kernel::KernelVersion;
use crate::source::DirectorySource;
use core::fmt;
use serde::Deserialize;
use serde_json_core::de;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderSettings<'a> {
    #[serde(default = "config_default_exefs_root")]
    exefs_root: &'a str,

    #[serde(default = "config_default_override_root")]
    override_root: &'a str,

    #[serde(default = "config_default_kernel_major")]
    kernel_major: u8,

    #[serde(default)]
    aslr: bool,
}

fn config_default_exefs_root<'a>() -> &'a str {
    "code"
}

fn config_default_override_root<'a>() -> &'a str {
    "sdmc/atmosphere"
}

fn config_default_kernel_major() -> u8 {
    5
}

impl Default for LoaderSettings<'_> {
    fn default() -> Self {
        Self {
            exefs_root: config_default_exefs_root(),
            override_root: config_default_override_root(),
            kernel_major: config_default_kernel_major(),
            aslr: false,
        }
    }
}

impl<'a> LoaderSettings<'a> {
    pub const DEFAULT_CONFIG_PATH: &'static str = "nsoldr.json";

    #[inline]
    pub fn load(json: &'a str) -> Result<Self, SettingsError> {
        serde_json_core::from_str(json)
            .map(|v| v.0)
            .map_err(SettingsError::Parse)
    }

    #[inline]
    pub const fn exefs_root(&self) -> &'a str {
        self.exefs_root
    }

    #[inline]
    pub const fn override_root(&self) -> &'a str {
        self.override_root
    }

    #[inline]
    pub const fn kernel_version(&self) -> KernelVersion {
        KernelVersion::new(self.kernel_major, 0, 0)
    }

    #[inline]
    pub const fn is_aslr_enabled(&self) -> bool {
        self.aslr
    }

    #[inline]
    pub fn image_source(&self) -> DirectorySource {
        DirectorySource::new(self.exefs_root, self.override_root)
    }

    /// Slide source for these settings. Without `aslr` the requested slide
    /// is ignored and every layout starts at the bottom of its window.
    pub fn slide_source(&self, slide: Option<u64>) -> Box<dyn SlideSource> {
        match (self.aslr, slide) {
            (true, Some(slide)) => Box::new(FixedSlide(slide)),
            _ => Box::new(NoSlide),
        }
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Parse(de::Error),
    Io(std::io::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "error in config: {}", err),
            Self::Io(err) => write!(f, "cannot read config: {}", err),
        }
    }
}

impl std::error::Error for SettingsError {}
