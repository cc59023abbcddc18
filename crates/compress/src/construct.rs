use crate::Strategy;
use crate::error::{Error, ErrorKind};
use std::{path::Path, str::FromStr};

impl FromStr for Strategy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lz4" => Ok(Strategy::Lz4),
            "psd_smart" => Ok(Strategy::PsdSmart),
            "bsdiff" => Ok(Strategy::Bsdiff),
            "zip" => Ok(Strategy::Zip),
            "zstd" => Ok(Strategy::Zstd),
            _ => exn::bail!(ErrorKind::UnsupportedStrategy(s.to_string())),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Strategy {
    /// Detect the strategy an artifact file was encoded with from its
    /// extension.
    ///
    /// Returns `None` for paths that are not artifacts of this engine.
    ///
    /// # Examples
    ///
    /// ```
    /// use dgit_compress::Strategy;
    ///
    /// assert_eq!(Strategy::from_path("versions/v3.lz4"), Some(Strategy::Lz4));
    /// assert_eq!(Strategy::from_path("cache/v4_from_v3.psd_smart"), Some(Strategy::PsdSmart));
    /// assert_eq!(Strategy::from_path("design.psd"), None);
    /// ```
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "lz4" => Some(Strategy::Lz4),
                "psd_smart" => Some(Strategy::PsdSmart),
                "bsdiff" => Some(Strategy::Bsdiff),
                "zip" => Some(Strategy::Zip),
                "zstd" => Some(Strategy::Zstd),
                _ => None,
            })
    }
}
