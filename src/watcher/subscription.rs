use anyhow::{Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix of every subscription name this tool registers.
pub const SUBSCRIPTION_PREFIX: &str = "papapackage";

const RELATIVE_SEPARATOR: &str = "::";

/// Identifies the source folder a subscription watches.
///
/// Formats as `papapackage:<watch>` or `papapackage:<watch>::<relative_path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionName {
    pub watch: PathBuf,
    pub relative_path: Option<PathBuf>,
}

impl SubscriptionName {
    pub fn new(watch: impl Into<PathBuf>, relative_path: Option<PathBuf>) -> Self {
        Self {
            watch: watch.into(),
            relative_path: relative_path.filter(|p| !p.as_os_str().is_empty()),
        }
    }

    /// The watched source folder: `watch` joined with `relative_path`.
    pub fn full_path(&self) -> PathBuf {
        match &self.relative_path {
            Some(relative) => self.watch.join(relative),
            None => self.watch.clone(),
        }
    }

    pub fn is_rooted_at(&self, root: &Path) -> bool {
        self.watch == root
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", SUBSCRIPTION_PREFIX, self.watch.display())?;
        if let Some(relative) = &self.relative_path {
            write!(f, "{}{}", RELATIVE_SEPARATOR, relative.display())?;
        }
        Ok(())
    }
}

impl FromStr for SubscriptionName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some(rest) = s
            .strip_prefix(SUBSCRIPTION_PREFIX)
            .and_then(|r| r.strip_prefix(':'))
        else {
            bail!("Not a {} subscription: {:?}", SUBSCRIPTION_PREFIX, s);
        };

        let (watch, relative) = match rest.split_once(RELATIVE_SEPARATOR) {
            Some((watch, relative)) => (watch, Some(PathBuf::from(relative))),
            None => (rest, None),
        };

        if watch.is_empty() {
            bail!("No root path found in subscription {:?}", s);
        }

        Ok(Self::new(watch, relative))
    }
}
