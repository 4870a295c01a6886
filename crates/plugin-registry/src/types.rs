use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One installed plugin as reported by the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin path, e.g. `akismet/akismet.php`.
    pub slug: String,
    /// Human-readable display name.
    pub name: String,
}

impl PluginDescriptor {
    #[inline]
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.slug)
    }
}

/// The complete set of active plugin slugs at a point in time.
///
/// Backed by an ordered set so snapshots compare and serialize
/// deterministically regardless of the order the host reported them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationSnapshot {
    slugs: BTreeSet<String>,
}

impl ActivationSnapshot {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot in which `slug` is the sole active plugin.
    #[inline]
    pub fn only(slug: &str) -> Self {
        Self::from_iter([slug.to_string()])
    }

    #[inline]
    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slugs.iter().map(String::as_str)
    }

    /// Slugs active in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a ActivationSnapshot) -> impl Iterator<Item = &'a str> {
        self.slugs.difference(&other.slugs).map(String::as_str)
    }
}

impl FromIterator<String> for ActivationSnapshot {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            slugs: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for ActivationSnapshot {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

impl fmt::Display for ActivationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.slugs.is_empty() {
            return f.write_str("{}");
        }
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{{{}}}", joined.join(", "))
    }
}
