//! Bucket paths.

use std::fmt;

/// Errors related to building a path from components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A component is empty. Bucket names must have at least one byte.
    EmptyComponent { position: usize },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::EmptyComponent { position } => {
                write!(f, "empty path component at position {}", position)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A chain of nested bucket names, outermost first.
///
/// Bucket names are arbitrary non-empty strings. A path value may be empty
/// (it is the natural result of parsing `""`), but every [`Db`](crate::Db)
/// operation rejects an empty path with [`Error::EmptyPath`](crate::Error::EmptyPath).
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// Parse a slash-separated path.
    ///
    /// Empty components are dropped, so `//` and leading or trailing
    /// slashes are normalized away.
    ///
    /// ```rust
    /// use shelf_mapper::Path;
    ///
    /// let path = Path::parse("users/2024/");
    /// assert_eq!(path.len(), 2);
    /// assert_eq!(path, Path::parse("/users//2024"));
    /// ```
    pub fn parse(s: &str) -> Self {
        Path {
            components: s
                .split('/')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Create a path from components, rejecting empty ones.
    pub fn try_from_components(components: Vec<String>) -> Result<Self, PathError> {
        if let Some(position) = components.iter().position(String::is_empty) {
            return Err(PathError::EmptyComponent { position });
        }
        Ok(Path { components })
    }

    /// Check if this path is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Path { components }
    }

    /// Append one bucket name.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Path {
        let name = name.into();
        let mut components = self.components.clone();
        if !name.is_empty() {
            components.push(name);
        }
        Path { components }
    }

    /// The path without its last component, or `None` for an empty path.
    pub fn parent(&self) -> Option<Path> {
        let (_, rest) = self.components.split_last()?;
        Some(Path {
            components: rest.to_vec(),
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

// Component-wise conversions never split on '/', so bucket names may
// contain slashes. Empty components are dropped, the same as `parse`.
fn collect<I, S>(components: I) -> Path
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Path {
        components: components
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| !c.is_empty())
            .collect(),
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<&[&str]> for Path {
    fn from(components: &[&str]) -> Self {
        collect(components.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(components: [&str; N]) -> Self {
        collect(components)
    }
}

impl From<Vec<String>> for Path {
    fn from(components: Vec<String>) -> Self {
        collect(components)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

/// Build a [`Path`] from a slash-separated literal or from separate names.
///
/// # Example
///
/// ```rust
/// use shelf_mapper::path;
///
/// let p = path!("users/archive");
/// assert_eq!(p.len(), 2);
/// assert_eq!(p, path!("users", "archive"));
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s)
    };
    ($($s:expr),+ $(,)?) => {
        $crate::Path::from([$($s),+])
    };
}
