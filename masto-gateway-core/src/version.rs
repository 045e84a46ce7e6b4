//! Remote version parsing and version gating.
//!
//! Servers advertise their version through the instance endpoint. Operations
//! that only exist in a range of server versions are wrapped with
//! [`available`], which rejects calls outside the range with
//! [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) before any request is
//! made.
//!
//! ```
//! use masto_gateway_core::{available, ApiError, Versioned, VersionRange};
//! use semver::Version;
//!
//! struct Instance(Option<Version>);
//!
//! impl Versioned for Instance {
//!     fn remote_version(&self) -> Option<Version> {
//!         self.0.clone()
//!     }
//! }
//!
//! let translate = available(VersionRange::since("3.5.0").unwrap())
//!     .around("translate", |_: &Instance, id: &str| Ok::<_, ApiError>(id.len()));
//!
//! let old = Instance(Some(Version::new(3, 4, 0)));
//! assert!(translate.invoke(&old, "109").is_err());
//!
//! let new = Instance(Some(Version::new(4, 0, 0)));
//! assert_eq!(translate.invoke(&new, "109").unwrap(), 3);
//! ```

use std::future::Future;

use semver::{BuildMetadata, Prerelease, Version};

use crate::ApiError;

/// Errors raised while building a [`VersionRange`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// The string is not a recognizable version.
    #[error("invalid version: {0:?}")]
    Invalid(String),

    /// `since` is newer than `until`.
    #[error("empty version range: since {since} is newer than until {until}")]
    EmptyRange { since: Version, until: Version },
}

/// Parse a version string as advertised by a server.
///
/// Accepts strict semantic versions and the looser forms servers report in
/// practice, such as `4.0.0rc1` or `3.5.3+glitch`. Build metadata is dropped
/// so it never affects comparisons.
///
/// # Example
///
/// ```
/// use masto_gateway_core::parse_version;
/// use semver::Version;
///
/// assert_eq!(parse_version("3.5.3+glitch").unwrap(), Version::new(3, 5, 3));
/// assert_eq!(parse_version("4.0.0rc1").unwrap().to_string(), "4.0.0-rc1");
/// assert!(parse_version("unknown").is_err());
/// ```
pub fn parse_version(raw: &str) -> Result<Version, VersionError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let mut version = match Version::parse(trimmed) {
        Ok(version) => version,
        Err(_) => parse_loose(trimmed).ok_or_else(|| VersionError::Invalid(raw.to_owned()))?,
    };
    version.build = BuildMetadata::EMPTY;
    Ok(version)
}

fn parse_loose(s: &str) -> Option<Version> {
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (core, rest) = s.split_at(end);
    let mut numbers = core.split('.').filter(|part| !part.is_empty());
    let major = numbers.next()?.parse().ok()?;
    let minor = numbers.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let patch = numbers.next().map(str::parse).transpose().ok()?.unwrap_or(0);

    let mut version = Version::new(major, minor, patch);
    let pre = rest.split('+').next().unwrap_or_default();
    let pre = pre.strip_prefix('-').unwrap_or(pre);
    if !pre.is_empty() {
        version.pre = Prerelease::new(pre).ok()?;
    }
    Some(version)
}

/// Server versions an operation is available in. Both bounds are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionRange {
    since: Option<Version>,
    until: Option<Version>,
}

impl VersionRange {
    /// A range with no bounds; every version is accepted.
    pub fn any() -> Self {
        Self::default()
    }

    /// Build a range from optional bound strings.
    ///
    /// Fails if a bound does not parse or if `since` is newer than `until`.
    pub fn new(since: Option<&str>, until: Option<&str>) -> Result<Self, VersionError> {
        let since = since.map(parse_version).transpose()?;
        let until = until.map(parse_version).transpose()?;
        if let (Some(since), Some(until)) = (&since, &until) {
            if since > until {
                return Err(VersionError::EmptyRange {
                    since: since.clone(),
                    until: until.clone(),
                });
            }
        }
        Ok(Self { since, until })
    }

    /// Range starting at `since`.
    pub fn since(since: &str) -> Result<Self, VersionError> {
        Self::new(Some(since), None)
    }

    /// Range ending at `until`.
    pub fn until(until: &str) -> Result<Self, VersionError> {
        Self::new(None, Some(until))
    }

    /// Lower bound, if any.
    pub fn lower(&self) -> Option<&Version> {
        self.since.as_ref()
    }

    /// Upper bound, if any.
    pub fn upper(&self) -> Option<&Version> {
        self.until.as_ref()
    }

    /// Check whether `version` falls inside this range.
    pub fn contains(&self, version: &Version) -> bool {
        self.since.as_ref().is_none_or(|since| version >= since)
            && self.until.as_ref().is_none_or(|until| version <= until)
    }
}

/// Reject `operation` if `current` lies outside `range`.
///
/// An unknown current version is treated as compatible.
///
/// # Errors
///
/// Returns a [`NotFound`](crate::ErrorKind::NotFound) [`ApiError`] naming the
/// operation, the current version and the violated bound.
pub fn guard(operation: &str, current: Option<&Version>, range: &VersionRange) -> Result<(), ApiError> {
    let Some(current) = current else {
        return Ok(());
    };
    if let Some(since) = &range.since {
        if current < since {
            return Err(ApiError::not_found(format!(
                "{operation} is not available with the current version {current}; \
                 it requires {since} or later"
            )));
        }
    }
    if let Some(until) = &range.until {
        if current > until {
            return Err(ApiError::not_found(format!(
                "{operation} is not available with the current version {current}; \
                 it was removed after {until}"
            )));
        }
    }
    Ok(())
}

/// Anything that knows which server version it talks to.
pub trait Versioned {
    /// The remote version, or `None` when unknown.
    fn remote_version(&self) -> Option<Version>;
}

impl<T: Versioned + ?Sized> Versioned for &T {
    fn remote_version(&self) -> Option<Version> {
        (**self).remote_version()
    }
}

/// Create a version policy for [`Available::around`].
pub fn available(range: VersionRange) -> Available {
    Available { range }
}

/// A version policy not yet attached to an operation.
#[derive(Clone, Debug)]
pub struct Available {
    range: VersionRange,
}

impl Available {
    /// Attach this policy to an operation.
    ///
    /// `name` is used in rejection messages. The operation receives the
    /// versioned context and its arguments; it is only run when the context's
    /// version lies inside the range.
    ///
    /// `operation` must be callable with a context and arguments:
    ///
    /// ```compile_fail
    /// use masto_gateway_core::{available, VersionRange};
    ///
    /// let gated = available(VersionRange::any()).around("not_a_function", 42u8);
    /// ```
    pub fn around<C, A, R, F>(self, name: &'static str, operation: F) -> Gated<F>
    where
        C: ?Sized,
        F: Fn(&C, A) -> R,
    {
        Gated {
            name,
            range: self.range,
            operation,
        }
    }
}

/// An operation guarded by a [`VersionRange`].
#[derive(Clone, Debug)]
pub struct Gated<F> {
    name: &'static str,
    range: VersionRange,
    operation: F,
}

impl<F> Gated<F> {
    /// The operation name used in rejection messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The range this operation is available in.
    pub fn range(&self) -> &VersionRange {
        &self.range
    }

    /// Run only the version check against `ctx`.
    pub fn check<C: Versioned + ?Sized>(&self, ctx: &C) -> Result<(), ApiError> {
        guard(self.name, ctx.remote_version().as_ref(), &self.range)
    }

    /// Run a synchronous operation after the version check.
    pub fn invoke<'a, C, A, T, E>(&self, ctx: &'a C, args: A) -> Result<T, E>
    where
        C: Versioned + ?Sized,
        F: Fn(&'a C, A) -> Result<T, E>,
        E: From<ApiError>,
    {
        self.check(ctx)?;
        (self.operation)(ctx, args)
    }

    /// Run an asynchronous operation after the version check.
    ///
    /// A rejected call never creates the operation's future.
    pub async fn call<'a, C, A, Fut, T, E>(&self, ctx: &'a C, args: A) -> Result<T, E>
    where
        C: Versioned + ?Sized,
        F: Fn(&'a C, A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ApiError>,
    {
        self.check(ctx)?;
        (self.operation)(ctx, args).await
    }
}
