use modstore_api::HeaderError;
use modstore_api::headers::BUNDLE_VERSION;
use std::fmt;
use std::str::FromStr;

/// `major.minor.micro.qualifier` version.
///
/// Ordering compares the numeric parts first, then the qualifier as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Parse an optional header value; absent or blank is `0.0.0`.
    pub fn parse_optional(value: Option<&str>) -> Result<Self, HeaderError> {
        match value {
            Some(v) => v.parse(),
            None => Ok(Self::default()),
        }
    }
}

impl FromStr for Version {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let fail = |reason: &str| HeaderError::new(BUNDLE_VERSION, s, reason);
        let number = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| fail("numeric component expected"))
        };

        let mut parts = trimmed.splitn(4, '.');
        let mut version = Version::default();

        // splitn always yields at least one item
        version.major = number(parts.next().unwrap_or_default())?;
        if let Some(minor) = parts.next() {
            version.minor = number(minor)?;
        }
        if let Some(micro) = parts.next() {
            version.micro = number(micro)?;
        }
        if let Some(qualifier) = parts.next() {
            if qualifier.is_empty() {
                return Err(fail("empty qualifier"));
            }
            if !qualifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(fail("invalid qualifier"));
            }
            version.qualifier = qualifier.to_string();
        }

        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!("1".parse::<Version>().unwrap(), Version::new(1, 0, 0));
        assert_eq!("1.2".parse::<Version>().unwrap(), Version::new(1, 2, 0));
        assert_eq!("1.2.0".parse::<Version>().unwrap().to_string(), "1.2.0");

        let qualified: Version = "1.2.3.v2024-01_rc".parse().unwrap();
        assert_eq!(qualified.qualifier, "v2024-01_rc");
        assert_eq!(qualified.to_string(), "1.2.3.v2024-01_rc");
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!("".parse::<Version>().unwrap(), Version::default());
        assert_eq!(Version::parse_optional(None).unwrap().to_string(), "0.0.0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("1.x".parse::<Version>().is_err());
        assert!("1.".parse::<Version>().is_err());
        assert!("1.2.3.a.b".parse::<Version>().is_err());
        assert!("1.2.3.".parse::<Version>().is_err());
        assert!("-1".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        let a: Version = "1.2.0".parse().unwrap();
        let b: Version = "1.10.0".parse().unwrap();
        let c: Version = "1.10.0.b".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
    }
}
