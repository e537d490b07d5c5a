//! Server base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated RESTCONF server base URL.
///
/// Must be an absolute `http://` or `https://` URL with a host. A missing
/// port is normalized away (the URL keeps whatever the scheme implies).
///
/// # Example
///
/// ```
/// use yanghook_core::ServerUrl;
///
/// let server = ServerUrl::new("http://10.0.0.5:8080").unwrap();
/// assert_eq!(server.join("/restconf"), "http://10.0.0.5:8080/restconf");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerUrl(Url);

impl ServerUrl {
    /// Create a new server URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not absolute http/https with a host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ServerUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        // Normalize: remove trailing slash
        let normalized = if url.path() == "/" {
            let mut u = url.clone();
            u.set_path("");
            u
        } else {
            url
        };

        Ok(Self(normalized))
    }

    /// Returns the base URL joined with an absolute path.
    pub fn join(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}{}", base, path)
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns the URL scheme.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Rebase an advertised location URL onto this server.
    ///
    /// Stream locations advertised by the server often point at
    /// `localhost`, or at a port that is only valid inside a container.
    /// The scheme, host, and port are replaced with this server's; the
    /// path and query are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the location is not a parseable absolute URL.
    pub fn rebase(&self, location: &str) -> Result<Url, Error> {
        let mut url = Url::parse(location).map_err(|e| InvalidInputError::ServerUrl {
            value: location.to_string(),
            reason: e.to_string(),
        })?;

        url.set_scheme(self.0.scheme())
            .map_err(|_| InvalidInputError::ServerUrl {
                value: location.to_string(),
                reason: "cannot apply server scheme".to_string(),
            })?;
        url.set_host(self.0.host_str())
            .map_err(|e| InvalidInputError::ServerUrl {
                value: location.to_string(),
                reason: e.to_string(),
            })?;
        url.set_port(self.0.port())
            .map_err(|_| InvalidInputError::ServerUrl {
                value: location.to_string(),
                reason: "cannot apply server port".to_string(),
            })?;

        Ok(url)
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(InvalidInputError::ServerUrl {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(InvalidInputError::ServerUrl {
                value: original.to_string(),
                reason: "must use http or https".to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidInputError::ServerUrl {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServerUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ServerUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ServerUrl::new(&s).map_err(serde::de::Error::custom)
    }
}
