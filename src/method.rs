//! HTTP verbs a route can be bound to.
//!
//! Only the five verbs of a JSON API are routable. Route registration takes
//! them as lowercase tokens (`"get,post"`); anything else is not a [`Method`].

use std::fmt;
use std::str::FromStr;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Returns the lowercase registration token (e.g. `"get"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Get    => "get",
            Self::Patch  => "patch",
            Self::Post   => "post",
            Self::Put    => "put",
        }
    }

    /// Maps an incoming request method; `None` for verbs no route can match.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::DELETE => Some(Self::Delete),
            http::Method::GET    => Some(Self::Get),
            http::Method::PATCH  => Some(Self::Patch),
            http::Method::POST   => Some(Self::Post),
            http::Method::PUT    => Some(Self::Put),
            _                    => None,
        }
    }
}

/// Parses a registration token. Surrounding whitespace is ignored and case
/// does not matter, so `" POST "` is [`Method::Post`].
impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "get"    => Ok(Self::Get),
            "patch"  => Ok(Self::Patch),
            "post"   => Ok(Self::Post),
            "put"    => Ok(Self::Put),
            _        => Err(UnsupportedMethod(s.trim().to_owned())),
        }
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Delete => http::Method::DELETE,
            Method::Get    => http::Method::GET,
            Method::Patch  => http::Method::PATCH,
            Method::Post   => http::Method::POST,
            Method::Put    => http::Method::PUT,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verb token outside {get, post, put, patch, delete}.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unsupported http method `{0}`")]
pub struct UnsupportedMethod(pub String);
