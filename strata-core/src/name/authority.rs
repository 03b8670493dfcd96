//! Parsing of the `//[userinfo@]host[:port]` authority component.

use crate::error::{Result, VfsError};
use crate::name::parser;
use std::fmt;

/// The authority component of a network-style name.
///
/// Password components are never written to diagnostic output; `Display`
/// masks them as `:***`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl Authority {
    /// Parses an authority out of the text between `//` and the first `/`.
    pub fn parse(uri: &str, raw: &str) -> Result<Authority> {
        let (userinfo, hostport) = match raw.rfind('@') {
            Some(pos) => (Some(&raw[..pos]), &raw[pos + 1..]),
            None => (None, raw),
        };

        let (user, password) = match userinfo {
            Some(info) => match info.find(':') {
                Some(pos) => (
                    Some(parser::decode(&info[..pos])?),
                    Some(parser::decode(&info[pos + 1..])?),
                ),
                None => (Some(parser::decode(info)?), None),
            },
            None => (None, None),
        };

        let (host, port) = match hostport.rfind(':') {
            Some(pos) => {
                let port = hostport[pos + 1..]
                    .parse::<u16>()
                    .map_err(|_| VfsError::MalformedUri {
                        uri: uri.to_string(),
                        reason: format!("invalid port '{}'", &hostport[pos + 1..]),
                    })?;
                (hostport[..pos].to_string(), Some(port))
            }
            None => (hostport.to_string(), None),
        };

        if host.is_empty() {
            return Err(VfsError::MalformedUri {
                uri: uri.to_string(),
                reason: "empty host".to_string(),
            });
        }

        Ok(Authority {
            user,
            password,
            host: parser::decode(&host)?,
            port,
        })
    }

    /// Appends this authority to a URI buffer.
    ///
    /// The password is included only when `with_password` is set; otherwise
    /// it is masked.
    pub fn append_to(&self, buffer: &mut String, with_password: bool) {
        if let Some(user) = &self.user {
            buffer.push_str(&parser::encode(user, &['@', ':', '/']));
            if let Some(password) = &self.password {
                buffer.push(':');
                if with_password {
                    buffer.push_str(&parser::encode(password, &['@', ':', '/']));
                } else {
                    buffer.push_str("***");
                }
            }
            buffer.push('@');
        }
        buffer.push_str(&self.host);
        if let Some(port) = self.port {
            buffer.push(':');
            buffer.push_str(&port.to_string());
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buffer = String::new();
        self.append_to(&mut buffer, false);
        write!(f, "{}", buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_only() {
        let auth = Authority::parse("ftp://example.org/a", "example.org").unwrap();
        assert_eq!(auth.host, "example.org");
        assert_eq!(auth.port, None);
        assert_eq!(auth.user, None);
    }

    #[test]
    fn test_parse_full() {
        let auth = Authority::parse("ftp://u:p@h:2121/a", "u:p@h:2121").unwrap();
        assert_eq!(auth.user.as_deref(), Some("u"));
        assert_eq!(auth.password.as_deref(), Some("p"));
        assert_eq!(auth.host, "h");
        assert_eq!(auth.port, Some(2121));
    }

    #[test]
    fn test_parse_rejects_bad_port_and_empty_host() {
        assert!(Authority::parse("ftp://h:x/a", "h:x").is_err());
        assert!(Authority::parse("ftp://:21/a", ":21").is_err());
    }

    #[test]
    fn test_password_is_masked_in_display() {
        let auth = Authority::parse("ftp://u:secret@h/a", "u:secret@h").unwrap();
        assert_eq!(auth.to_string(), "u:***@h");

        let mut with = String::new();
        auth.append_to(&mut with, true);
        assert_eq!(with, "u:secret@h");
    }

    #[test]
    fn test_percent_decoded_userinfo() {
        let auth = Authority::parse("ftp://a%40b:p@h/", "a%40b:p@h").unwrap();
        assert_eq!(auth.user.as_deref(), Some("a@b"));
    }
}
