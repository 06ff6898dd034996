//! Connect string parsing
//!
//! Format: `host1[:port1],host2[:port2],...[/chroot]`

use std::fmt;

use ensemble_core::{Error, Result};

use crate::paths;

/// Port used when an entry omits one
pub const DEFAULT_PORT: u16 = 2181;

/// A single ensemble member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parsed ensemble connect string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleAddress {
    servers: Vec<ServerAddress>,
    chroot: Option<String>,
}

impl EnsembleAddress {
    /// Parse a connect string
    pub fn parse(connect_string: &str) -> Result<Self> {
        let fail = |reason: String| Error::InvalidConnectString {
            connect_string: connect_string.to_string(),
            reason,
        };

        let (hosts, chroot) = match connect_string.find('/') {
            Some(idx) => (&connect_string[..idx], Some(&connect_string[idx..])),
            None => (connect_string, None),
        };

        let chroot = match chroot {
            None | Some("/") => None,
            Some(path) => {
                paths::validate_path(path).map_err(|e| fail(format!("bad chroot: {}", e)))?;
                Some(path.to_string())
            }
        };

        let mut servers = Vec::new();
        for entry in hosts.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(fail("empty server entry".to_string()));
            }

            let (host, port) = match entry.rsplit_once(':') {
                Some((host, port)) => {
                    let port: u16 = port
                        .parse()
                        .map_err(|_| fail(format!("invalid port {:?}", port)))?;
                    (host, port)
                }
                None => (entry, DEFAULT_PORT),
            };

            if host.is_empty() {
                return Err(fail(format!("missing host in {:?}", entry)));
            }
            if port == 0 {
                return Err(fail(format!("port 0 in {:?}", entry)));
            }

            servers.push(ServerAddress {
                host: host.to_string(),
                port,
            });
        }

        Ok(Self { servers, chroot })
    }

    /// Ensemble members in connect-string order
    pub fn servers(&self) -> &[ServerAddress] {
        &self.servers
    }

    /// Server-side root applied by the ensemble, if any
    pub fn chroot(&self) -> Option<&str> {
        self.chroot.as_deref()
    }
}

impl fmt::Display for EnsembleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, server) in self.servers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", server)?;
        }
        if let Some(chroot) = &self.chroot {
            f.write_str(chroot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_servers() {
        let address = EnsembleAddress::parse("host1:2181,host2:2182").unwrap();
        assert_eq!(
            address.servers(),
            &[
                ServerAddress {
                    host: "host1".to_string(),
                    port: 2181
                },
                ServerAddress {
                    host: "host2".to_string(),
                    port: 2182
                },
            ]
        );
        assert!(address.chroot().is_none());
    }

    #[test]
    fn test_default_port_and_chroot() {
        let address = EnsembleAddress::parse("zk1,zk2:3000/apps/billing").unwrap();
        assert_eq!(address.servers()[0].port, DEFAULT_PORT);
        assert_eq!(address.servers()[1].port, 3000);
        assert_eq!(address.chroot(), Some("/apps/billing"));
        assert_eq!(address.to_string(), "zk1:2181,zk2:3000/apps/billing");
    }

    #[test]
    fn test_root_chroot_is_ignored() {
        let address = EnsembleAddress::parse("zk1:2181/").unwrap();
        assert!(address.chroot().is_none());
    }

    #[test]
    fn test_malformed_connect_strings() {
        for bad in ["", "host1:2181,", ":2181", "host:port", "host:0", "host:99999", "h/a//b"] {
            let result = EnsembleAddress::parse(bad);
            assert!(
                matches!(result, Err(Error::InvalidConnectString { .. })),
                "{bad:?} should not parse"
            );
        }
    }
}
