//! Local server discovery
//!
//! Checks a fixed set of host:port pairs with a TCP connect. A port that
//! accepts a connection is reported as a candidate server; no protocol
//! handshake is attempted.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Connect budget per address; the executor bounds the whole scan separately
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredInstance {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for DiscoveredInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(&self) -> Vec<DiscoveredInstance>;
}

#[derive(Debug, Clone)]
pub struct TcpDiscoverer {
    hosts: Vec<String>,
    ports: Vec<u16>,
}

impl TcpDiscoverer {
    pub fn new(hosts: Vec<String>, ports: Vec<u16>) -> Self {
        Self { hosts, ports }
    }

    fn candidates(&self) -> Vec<DiscoveredInstance> {
        self.hosts
            .iter()
            .flat_map(|host| {
                self.ports.iter().map(move |&port| DiscoveredInstance {
                    host: host.clone(),
                    port,
                })
            })
            .collect()
    }
}

async fn check(candidate: DiscoveredInstance) -> Option<DiscoveredInstance> {
    let addr = (candidate.host.as_str(), candidate.port);
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => Some(candidate),
        Ok(Err(e)) => {
            debug!(%candidate, error = %e, "connect refused");
            None
        }
        Err(_) => {
            debug!(%candidate, "connect timed out");
            None
        }
    }
}

#[async_trait]
impl Discoverer for TcpDiscoverer {
    /// Open candidates in scan order
    async fn discover(&self) -> Vec<DiscoveredInstance> {
        let checks = self.candidates().into_iter().map(check);
        futures::future::join_all(checks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_candidates_cover_every_pair() {
        let d = TcpDiscoverer::new(
            vec!["127.0.0.1".into(), "localhost".into()],
            vec![5432, 5433],
        );
        assert_eq!(d.candidates().len(), 4);
        assert_eq!(d.candidates()[1].to_string(), "127.0.0.1:5433");
    }

    #[tokio::test]
    async fn test_discovers_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        // Bind then drop to get a port that is very likely closed
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let d = TcpDiscoverer::new(vec!["127.0.0.1".into()], vec![closed, open]);
        let found = d.discover().await;
        assert_eq!(
            found,
            vec![DiscoveredInstance {
                host: "127.0.0.1".into(),
                port: open
            }]
        );
    }
}
