// Request timeout settings shared by the token exchange and platform calls

use reqwest::Client;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 3;

/// How long to wait for the server before giving up
///
/// Either a single bound used for both phases, or a separate connect / read
/// pair. The read bound limits the wait between reads from the socket, not
/// the whole response. The default is 3 seconds for each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Same bound for connecting and for each read
    Total(Duration),
    /// Separate bounds for establishing the connection and reading the response
    Split { connect: Duration, read: Duration },
}

impl Timeout {
    /// Connection establishment bound
    pub fn connect(&self) -> Duration {
        match *self {
            Timeout::Total(total) => total,
            Timeout::Split { connect, .. } => connect,
        }
    }

    /// Longest wait for the next chunk of the response
    pub fn read(&self) -> Duration {
        match *self {
            Timeout::Total(total) => total,
            Timeout::Split { read, .. } => read,
        }
    }

    /// Build an HTTP client bounded by these timeouts
    pub(crate) fn client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect())
            .read_timeout(self.read())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Split {
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(total: Duration) -> Self {
        Timeout::Total(total)
    }
}

impl From<(Duration, Duration)> for Timeout {
    fn from((connect, read): (Duration, Duration)) -> Self {
        Timeout::Split { connect, read }
    }
}
