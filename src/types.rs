use std::net::IpAddr;

/// Shared record a scan writes its winner into.
///
/// Starts empty and is claimed at most once; later claims are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub port: Option<u16>,
    pub detail: String,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `port` as the winner if nothing has been claimed yet.
    ///
    /// Returns `true` when this call won the claim.
    pub fn claim(&mut self, port: u16, detail: impl Into<String>) -> bool {
        if self.port.is_some() {
            return false;
        }
        self.port = Some(port);
        self.detail = detail.into();
        true
    }

    pub fn into_outcome(self) -> ScanOutcome {
        match self.port {
            Some(port) => ScanOutcome::Found(FoundPort {
                port,
                detail: self.detail,
            }),
            None => ScanOutcome::NotFound,
        }
    }
}

/// Port confirmed by the bridge together with the tool's connect output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPort {
    pub port: u16,
    pub detail: String,
}

/// Result of a complete scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(FoundPort),
    /// The whole window was covered without a confirmed port.
    NotFound,
}

impl ScanOutcome {
    pub fn port(&self) -> Option<u16> {
        match self {
            ScanOutcome::Found(found) => Some(found.port),
            ScanOutcome::NotFound => None,
        }
    }
}

/// One `device` line from the bridge's device listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedDevice {
    pub serial: String,
    pub port: Option<u16>,
}

/// Link held by the session once a device is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub address: IpAddr,
    pub port: Option<u16>,
    pub detail: String,
    pub already_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_wins() {
        let mut r = ScanResult::new();
        assert!(r.claim(40001, "connected to 10.0.0.2:40001"));
        assert!(!r.claim(40002, "connected to 10.0.0.2:40002"));
        assert_eq!(r.port, Some(40001));
        assert_eq!(r.detail, "connected to 10.0.0.2:40001");
    }

    #[test]
    fn empty_result_is_not_found() {
        assert_eq!(ScanResult::new().into_outcome(), ScanOutcome::NotFound);
    }

    #[test]
    fn claimed_result_is_found() {
        let mut r = ScanResult::new();
        r.claim(5555, "ok");
        let outcome = r.into_outcome();
        assert_eq!(outcome.port(), Some(5555));
    }
}
