//! Connectivity gate: network association plus an internet reachability
//! probe, folded into one verdict per boot.

use std::future::Future;
use std::time::Duration;

use sysinfo::Networks;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::TransportError;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Network association (e.g. joining a WiFi access point).
pub trait Link {
    fn is_connected(&self) -> bool;

    /// Start associating. Completion is observed through `is_connected`.
    fn begin_association(&mut self);
}

/// One reachability check against a well-known external host.
pub trait Prober {
    fn probe(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Offline,
    OnlineNoInternet,
    OnlineWithInternet,
}

impl Verdict {
    pub fn cloud_available(self) -> bool {
        self == Self::OnlineWithInternet
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

pub struct ConnectivityGate<L, P> {
    link: L,
    prober: P,
    backoff: Duration,
}

impl<L: Link, P: Prober> ConnectivityGate<L, P> {
    pub fn new(link: L, prober: P, backoff: Duration) -> Self {
        Self {
            link,
            prober,
            backoff,
        }
    }

    /// Associate with the network, polling at most `max_attempts` times.
    pub async fn establish<C: Clock>(&mut self, clock: &C, max_attempts: u32) -> bool {
        if self.link.is_connected() {
            return true;
        }

        self.link.begin_association();
        let mut attempt = 0;
        while !self.link.is_connected() && attempt < max_attempts {
            info!(attempt, max_attempts, "connecting to network");
            attempt += 1;
            clock.sleep(self.backoff).await;
        }

        let connected = self.link.is_connected();
        if !connected {
            warn!(max_attempts, "network association failed");
        }
        connected
    }

    /// Check internet reachability. Faults mean "not reachable".
    pub async fn probe_internet(&self) -> bool {
        match self.prober.probe().await {
            Ok(()) => true,
            Err(e) => {
                warn!("internet unreachable: {e}");
                false
            }
        }
    }

    /// Establish, then probe only if associated.
    pub async fn verdict<C: Clock>(&mut self, clock: &C, max_attempts: u32) -> Verdict {
        let verdict = if !self.establish(clock, max_attempts).await {
            Verdict::Offline
        } else if self.probe_internet().await {
            Verdict::OnlineWithInternet
        } else {
            Verdict::OnlineNoInternet
        };
        info!(?verdict, "connectivity");
        verdict
    }
}

// ---------------------------------------------------------------------------
// Host implementations
// ---------------------------------------------------------------------------

/// Treats the host as associated when a network interface has seen traffic.
/// The operating system owns the actual association.
pub struct HostLink {
    interface: Option<String>,
}

impl HostLink {
    /// `interface = None` accepts any non-loopback interface.
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }
}

impl Link for HostLink {
    fn is_connected(&self) -> bool {
        let networks = Networks::new_with_refreshed_list();
        networks.iter().any(|(name, data)| {
            let wanted = match &self.interface {
                Some(iface) => name == iface,
                None => !name.starts_with("lo"),
            };
            wanted && data.total_received() > 0
        })
    }

    fn begin_association(&mut self) {
        info!(interface = ?self.interface, "waiting for host network");
    }
}

/// `HEAD` request to a fixed URL.
pub struct HttpProber {
    client: reqwest::Client,
    url: String,
}

impl HttpProber {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

impl Prober for HttpProber {
    async fn probe(&self) -> Result<(), TransportError> {
        self.client.head(&self.url).send().await?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClock, FakeLink, FakeProber};

    const T0: i64 = 1_700_000_000;

    fn gate(link: FakeLink, reachable: bool) -> ConnectivityGate<FakeLink, FakeProber> {
        ConnectivityGate::new(link, FakeProber::new(reachable), Duration::from_secs(3))
    }

    #[tokio::test]
    async fn already_connected_returns_immediately() {
        let clock = FakeClock::new(T0);
        let link = FakeLink::connected();
        let mut g = gate(link.clone(), true);
        assert!(g.establish(&clock, 5).await);
        assert_eq!(clock.now(), T0);
        assert_eq!(link.associations(), 0);
    }

    #[tokio::test]
    async fn connects_after_some_polls() {
        let clock = FakeClock::new(T0);
        let link = FakeLink::after_polls(2);
        let mut g = gate(link.clone(), true);
        assert!(g.establish(&clock, 5).await);
        assert_eq!(link.associations(), 1);
        assert_eq!(clock.now(), T0 + 6, "two 3s backoffs");
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let clock = FakeClock::new(T0);
        let mut g = gate(FakeLink::never(), true);
        assert!(!g.establish(&clock, 5).await);
        assert_eq!(clock.now(), T0 + 15, "five 3s backoffs, no more");
    }

    #[tokio::test]
    async fn zero_attempts_never_waits() {
        let clock = FakeClock::new(T0);
        let mut g = gate(FakeLink::never(), true);
        assert!(!g.establish(&clock, 0).await);
        assert_eq!(clock.now(), T0);
    }

    #[tokio::test]
    async fn probe_fault_means_unreachable() {
        let g = gate(FakeLink::connected(), false);
        assert!(!g.probe_internet().await);
    }

    #[tokio::test]
    async fn verdicts() {
        let clock = FakeClock::new(T0);

        let mut g = gate(FakeLink::never(), true);
        assert_eq!(g.verdict(&clock, 1).await, Verdict::Offline);

        let mut g = gate(FakeLink::connected(), false);
        assert_eq!(g.verdict(&clock, 1).await, Verdict::OnlineNoInternet);

        let mut g = gate(FakeLink::connected(), true);
        assert_eq!(g.verdict(&clock, 1).await, Verdict::OnlineWithInternet);
    }

    #[tokio::test]
    async fn offline_does_not_probe() {
        let clock = FakeClock::new(T0);
        let prober = FakeProber::new(true);
        let mut g = ConnectivityGate::new(FakeLink::never(), prober.clone(), Duration::ZERO);
        g.verdict(&clock, 2).await;
        assert_eq!(prober.probes(), 0);
    }

    #[test]
    fn only_full_connectivity_is_cloud_available() {
        assert!(!Verdict::Offline.cloud_available());
        assert!(!Verdict::OnlineNoInternet.cloud_available());
        assert!(Verdict::OnlineWithInternet.cloud_available());
    }
}
