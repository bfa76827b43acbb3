//! In-crate fakes for every collaborator of a boot cycle.
//!
//! Each fake is cheap to clone and clones share state, so a test can hand
//! one copy to the controller and keep another to observe it. Fakes that
//! touch the outside world append to an optional shared [`Journal`] so
//! tests can assert on ordering across collaborators.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::Clock;
use crate::cloud::CloudFeed;
use crate::connectivity::{Link, Prober};
use crate::error::{FetchError, TransportError};
use crate::relay::OutputPin;
use crate::retained::RetainedMemory;
use crate::schedule::Schedule;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<&'static str>>>);

impl Journal {
    pub fn push(&self, event: &'static str) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| *e == event)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

const SLEEP_ADVANCES: u8 = 0;
const SLEEP_STALLS: u8 = 1;
const SLEEP_PANICS: u8 = 2;

/// Virtual time: `sleep` advances the clock instantly.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<AtomicI64>,
    slept: Arc<Mutex<Vec<Duration>>>,
    mode: Arc<AtomicU8>,
    sync_ok: Arc<AtomicBool>,
    syncs: Arc<AtomicU32>,
    sync_to: Arc<AtomicI64>,
}

impl FakeClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
            slept: Arc::default(),
            mode: Arc::new(AtomicU8::new(SLEEP_ADVANCES)),
            sync_ok: Arc::new(AtomicBool::new(true)),
            syncs: Arc::default(),
            sync_to: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn stall_sleeps(&self) {
        self.mode.store(SLEEP_STALLS, Ordering::SeqCst);
    }

    pub fn panic_on_sleep(&self) {
        self.mode.store(SLEEP_PANICS, Ordering::SeqCst);
    }

    pub fn fail_sync(&self) {
        self.sync_ok.store(false, Ordering::SeqCst);
    }

    /// Make a successful sync jump the clock to `ts`.
    pub fn sync_to(&self, ts: i64) {
        self.sync_to.store(ts, Ordering::SeqCst);
    }

    pub fn syncs(&self) -> u32 {
        self.syncs.load(Ordering::SeqCst)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        match self.mode.load(Ordering::SeqCst) {
            SLEEP_STALLS => std::future::pending::<()>().await,
            SLEEP_PANICS => panic!("simulated fault during wait"),
            _ => {}
        }
        self.slept.lock().unwrap().push(duration);
        self.now
            .fetch_add(duration.as_secs() as i64, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }

    async fn synchronise(&self, _attempts: u32) -> bool {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        let ok = self.sync_ok.load(Ordering::SeqCst);
        let target = self.sync_to.load(Ordering::SeqCst);
        if ok && target != 0 {
            self.now.store(target, Ordering::SeqCst);
        }
        ok
    }
}

// ---------------------------------------------------------------------------
// Output pin
// ---------------------------------------------------------------------------

/// Records every successful write. A failed write is not recorded.
#[derive(Clone, Default)]
pub struct FakePin {
    history: Arc<Mutex<Vec<bool>>>,
    fail_on: Arc<AtomicBool>,
    journal: Journal,
}

impl FakePin {
    pub fn with_journal(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }

    /// Make every attempt to switch the pump on fail.
    pub fn fail_activation(&self) {
        self.fail_on.store(true, Ordering::SeqCst);
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.lock().unwrap().clone()
    }

    /// Only the writes that switched the pump on.
    pub fn activations(&self) -> usize {
        self.history().iter().filter(|on| **on).count()
    }

    pub fn is_active(&self) -> bool {
        self.history().last().copied().unwrap_or(false)
    }
}

impl OutputPin for FakePin {
    fn set_active(&mut self, on: bool) -> anyhow::Result<()> {
        if on && self.fail_on.load(Ordering::SeqCst) {
            anyhow::bail!("simulated GPIO fault");
        }
        self.history.lock().unwrap().push(on);
        self.journal.push(if on { "pin:on" } else { "pin:off" });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum LinkMode {
    Connected,
    AfterPolls(u32),
    Never,
}

struct LinkState {
    mode: LinkMode,
    associated: bool,
    polls: u32,
    associations: u32,
}

#[derive(Clone)]
pub struct FakeLink(Arc<Mutex<LinkState>>);

impl FakeLink {
    fn with_mode(mode: LinkMode) -> Self {
        Self(Arc::new(Mutex::new(LinkState {
            mode,
            associated: false,
            polls: 0,
            associations: 0,
        })))
    }

    pub fn connected() -> Self {
        Self::with_mode(LinkMode::Connected)
    }

    /// Reports disconnected for the first `n` polls after association starts.
    pub fn after_polls(n: u32) -> Self {
        Self::with_mode(LinkMode::AfterPolls(n))
    }

    pub fn never() -> Self {
        Self::with_mode(LinkMode::Never)
    }

    pub fn associations(&self) -> u32 {
        self.0.lock().unwrap().associations
    }
}

impl Link for FakeLink {
    fn is_connected(&self) -> bool {
        let mut st = self.0.lock().unwrap();
        match st.mode {
            LinkMode::Connected => true,
            LinkMode::Never => false,
            LinkMode::AfterPolls(n) => {
                if !st.associated {
                    return false;
                }
                st.polls += 1;
                st.polls > n
            }
        }
    }

    fn begin_association(&mut self) {
        let mut st = self.0.lock().unwrap();
        st.associated = true;
        st.associations += 1;
    }
}

#[derive(Clone)]
pub struct FakeProber {
    reachable: Arc<AtomicBool>,
    /// Probes answered before the host becomes unreachable; `None` = forever.
    budget: Option<u32>,
    probes: Arc<AtomicU32>,
    journal: Journal,
}

impl FakeProber {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
            budget: None,
            probes: Arc::default(),
            journal: Journal::default(),
        }
    }

    /// Reachable for the first `n` probes only.
    pub fn reachable_for(n: u32) -> Self {
        Self {
            budget: Some(n),
            ..Self::new(true)
        }
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Prober for FakeProber {
    async fn probe(&self) -> Result<(), TransportError> {
        let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.push("probe");
        let within_budget = self.budget.map_or(true, |budget| n <= budget);
        if within_budget && self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Timeout)
        }
    }
}

// ---------------------------------------------------------------------------
// Cloud channel
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct FakeFeed {
    latest: Arc<Mutex<Option<Schedule>>>,
    publish_fails: Arc<AtomicBool>,
    published: Arc<Mutex<Vec<Schedule>>>,
    fetches: Arc<AtomicU32>,
    journal: Journal,
}

impl FakeFeed {
    /// A channel whose latest entry is `latest`; `None` makes fetches fail.
    pub fn new(latest: Option<Schedule>) -> Self {
        Self {
            latest: Arc::new(Mutex::new(latest)),
            publish_fails: Arc::default(),
            published: Arc::default(),
            fetches: Arc::default(),
            journal: Journal::default(),
        }
    }

    pub fn failing() -> Self {
        Self::new(None)
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }

    pub fn fail_publishes(&self) {
        self.publish_fails.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Schedule> {
        self.published.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl CloudFeed for FakeFeed {
    async fn fetch_latest(&self) -> Result<Schedule, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.journal.push("feed:fetch");
        let latest = self.latest.lock().unwrap().clone();
        latest.ok_or(FetchError::Transport(TransportError::Timeout))
    }

    async fn publish(&self, schedule: &Schedule) -> Result<(), TransportError> {
        self.journal.push("feed:publish");
        if self.publish_fails.load(Ordering::SeqCst) {
            return Err(TransportError::Status(500));
        }
        self.published.lock().unwrap().push(schedule.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Retained memory
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct VecMemory {
    data: Arc<Mutex<Vec<u8>>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    journal: Journal,
}

impl VecMemory {
    pub fn with_bytes(bytes: &[u8]) -> Self {
        Self {
            data: Arc::new(Mutex::new(bytes.to_vec())),
            ..Self::default()
        }
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = journal.clone();
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl RetainedMemory for VecMemory {
    fn read(&self) -> io::Result<Vec<u8>> {
        if self.fail_reads {
            return Err(io::Error::other("simulated read fault"));
        }
        Ok(self.bytes())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.journal.push("retained:write");
        if self.fail_writes {
            return Err(io::Error::other("simulated write fault"));
        }
        *self.data.lock().unwrap() = bytes.to_vec();
        Ok(())
    }
}
