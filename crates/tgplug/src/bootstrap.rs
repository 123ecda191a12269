//! Host bus registration.
//!
//! Plugs load before the host exposes its registration bus. Readiness is
//! awaited with a bounded number of checks and exponential backoff, then the
//! plug registers exactly once.

use std::time::Duration;

use serde::Serialize;

use crate::types::{PlugError, PlugResult};

/// The host's plug registration bus.
pub trait ModBus {
    /// Whether the bus is exposed yet.
    fn is_ready(&self) -> bool;

    /// Register a plug id. Returns false when the host refuses it.
    fn register(&self, tguid: &str) -> bool;
}

/// Identity a plug registers under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlugManifest {
    pub tguid: String,
    pub name: String,
    pub version: String,
    pub author: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

impl PlugManifest {
    /// The DevKit diagnostic overlay.
    pub fn devkit() -> Self {
        Self {
            tguid: "workshop.shaman.devkitui".into(),
            name: "Shaman's DevKit".into(),
            version: "3.1-beta6".into(),
            author: "Shaman's Workshop".into(),
            kind: "system_monitor".into(),
            description: "Deep system monitoring for TGBrowser Beta 6 Architecture".into(),
        }
    }

    /// The low-spec performance ritual.
    pub fn performance() -> Self {
        Self {
            tguid: "workshop.shaman.performance".into(),
            name: "Performance Ritual".into(),
            version: "1.0".into(),
            author: "Master Shaman".into(),
            kind: "optimizer".into(),
            description: "Switches low-end devices to the Low-Spec ritual".into(),
        }
    }
}

/// How long to wait for the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed check (1-based), doubling and capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Wait until the bus is ready. Returns the number of checks it took.
pub async fn await_host_ready<B: ModBus + ?Sized>(bus: &B, policy: &RetryPolicy) -> PlugResult<u32> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if bus.is_ready() {
            tracing::debug!("Host bus ready after {attempt} check(s)");
            return Ok(attempt);
        }
        if attempt < max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    tracing::warn!("Host bus not ready after {max_attempts} checks");
    Err(PlugError::HostUnavailable {
        attempts: max_attempts,
    })
}

/// Wait for the bus, then register the manifest once.
pub async fn register_plug<B: ModBus + ?Sized>(
    bus: &B,
    manifest: &PlugManifest,
    policy: &RetryPolicy,
) -> PlugResult<u32> {
    let attempts = await_host_ready(bus, policy).await?;

    if !bus.register(&manifest.tguid) {
        tracing::error!("[{}] Registration failed", manifest.name);
        return Err(PlugError::RegistrationRejected(manifest.tguid.clone()));
    }

    tracing::info!("[{}] Linked to host bus - v{}", manifest.name, manifest.version);
    Ok(attempts)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    struct FakeBus {
        ready_after: u32,
        checks: AtomicU32,
        accept: bool,
        registered: Mutex<Vec<String>>,
    }

    impl FakeBus {
        fn new(ready_after: u32, accept: bool) -> Self {
            Self {
                ready_after,
                checks: AtomicU32::new(0),
                accept,
                registered: Mutex::new(Vec::new()),
            }
        }
    }

    impl ModBus for FakeBus {
        fn is_ready(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_after
        }

        fn register(&self, tguid: &str) -> bool {
            self.registered.lock().unwrap().push(tguid.to_string());
            self.accept
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(4), Duration::from_millis(800));
        assert_eq!(policy.delay_after(6), Duration::from_secs(2));
        assert_eq!(policy.delay_after(40), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately() {
        let bus = FakeBus::new(1, true);
        let start = tokio::time::Instant::now();
        assert_eq!(await_host_ready(&bus, &RetryPolicy::default()).await.unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_until_ready() {
        let bus = FakeBus::new(4, true);
        let start = tokio::time::Instant::now();
        let attempts = await_host_ready(&bus, &RetryPolicy::default()).await.unwrap();
        assert_eq!(attempts, 4);
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let bus = FakeBus::new(u32::MAX, true);
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let err = await_host_ready(&bus, &policy).await.unwrap_err();
        assert!(matches!(err, PlugError::HostUnavailable { attempts: 3 }));
        assert_eq!(bus.checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_once() {
        let bus = FakeBus::new(2, true);
        let manifest = PlugManifest::performance();
        register_plug(&bus, &manifest, &RetryPolicy::default()).await.unwrap();
        assert_eq!(*bus.registered.lock().unwrap(), vec!["workshop.shaman.performance"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_rejected() {
        let bus = FakeBus::new(1, false);
        let err = register_plug(&bus, &PlugManifest::devkit(), &RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlugError::RegistrationRejected(id) if id == "workshop.shaman.devkitui"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_host_never_registers() {
        let bus = FakeBus::new(u32::MAX, true);
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        assert!(register_plug(&bus, &PlugManifest::devkit(), &policy).await.is_err());
        assert!(bus.registered.lock().unwrap().is_empty());
    }
}
