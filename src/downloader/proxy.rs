//! Proxy pool contract and an in-memory round-robin implementation

use crate::utils::error::{Result, TubeloaderError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// An outbound proxy, identified by its URL (`http://host:port`, `socks5://...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyHandle {
    url: String,
}

impl ProxyHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        Ok(reqwest::Proxy::all(&self.url)?)
    }
}

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Shared proxy pool consulted by the downloader.
///
/// Implementations are called from concurrent downloads and must keep their
/// own rotation/health state consistent.
pub trait ProxyManager: Send + Sync {
    /// Proxy for the next attempt. Successive calls may rotate.
    fn get_proxy(&self) -> ProxyHandle;

    fn record_success(&self, proxy: &ProxyHandle);

    fn record_failure(&self, proxy: &ProxyHandle, error: &TubeloaderError);
}

/// Success/failure counters for one proxy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub successes: u64,
    pub failures: u64,
}

/// Fixed list of proxies handed out round-robin
pub struct RotatingProxyManager {
    proxies: Vec<ProxyHandle>,
    next: AtomicUsize,
    stats: Mutex<HashMap<ProxyHandle, ProxyStats>>,
}

impl RotatingProxyManager {
    pub fn new(proxies: Vec<ProxyHandle>) -> Result<Self> {
        if proxies.is_empty() {
            return Err(TubeloaderError::NoProxies);
        }
        Ok(Self {
            proxies,
            next: AtomicUsize::new(0),
            stats: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_urls<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(urls.into_iter().map(ProxyHandle::new).collect())
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn stats(&self, proxy: &ProxyHandle) -> ProxyStats {
        self.stats
            .lock()
            .map(|stats| stats.get(proxy).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    fn update(&self, proxy: &ProxyHandle, apply: impl FnOnce(&mut ProxyStats)) {
        match self.stats.lock() {
            Ok(mut stats) => apply(stats.entry(proxy.clone()).or_default()),
            Err(e) => warn!("Proxy stats lock poisoned: {}", e),
        }
    }
}

impl ProxyManager for RotatingProxyManager {
    fn get_proxy(&self) -> ProxyHandle {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        self.proxies[index].clone()
    }

    fn record_success(&self, proxy: &ProxyHandle) {
        debug!("Proxy {} succeeded", proxy);
        self.update(proxy, |s| s.successes += 1);
    }

    fn record_failure(&self, proxy: &ProxyHandle, error: &TubeloaderError) {
        debug!("Proxy {} failed: {}", proxy, error);
        self.update(proxy, |s| s.failures += 1);
    }
}
