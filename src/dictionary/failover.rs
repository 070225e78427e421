//! Ordered failover over interchangeable remote endpoints / 远程端点故障转移
//!
//! Endpoints are tried one at a time in `order`. Each attempt gets its own
//! timeout; a failed or timed-out attempt advances to the next endpoint.
//! Running out of endpoints is a normal outcome, not an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LookupError, LookupResult};

/// One remote service in the chain / 链中的一个端点
pub struct Endpoint<T: ?Sized> {
    pub name: String,
    pub timeout: Duration,
    pub order: i32,
    pub enabled: bool,
    pub service: Arc<T>,
}

impl<T: ?Sized> Endpoint<T> {
    pub fn new(name: impl Into<String>, service: Arc<T>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            order: 0,
            enabled: true,
            service,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// Result of walking the chain
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome<R> {
    Success {
        value: R,
        endpoint: String,
        attempts: usize,
    },
    Exhausted {
        attempts: usize,
        /// At least one endpoint answered "no such entry" (as opposed to failing)
        definitive_miss: bool,
    },
}

pub struct FailoverChain<T: ?Sized> {
    endpoints: Vec<Endpoint<T>>,
}

impl<T: ?Sized> Default for FailoverChain<T> {
    fn default() -> Self {
        Self { endpoints: Vec::new() }
    }
}

impl<T: ?Sized> FailoverChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint; smaller `order` is tried first / 按 order 排序
    pub fn add(&mut self, endpoint: Endpoint<T>) {
        self.endpoints.push(endpoint);
        self.endpoints.sort_by_key(|e| e.order);
    }

    pub fn with(mut self, endpoint: Endpoint<T>) -> Self {
        self.add(endpoint);
        self
    }

    pub fn len(&self) -> usize {
        self.endpoints.iter().filter(|e| e.enabled).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<&str> {
        self.endpoints.iter().filter(|e| e.enabled).map(|e| e.name.as_str()).collect()
    }

    /// Walk enabled endpoints until one yields `Some`.
    ///
    /// `Ok(None)` marks a definitive miss from that endpoint; the chain still
    /// advances so mirrors with fresher data get a chance.
    pub async fn run<R, F, Fut>(&self, mut attempt: F) -> ChainOutcome<R>
    where
        F: FnMut(Arc<T>) -> Fut,
        Fut: Future<Output = LookupResult<Option<R>>>,
    {
        let mut attempts = 0;
        let mut definitive_miss = false;

        for endpoint in self.endpoints.iter().filter(|e| e.enabled) {
            attempts += 1;
            match tokio::time::timeout(endpoint.timeout, attempt(endpoint.service.clone())).await {
                Ok(Ok(Some(value))) => {
                    tracing::debug!("Endpoint {} answered (attempt {})", endpoint.name, attempts);
                    return ChainOutcome::Success {
                        value,
                        endpoint: endpoint.name.clone(),
                        attempts,
                    };
                }
                Ok(Ok(None)) => {
                    tracing::debug!("Endpoint {} has no entry, trying next", endpoint.name);
                    definitive_miss = true;
                }
                Ok(Err(e)) => {
                    tracing::warn!("Endpoint {} failed, trying next: {}", endpoint.name, e);
                }
                Err(_) => {
                    let err = LookupError::Timeout {
                        endpoint: endpoint.name.clone(),
                        timeout_ms: endpoint.timeout.as_millis() as u64,
                    };
                    tracing::warn!("{}, trying next", err);
                }
            }
        }

        ChainOutcome::Exhausted { attempts, definitive_miss }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Hang,
        Fail,
        Miss,
        Answer(&'static str),
    }

    struct Fake {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl Fake {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self { behavior, calls: AtomicUsize::new(0) })
        }

        async fn call(&self) -> LookupResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
                Behavior::Fail => Err(LookupError::RemoteFailure {
                    endpoint: "fake".to_string(),
                    reason: "boom".to_string(),
                }),
                Behavior::Miss => Ok(None),
                Behavior::Answer(s) => Ok(Some(s.to_string())),
            }
        }
    }

    fn endpoint(name: &str, fake: &Arc<Fake>, order: i32) -> Endpoint<Fake> {
        Endpoint::new(name, fake.clone(), Duration::from_secs(10)).with_order(order)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_success() {
        let a = Fake::new(Behavior::Hang);
        let b = Fake::new(Behavior::Answer("ok"));
        let chain = FailoverChain::new()
            .with(endpoint("b", &b, 1))
            .with(endpoint("a", &a, 0));

        assert_eq!(chain.names(), vec!["a", "b"]);
        let outcome = chain.run(|svc| async move { svc.call().await }).await;
        assert_eq!(outcome, ChainOutcome::Success {
            value: "ok".to_string(),
            endpoint: "b".to_string(),
            attempts: 2,
        });
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_definitive_miss() {
        let a = Fake::new(Behavior::Fail);
        let b = Fake::new(Behavior::Miss);
        let chain = FailoverChain::new().with(endpoint("a", &a, 0)).with(endpoint("b", &b, 1));
        let outcome = chain.run(|svc| async move { svc.call().await }).await;
        assert_eq!(outcome, ChainOutcome::Exhausted { attempts: 2, definitive_miss: true });

        let only_failures = FailoverChain::new().with(endpoint("a", &a, 0));
        let outcome = only_failures.run(|svc| async move { svc.call().await }).await;
        assert_eq!(outcome, ChainOutcome::Exhausted { attempts: 1, definitive_miss: false });
    }

    #[tokio::test]
    async fn test_disabled_endpoints_are_skipped() {
        let a = Fake::new(Behavior::Answer("a"));
        let b = Fake::new(Behavior::Answer("b"));
        let mut disabled = endpoint("a", &a, 0);
        disabled.enabled = false;
        let chain = FailoverChain::new().with(disabled).with(endpoint("b", &b, 1));

        assert_eq!(chain.len(), 1);
        let outcome = chain.run(|svc| async move { svc.call().await }).await;
        assert!(matches!(outcome, ChainOutcome::Success { ref endpoint, .. } if endpoint == "b"));
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain: FailoverChain<Fake> = FailoverChain::new();
        let outcome = chain.run(|svc| async move { svc.call().await }).await;
        assert_eq!(outcome, ChainOutcome::Exhausted { attempts: 0, definitive_miss: false });
    }
}
