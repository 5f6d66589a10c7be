//! Bounded-time specialist calls with a deterministic fallback.
//!
//! [`ToolInvoker::invoke`] always returns text. Whether a live specialist
//! exists for a model key is decided once, on first use, and cached; a key
//! whose construction fails stays fallback-only for the life of the process.
//! Each live call races a wall-clock timeout. On timeout the call keeps
//! running detached and its eventual answer is dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use sb_domain::trace::{SpecialistOutcome, TraceEvent};

use super::registry::AgentRegistry;
use super::specialists::{fallback_text, DelegateFactory, Specialist, SpecialistKind, SpecialistRequest};

#[derive(Clone)]
enum Slot {
    Live(Arc<dyn Specialist>),
    FallbackOnly,
}

pub struct ToolInvoker {
    factory: Arc<dyn DelegateFactory>,
    slots: AgentRegistry<Slot>,
    timeout: Duration,
    max_preview_chars: usize,
}

impl ToolInvoker {
    pub fn new(factory: Arc<dyn DelegateFactory>, timeout: Duration, max_preview_chars: usize) -> Self {
        Self {
            factory,
            slots: AgentRegistry::new(),
            timeout,
            max_preview_chars,
        }
    }

    async fn slot(&self, model_key: &str) -> Slot {
        let built = self
            .slots
            .get_or_create(model_key, || async {
                let slot = match self.factory.build(model_key).await {
                    Ok(Some(delegate)) => Slot::Live(delegate),
                    Ok(None) => {
                        tracing::info!(model_key, "no live specialist configured, using fallback");
                        Slot::FallbackOnly
                    }
                    Err(e) => {
                        tracing::warn!(model_key, error = %e, "specialist construction failed, using fallback");
                        Slot::FallbackOnly
                    }
                };
                Ok::<_, std::convert::Infallible>(slot)
            })
            .await;
        match built {
            Ok(slot) => slot,
            Err(never) => match never {},
        }
    }

    /// Run `kind` for `req` on `model_key`. Never fails.
    pub async fn invoke(&self, kind: SpecialistKind, req: &SpecialistRequest, model_key: &str) -> String {
        let span = tracing::info_span!(
            "specialist.call",
            tool = kind.tool_name(),
            model_key,
            outcome = tracing::field::Empty,
        );
        self.invoke_inner(kind, req, model_key)
            .instrument(span)
            .await
    }

    async fn invoke_inner(&self, kind: SpecialistKind, req: &SpecialistRequest, model_key: &str) -> String {
        let start = Instant::now();
        let slot = self.slot(model_key).await;
        TraceEvent::SpecialistAttempt {
            model_key: model_key.to_owned(),
            tool: kind.tool_name().to_owned(),
            live: matches!(slot, Slot::Live(_)),
        }
        .emit();

        let (outcome, answer) = match slot {
            Slot::FallbackOnly => (SpecialistOutcome::Fallback, None),
            Slot::Live(delegate) => {
                let owned = req.clone();
                let handle = tokio::spawn(
                    async move { delegate.call(kind, &owned).await }.in_current_span(),
                );
                match tokio::time::timeout(self.timeout, handle).await {
                    Ok(Ok(Ok(text))) if !text.trim().is_empty() => (SpecialistOutcome::Live, Some(text)),
                    Ok(Ok(Ok(_))) => {
                        tracing::warn!(model_key, "specialist returned an empty answer");
                        (SpecialistOutcome::Error, None)
                    }
                    Ok(Ok(Err(e))) => {
                        tracing::warn!(model_key, error = %e, "specialist call failed");
                        (SpecialistOutcome::Error, None)
                    }
                    Ok(Err(join_err)) => {
                        tracing::error!(model_key, error = %join_err, "specialist task aborted");
                        (SpecialistOutcome::Error, None)
                    }
                    Err(_) => {
                        tracing::warn!(
                            model_key,
                            timeout_secs = self.timeout.as_secs(),
                            "specialist timed out, detaching call"
                        );
                        (SpecialistOutcome::Timeout, None)
                    }
                }
            }
        };

        tracing::Span::current().record("outcome", tracing::field::debug(outcome));
        TraceEvent::SpecialistOutcome {
            model_key: model_key.to_owned(),
            tool: kind.tool_name().to_owned(),
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        answer.unwrap_or_else(|| fallback_text(kind, req, self.max_preview_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sb_domain::error::{Error, Result};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Never;

    #[async_trait]
    impl Specialist for Never {
        async fn call(&self, _: SpecialistKind, _: &SpecialistRequest) -> Result<String> {
            std::future::pending().await
        }
    }

    struct Late {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Specialist for Late {
        async fn call(&self, _: SpecialistKind, _: &SpecialistRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok("late answer".into())
        }
    }

    struct Echo;

    #[async_trait]
    impl Specialist for Echo {
        async fn call(&self, kind: SpecialistKind, req: &SpecialistRequest) -> Result<String> {
            Ok(format!("{}:{}", kind.tool_name(), req.task))
        }
    }

    struct Failing;

    #[async_trait]
    impl Specialist for Failing {
        async fn call(&self, _: SpecialistKind, _: &SpecialistRequest) -> Result<String> {
            Err(Error::Http("connection refused".into()))
        }
    }

    /// Hands out one fixed delegate and counts constructions.
    struct Fixed {
        delegate: Option<Arc<dyn Specialist>>,
        fail: bool,
        builds: AtomicUsize,
    }

    impl Fixed {
        fn live(delegate: impl Specialist + 'static) -> Arc<Self> {
            Arc::new(Self { delegate: Some(Arc::new(delegate)), fail: false, builds: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { delegate: None, fail: true, builds: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl DelegateFactory for Fixed {
        async fn build(&self, model_key: &str) -> Result<Option<Arc<dyn Specialist>>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Delegate {
                    delegate: model_key.into(),
                    message: "bad credentials".into(),
                });
            }
            Ok(self.delegate.clone())
        }
    }

    fn invoker(factory: Arc<Fixed>) -> ToolInvoker {
        ToolInvoker::new(factory, Duration::from_secs(90), 200)
    }

    #[tokio::test(start_paused = true)]
    async fn never_returning_delegate_yields_fallback() {
        let inv = invoker(Fixed::live(Never));
        let req = SpecialistRequest::new("history of the transistor");

        let started = tokio::time::Instant::now();
        let out = inv.invoke(SpecialistKind::Research, &req, "m").await;

        assert!(out.contains("Research findings for:"));
        assert!(out.contains("history of the transistor"));
        assert!(started.elapsed() >= Duration::from_secs(90));
        assert!(started.elapsed() < Duration::from_secs(91));
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_is_discarded() {
        let finished = Arc::new(AtomicBool::new(false));
        let inv = invoker(Fixed::live(Late { finished: finished.clone() }));
        let req = SpecialistRequest::new("slow topic");

        let out = inv.invoke(SpecialistKind::Analysis, &req, "m").await;
        assert_eq!(out, fallback_text(SpecialistKind::Analysis, &req, 200));

        // The detached call still runs to completion.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(out, fallback_text(SpecialistKind::Analysis, &req, 200));
    }

    #[tokio::test]
    async fn live_answer_is_returned() {
        let inv = invoker(Fixed::live(Echo));
        let out = inv.invoke(SpecialistKind::Writing, &SpecialistRequest::new("haiku"), "m").await;
        assert_eq!(out, "write:haiku");
    }

    #[tokio::test]
    async fn delegate_error_yields_fallback() {
        let inv = invoker(Fixed::live(Failing));
        let req = SpecialistRequest::new("t");
        let out = inv.invoke(SpecialistKind::Research, &req, "m").await;
        assert_eq!(out, fallback_text(SpecialistKind::Research, &req, 200));
    }

    #[tokio::test]
    async fn failed_construction_is_not_retried() {
        let factory = Fixed::failing();
        let inv = invoker(factory.clone());
        let req = SpecialistRequest::new("t");

        for _ in 0..3 {
            let out = inv.invoke(SpecialistKind::Research, &req, "m").await;
            assert!(out.starts_with("Research findings for: t"));
        }
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unconfigured_key_is_fallback_only() {
        let factory = Arc::new(Fixed { delegate: None, fail: false, builds: AtomicUsize::new(0) });
        let inv = invoker(factory.clone());
        let req = SpecialistRequest::new("t");
        let a = inv.invoke(SpecialistKind::Writing, &req, "m").await;
        let b = inv.invoke(SpecialistKind::Writing, &req, "m").await;
        assert_eq!(a, b);
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }
}
