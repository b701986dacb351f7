//! Embedder failover: try primary → fallback₁ → fallback₂.
//!
//! A slot that fails `max_failures` times in a row is skipped until its
//! cool-down has passed. Success resets the counter.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::Embedder;

struct EmbedderSlot {
    embedder: Box<dyn Embedder>,
    /// Consecutive failure count.
    failures: AtomicU32,
    /// Unix secs of the last failure, 0 = never failed.
    last_failure: AtomicU64,
    max_failures: u32,
    cooldown_secs: u64,
}

fn unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl EmbedderSlot {
    fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            failures: AtomicU32::new(0),
            last_failure: AtomicU64::new(0),
            max_failures: 3,
            cooldown_secs: 60,
        }
    }

    fn is_healthy(&self) -> bool {
        if self.failures.load(Ordering::Relaxed) < self.max_failures {
            return true;
        }
        let last = self.last_failure.load(Ordering::Relaxed);
        unix_secs().saturating_sub(last) > self.cooldown_secs
    }

    fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.last_failure.store(unix_secs(), Ordering::Relaxed);
    }
}

pub struct FailoverEmbedder {
    slots: Vec<EmbedderSlot>,
}

impl FailoverEmbedder {
    /// First embedder is primary, the rest are fallbacks in order.
    pub fn new(embedders: Vec<Box<dyn Embedder>>) -> Result<Self> {
        if embedders.is_empty() {
            return Err(VecStashError::Config("failover chain needs at least one embedder".into()));
        }
        Ok(Self {
            slots: embedders.into_iter().map(EmbedderSlot::new).collect(),
        })
    }

    pub fn with_fallback(primary: Box<dyn Embedder>, fallback: Box<dyn Embedder>) -> Self {
        Self {
            slots: vec![EmbedderSlot::new(primary), EmbedderSlot::new(fallback)],
        }
    }

    pub fn chain_len(&self) -> usize {
        self.slots.len()
    }

    /// `(name, healthy, consecutive failures)` per slot.
    pub fn health_status(&self) -> Vec<(&str, bool, u32)> {
        self.slots
            .iter()
            .map(|s| {
                (
                    s.embedder.name(),
                    s.is_healthy(),
                    s.failures.load(Ordering::Relaxed),
                )
            })
            .collect()
    }

    /// Slots must agree on dimensionality; a fallback is only useful when it
    /// embeds into the same space as the primary.
    async fn run<'a, R, F>(&'a self, op: F) -> Result<R>
    where
        F: Fn(&'a dyn Embedder) -> futures::future::BoxFuture<'a, Result<R>>,
    {
        let mut last_error = None;

        for (idx, slot) in self.slots.iter().enumerate() {
            if !slot.is_healthy() {
                tracing::debug!(
                    "⏭️ Skipping unhealthy embedder: {} ({} failures)",
                    slot.embedder.name(),
                    slot.failures.load(Ordering::Relaxed)
                );
                continue;
            }

            match op(slot.embedder.as_ref()).await {
                Ok(out) => {
                    if idx > 0 {
                        tracing::info!(
                            "🔄 Failover: {} → {} (success)",
                            self.slots[0].embedder.name(),
                            slot.embedder.name()
                        );
                    }
                    slot.record_success();
                    return Ok(out);
                }
                Err(e) => {
                    slot.record_failure();
                    tracing::warn!(
                        "⚠️ Embedder {} failed (attempt {}): {}",
                        slot.embedder.name(),
                        slot.failures.load(Ordering::Relaxed),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| VecStashError::Provider("All embedders unhealthy".into())))
    }
}

#[async_trait]
impl Embedder for FailoverEmbedder {
    fn name(&self) -> &str {
        self.slots
            .first()
            .map(|s| s.embedder.name())
            .unwrap_or("failover")
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.run(|e| e.embed_text(text)).await
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.run(|e| e.embed_texts(texts)).await
    }

    async fn health_check(&self) -> Result<bool> {
        for slot in &self.slots {
            if slot.is_healthy()
                && let Ok(true) = slot.embedder.health_check().await
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
