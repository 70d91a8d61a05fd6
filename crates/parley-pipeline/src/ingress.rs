// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingress loop enforcing the pipeline's declared limits.
//!
//! Messages arrive on a bounded queue (`queue_size`). Each one is processed
//! in its own task, at most `max_concurrent` at a time, and abandoned after
//! `processing_timeout`. A run aborted by a storage failure happened before
//! any dispatch, so it is retried up to `retry_count` times.

use std::sync::Arc;

use parley_core::{FailureKind, InboundMessage};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pipeline::{Limits, MessagePipeline, PipelineOutcome, Route};

/// Counters reported when the ingress loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressStats {
    pub processed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub retried: usize,
}

pub struct Ingress {
    pipeline: Arc<MessagePipeline>,
    limits: Limits,
}

impl Ingress {
    pub fn new(pipeline: Arc<MessagePipeline>) -> Self {
        let limits = pipeline.limits();
        Self { pipeline, limits }
    }

    /// A queue sized by `queue_size`.
    pub fn channel(&self) -> (mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
        mpsc::channel(self.limits.queue_size.max(1))
    }

    /// Processes messages until the queue closes or `cancel` fires, then
    /// waits for in-flight messages to finish.
    pub async fn run(
        &self,
        mut queue: mpsc::Receiver<InboundMessage>,
        cancel: CancellationToken,
    ) -> IngressStats {
        let slots = Arc::new(Semaphore::new(self.limits.max_concurrent.max(1)));
        let mut tasks: JoinSet<Option<(PipelineOutcome, usize)>> = JoinSet::new();
        let mut stats = IngressStats::default();

        info!(
            max_concurrent = self.limits.max_concurrent,
            queue_size = self.limits.queue_size,
            "ingress running"
        );

        loop {
            let inbound = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping ingress");
                    break;
                }
                msg = queue.recv() => match msg {
                    Some(inbound) => inbound,
                    None => {
                        debug!("ingress queue closed");
                        break;
                    }
                },
            };

            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            let pipeline = Arc::clone(&self.pipeline);
            let limits = self.limits;
            tasks.spawn(async move {
                let _permit = permit;
                process_with_limits(&pipeline, &inbound, limits).await
            });

            while let Some(joined) = tasks.try_join_next() {
                record(&mut stats, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record(&mut stats, joined);
        }
        info!(
            processed = stats.processed,
            failed = stats.failed,
            timed_out = stats.timed_out,
            "ingress stopped"
        );
        stats
    }
}

/// One message with timeout and storage retries. `None` on timeout.
async fn process_with_limits(
    pipeline: &MessagePipeline,
    inbound: &InboundMessage,
    limits: Limits,
) -> Option<(PipelineOutcome, usize)> {
    let mut retries = 0;
    loop {
        let outcome = pipeline
            .process_message_within(inbound, limits.processing_timeout)
            .await;
        if outcome.route == Route::TimedOut {
            return None;
        }

        let storage_abort = outcome.route == Route::Aborted
            && outcome.error.as_ref().map(|e| e.kind) == Some(FailureKind::Storage);
        if !storage_abort || retries >= limits.retry_count as usize {
            return Some((outcome, retries));
        }
        retries += 1;
        debug!(message_id = %inbound.id, attempt = retries, "retrying after storage failure");
    }
}

fn record(
    stats: &mut IngressStats,
    joined: Result<Option<(PipelineOutcome, usize)>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Some((outcome, retries))) => {
            stats.processed += 1;
            stats.retried += retries;
            if !outcome.success {
                stats.failed += 1;
            }
        }
        Ok(None) => {
            stats.processed += 1;
            stats.timed_out += 1;
        }
        Err(e) => {
            warn!(error = %e, "message task failed");
            stats.failed += 1;
        }
    }
}
