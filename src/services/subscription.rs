// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live collection subscriptions.
//!
//! A subscription pushes the full current snapshot of a collection every time
//! it changes. Backend failures arrive on a separate error channel and end the
//! subscription; there is no automatic resubscribe. The caller owns the
//! subscription and must call [`Subscription::unsubscribe`] when it stops
//! observing (view teardown, identity change).

use crate::db::ChangeFeed;
use crate::error::AppError;
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Snapshots buffered before the pump waits for the consumer.
const SNAPSHOT_BUFFER: usize = 8;

/// Releases the live connection behind a subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    label: String,
    pump: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Stop delivery and release the backend listener.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    /// Whether the pump is still delivering.
    pub fn is_active(&self) -> bool {
        self.pump.as_ref().is_some_and(|pump| !pump.is_finished())
    }

    fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            tracing::debug!(subscription = %self.label, "Unsubscribed");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        // Dropping is not a release: the pump keeps running until its feed
        // ends. Surface the leak instead of hiding it.
        if self.is_active() {
            tracing::warn!(
                subscription = %self.label,
                "Subscription dropped without unsubscribe; live connection leaked"
            );
        }
    }
}

/// A live view of one collection.
pub struct Subscription<T> {
    snapshots: mpsc::Receiver<Vec<T>>,
    errors: mpsc::Receiver<AppError>,
    handle: SubscriptionHandle,
}

impl<T: Send + 'static> Subscription<T> {
    /// Start pumping snapshots.
    ///
    /// `fetch` reads the whole collection; it runs once immediately and again
    /// after every change notification from `feed`.
    pub fn spawn<F, Fut>(label: impl Into<String>, mut feed: ChangeFeed, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, AppError>> + Send + 'static,
    {
        let label = label.into();
        let (snapshot_tx, snapshots) = mpsc::channel(SNAPSHOT_BUFFER);
        let (error_tx, errors) = mpsc::channel(1);
        let pump_label = label.clone();

        let pump = tokio::spawn(async move {
            loop {
                match fetch().await {
                    Ok(snapshot) => {
                        if snapshot_tx.send(snapshot).await.is_err() {
                            // Consumer dropped the receiving side
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(subscription = %pump_label, error = %e, "Snapshot read failed");
                        let _ = error_tx.send(e).await;
                        break;
                    }
                }

                match feed.next().await {
                    Some(Ok(())) => continue,
                    Some(Err(e)) => {
                        tracing::warn!(subscription = %pump_label, error = %e, "Change feed failed");
                        let _ = error_tx.send(e).await;
                        break;
                    }
                    None => break,
                }
            }
        });

        tracing::debug!(subscription = %label, "Subscribed");
        Self {
            snapshots,
            errors,
            handle: SubscriptionHandle {
                label,
                pump: Some(pump),
            },
        }
    }

    /// Next full snapshot. `None` once the subscription has ended.
    pub async fn next_snapshot(&mut self) -> Option<Vec<T>> {
        self.snapshots.recv().await
    }

    /// The error that ended the subscription, if any.
    pub async fn next_error(&mut self) -> Option<AppError> {
        self.errors.recv().await
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Split into the data channel, the error channel and the release handle.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<Vec<T>>,
        mpsc::Receiver<AppError>,
        SubscriptionHandle,
    ) {
        (self.snapshots, self.errors, self.handle)
    }

    /// Stop delivery and release the backend listener.
    pub fn unsubscribe(self) {
        self.handle.unsubscribe();
    }

    /// Adapt into a stream of snapshots that unsubscribes when dropped.
    ///
    /// The stream yields one `Err` and ends if the backend fails.
    pub fn into_stream(self) -> SubscriptionStream<T> {
        SubscriptionStream {
            subscription: Some(self),
        }
    }
}

/// Stream adapter whose drop is the subscription's teardown boundary.
pub struct SubscriptionStream<T> {
    subscription: Option<Subscription<T>>,
}

// Never pin-projected; all state lives behind owned channels.
impl<T> Unpin for SubscriptionStream<T> {}

impl<T> Stream for SubscriptionStream<T> {
    type Item = Result<Vec<T>, AppError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(sub) = this.subscription.as_mut() else {
            return Poll::Ready(None);
        };

        if let Poll::Ready(Some(err)) = sub.errors.poll_recv(cx) {
            if let Some(sub) = this.subscription.take() {
                sub.handle.unsubscribe();
            }
            return Poll::Ready(Some(Err(err)));
        }

        match sub.snapshots.poll_recv(cx) {
            Poll::Ready(Some(snapshot)) => Poll::Ready(Some(Ok(snapshot))),
            Poll::Ready(None) => {
                // Pump finished; an error may still be queued behind it.
                match sub.errors.poll_recv(cx) {
                    Poll::Ready(Some(err)) => Poll::Ready(Some(Err(err))),
                    _ => {
                        if let Some(sub) = this.subscription.take() {
                            sub.handle.unsubscribe();
                        }
                        Poll::Ready(None)
                    }
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for SubscriptionStream<T> {
    fn drop(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.handle.unsubscribe();
        }
    }
}
