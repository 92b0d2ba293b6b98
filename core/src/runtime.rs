//! Executes effect descriptions.

use crate::effect::Effect;
use crate::metrics::NOTIFICATIONS_FAILED_TOTAL;
use crate::notify::Notifier;
use futures::future::{BoxFuture, join_all};
use std::sync::Arc;

/// Runs the effects returned by reducers and services.
///
/// Notification failures are logged and counted, never returned: the state change that
/// produced them has already been persisted.
#[derive(Clone)]
pub struct EffectRunner {
    notifier: Arc<dyn Notifier>,
}

impl EffectRunner {
    /// Creates a runner delivering notifications through `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Executes `effects` in order. Parallel groups are awaited together.
    pub async fn run<I>(&self, effects: I)
    where
        I: IntoIterator<Item = Effect>,
    {
        for effect in effects {
            self.execute(effect).await;
        }
    }

    fn execute(&self, effect: Effect) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match effect {
                Effect::None => {}
                Effect::Notify(email) => {
                    let subject = email.subject.clone();
                    if let Err(error) = self.notifier.send(email).await {
                        metrics::counter!(NOTIFICATIONS_FAILED_TOTAL).increment(1);
                        tracing::warn!(%error, %subject, "notification not delivered");
                    }
                }
                Effect::Parallel(effects) => {
                    join_all(effects.into_iter().map(|e| self.execute(e))).await;
                }
            }
        })
    }
}
