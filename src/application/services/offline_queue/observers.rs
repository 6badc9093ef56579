use crate::domain::entities::offline::QueueView;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// キュー状態の変化を受け取る監視者。
///
/// 通知は同期的に行われる。`Err` を返しても panic しても、キュー本体や他の監視者には
/// 影響しない。
pub trait QueueListener: Send + Sync {
    fn on_change(&self, view: &QueueView) -> Result<(), String>;
}

impl<F> QueueListener for F
where
    F: Fn(&QueueView) + Send + Sync,
{
    fn on_change(&self, view: &QueueView) -> Result<(), String> {
        self(view);
        Ok(())
    }
}

type ListenerSlot = (u64, Arc<dyn QueueListener>);

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    listeners: RwLock<Vec<ListenerSlot>>,
}

#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<RegistryInner>,
}

/// `subscribe` の戻り値。`unsubscribe` で登録を解除する。
/// 破棄しても登録は残るため、解除の手段はこれだけ。
#[must_use = "dropping a Subscription leaves the listener registered with no way to unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => {
                let mut listeners = inner
                    .listeners
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                let before = listeners.len();
                listeners.retain(|(id, _)| *id != self.id);
                listeners.len() != before
            }
            None => false,
        }
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn QueueListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全監視者へ通知し、失敗した監視者の数を返す。
    pub fn notify(&self, view: &QueueView) -> usize {
        // 通知中にロックを保持しない（監視者内からの subscribe/unsubscribe を許す）
        let listeners: Vec<ListenerSlot> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_change(view))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    tracing::warn!(
                        target: "offline::observers",
                        listener_id = id,
                        error = %err,
                        "queue listener returned an error"
                    );
                }
                Err(panic) => {
                    failures += 1;
                    tracing::warn!(
                        target: "offline::observers",
                        listener_id = id,
                        panic = panic_message(panic.as_ref()),
                        "queue listener panicked"
                    );
                }
            }
        }
        failures
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
