//! The delivery thread: every listener callback runs here, one at a time.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Weak;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};

use super::ArtworkTarget;
use crate::artwork::{ArtworkOutcome, CacheKey};

const THREAD_NAME: &str = "cover-minder-delivery";

struct Delivery {
    target: Weak<dyn ArtworkTarget>,
    key: CacheKey,
    outcome: ArtworkOutcome,
}

pub struct DeliveryContext {
    sender: Option<Sender<Delivery>>,
    thread: Option<JoinHandle<()>>,
}

impl DeliveryContext {
    pub fn spawn() -> std::io::Result<Self> {
        let (sender, receiver) = unbounded::<Delivery>();

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                for delivery in receiver {
                    // Targets dropped while the delivery was queued are skipped
                    let Some(target) = delivery.target.upgrade() else {
                        continue;
                    };
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        target.on_artwork(&delivery.key, delivery.outcome);
                    }));
                    if result.is_err() {
                        tracing::error!(key = %delivery.key, "Artwork listener panicked");
                    }
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    /// Queue a callback for `target`.
    pub fn dispatch(&self, target: Weak<dyn ArtworkTarget>, key: CacheKey, outcome: ArtworkOutcome) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(Delivery { target, key, outcome }).is_err() {
            tracing::warn!("Delivery thread has stopped; dropping artwork callback");
        }
    }

    /// True when called from the delivery thread.
    pub fn is_delivery_thread() -> bool {
        thread::current().name() == Some(THREAD_NAME)
    }
}

impl Drop for DeliveryContext {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain and exit
        self.sender.take();
        if let Some(thread) = self.thread.take()
            && !Self::is_delivery_thread()
        {
            let _ = thread.join();
        }
    }
}
