//! Shared handlers and setup for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use wstest::{Handler, Request, ResponseWriter, Upgrader};

/// Upper bound for waiting on a handler's completion signal.
pub const HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Installs a test-friendly tracing subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One-shot completion signal a handler fires when it returns.
pub struct Done(Mutex<Option<oneshot::Sender<()>>>);

impl Done {
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self(Mutex::new(Some(tx))), rx)
    }

    pub fn fire(&self) {
        if let Some(tx) = self.0.lock().take() {
            let _ = tx.send(());
        }
    }
}

/// Upgrades and echoes every data frame until the stream ends.
pub struct EchoHandler {
    done: Done,
}

impl EchoHandler {
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (done, rx) = Done::new();
        (Self { done }, rx)
    }
}

#[async_trait]
impl Handler for EchoHandler {
    async fn serve(&self, writer: &mut ResponseWriter, request: Request<()>) {
        let upgraded = Upgrader::new().upgrade(writer, &request).await;

        if let Ok(mut ws) = upgraded {
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
                if message.is_ping() || message.is_pong() {
                    continue;
                }
                tracing::debug!(len = message.len(), "server echo");
                if ws.send(message).await.is_err() {
                    break;
                }
            }
        }

        self.done.fire();
    }
}
