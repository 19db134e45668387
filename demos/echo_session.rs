//! Echo session through the in-process harness.
//!
//! Run with: cargo run --example echo_session
//! Set RUST_LOG=wstest=debug to see the handshake.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wstest::{Handler, Harness, Message, Request, ResponseWriter, Result, Upgrader};

/// Upgrades and echoes each frame; reports on `done` when the stream ends.
struct EchoServer {
    done: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl Handler for EchoServer {
    async fn serve(&self, writer: &mut ResponseWriter, request: Request<()>) {
        match Upgrader::new().upgrade(writer, &request).await {
            Ok(mut ws) => {
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_close() {
                        break;
                    }
                    println!("server echo: {message}");
                    if let Err(e) = ws.send(message).await {
                        println!("failed write: {e}");
                        break;
                    }
                }
            }
            Err(e) => println!("upgrade failed: {e}"),
        }

        let _ = self.done.send(());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut harness = Harness::new();

    harness.connect(EchoServer { done: done_tx }).await?;

    for i in 0..10 {
        let text = format!("hello, world! {i}");
        harness.send(Message::text(text.clone())).await?;

        let received = harness.receive().await?;
        println!("client received: {}", received.as_text().unwrap_or("<binary>"));
        assert_eq!(received.data(), text.as_bytes());
    }

    harness.close().await?;

    done_rx.recv().await;
    println!("handler finished");

    Ok(())
}
