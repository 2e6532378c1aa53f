//! Stdio transport: reads host messages from stdin, writes replies and
//! coordinator messages to stdout.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use product_watch::CoordinatorMessage;

use crate::protocol::ProtocolHandler;
use crate::types::AgentResult;

use super::framing;

/// Line-oriented transport for a host process.
pub struct StdioTransport {
    handler: ProtocolHandler,
    events: broadcast::Receiver<CoordinatorMessage>,
}

impl StdioTransport {
    /// Subscribes to the coordinator bus immediately, so changes emitted
    /// before [`StdioTransport::run`] are still written.
    pub fn new(handler: ProtocolHandler) -> Self {
        let events = handler.session().bus().subscribe();
        Self { handler, events }
    }

    pub fn handler_mut(&mut self) -> &mut ProtocolHandler {
        &mut self.handler
    }

    /// Run over the process's stdin and stdout.
    pub async fn run(self) -> AgentResult<ProtocolHandler> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with(stdin, tokio::io::stdout()).await
    }

    /// Run the transport loop until EOF or `CLOSE`.
    pub async fn run_with<R, W>(mut self, reader: R, mut writer: W) -> AgentResult<ProtocolHandler>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut events_open = true;

        tracing::info!("Stdio transport started");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        tracing::info!("EOF on stdin, shutting down");
                        break;
                    };
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let reply = self.handler.handle_line(trimmed).await;
                    // Changes caused by this message go out before its reply.
                    drain_events(&mut self.events, &mut writer).await?;
                    if let Some(reply) = reply {
                        write_value(&mut writer, &reply).await?;
                    }
                    if self.handler.is_closed() {
                        break;
                    }
                }
                event = self.events.recv(), if events_open => match event {
                    Ok(message) => write_message(&mut writer, &message).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Output fell behind, skipped {skipped} coordinator messages");
                    }
                    Err(RecvError::Closed) => events_open = false,
                },
            }
        }

        self.handler.shutdown().await;
        drain_events(&mut self.events, &mut writer).await?;
        writer.flush().await?;
        Ok(self.handler)
    }
}

async fn drain_events<W: AsyncWrite + Unpin>(
    events: &mut broadcast::Receiver<CoordinatorMessage>,
    writer: &mut W,
) -> AgentResult<()> {
    loop {
        match events.try_recv() {
            Ok(message) => write_message(writer, &message).await?,
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Output fell behind, skipped {skipped} coordinator messages");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &CoordinatorMessage,
) -> AgentResult<()> {
    write_value(writer, &serde_json::to_value(message)?).await
}

async fn write_value<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> AgentResult<()> {
    let framed = framing::frame_message(value)?;
    writer.write_all(framed.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
