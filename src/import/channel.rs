use std::sync::mpsc::Sender;

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::flow::{Attempt, ChannelEvent, Outcome, Stamped};
use super::message::ProgressMessage;
use super::SessionId;

/// Address of the push channel for one session.
pub fn progress_url(ws_base_url: &str, progress_path: &str, session: &SessionId) -> String {
    format!(
        "{}/{}/{}",
        ws_base_url.trim_end_matches('/'),
        progress_path.trim_matches('/'),
        session
    )
}

/// Live progress subscription. Dropping it closes the socket.
pub struct ProgressChannel {
    session: SessionId,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ProgressChannel {
    pub fn open(
        runtime: &Handle,
        url: String,
        session: SessionId,
        attempt: Attempt,
        events: Sender<Stamped>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        info!(%url, "opening progress channel");
        runtime.spawn(pump(url, attempt, events, shutdown_rx));
        Self {
            session,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn close(mut self) {
        self.shutdown_now();
    }

    fn shutdown_now(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            debug!(session = %self.session, "closing progress channel");
            let _ = tx.send(());
        }
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        self.shutdown_now();
    }
}

async fn pump(url: String, attempt: Attempt, events: Sender<Stamped>, mut shutdown: oneshot::Receiver<()>) {
    let emit = |event: ChannelEvent| {
        let _ = events.send(Stamped::new(attempt, Outcome::Channel(event)));
    };

    let connected = tokio::select! {
        _ = &mut shutdown => return,
        connected = connect_async(url.as_str()) => connected,
    };

    let mut socket = match connected {
        Ok((socket, _)) => socket,
        Err(e) => {
            warn!(%url, error = %e, "progress channel connect failed");
            emit(ChannelEvent::Closed(Some(e.to_string())));
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = socket.close(None).await;
                debug!(%url, "progress channel shut down");
                return;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(message) = ProgressMessage::parse(&text) {
                        emit(ChannelEvent::Message(message));
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    emit(ChannelEvent::Closed(None));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%url, error = %e, "progress channel error");
                    emit(ChannelEvent::Closed(Some(e.to_string())));
                    return;
                }
            }
        }
    }
}
