//! Order endpoint client and the background poller that drives update cycles

use crate::error::{CycleError, FetchError};
use crate::order::{Order, RawRecord, RecordLayout};
use crate::settings::SourceSettings;
use chrono::{DateTime, Local};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything that can produce the latest order
pub trait OrderSource: Send + 'static {
    fn fetch(&self) -> Result<Order, CycleError>;
}

/// Blocking HTTP client for the spreadsheet script endpoint
pub struct Fetcher {
    endpoint: String,
    layout: RecordLayout,
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(source: &SourceSettings, layout: RecordLayout) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(source.timeout_ms))
            .build();
        Self {
            endpoint: source.endpoint.clone(),
            layout,
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// GET the endpoint and parse the positional payload
    pub fn fetch_raw(&self) -> Result<RawRecord, CycleError> {
        let response = match self.agent.get(&self.endpoint).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    url: self.endpoint.clone(),
                    status,
                }
                .into())
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(FetchError::Transport {
                    url: self.endpoint.clone(),
                    reason: t.to_string(),
                }
                .into())
            }
        };

        let body = response.into_string().map_err(FetchError::Body)?;
        let raw = RawRecord::from_json(&body)?;
        debug!(pairs = raw.len(), "payload received");
        Ok(raw)
    }
}

impl OrderSource for Fetcher {
    fn fetch(&self) -> Result<Order, CycleError> {
        let raw = self.fetch_raw()?;
        Ok(Order::decode(&raw, &self.layout)?)
    }
}

/// Result of one polling cycle
#[derive(Debug)]
pub struct CycleOutcome {
    pub cycle: u64,
    pub fetched_at: DateTime<Local>,
    pub result: Result<Order, CycleError>,
}

enum Control {
    Refresh,
}

/// Background polling loop.
///
/// Cycles run back to back on one worker thread: the next fetch starts
/// `interval` after the previous one finished, so at most one request is
/// ever in flight. At most one refresh is held while a fetch runs; extra
/// presses are dropped. Dropping the poller stops the worker at its next wait.
pub struct Poller {
    receiver: Receiver<CycleOutcome>,
    control: Option<SyncSender<Control>>,
}

impl Poller {
    pub fn spawn<S: OrderSource>(source: S, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let (control_tx, control_rx) = mpsc::sync_channel(1);

        thread::spawn(move || {
            let mut cycle = 0u64;
            loop {
                cycle += 1;
                let result = source.fetch();
                match &result {
                    Ok(order) => info!(cycle, location = %order.location, "order fetched"),
                    Err(e) => warn!(cycle, kind = e.kind(), "cycle failed: {e}"),
                }
                let outcome = CycleOutcome {
                    cycle,
                    fetched_at: Local::now(),
                    result,
                };
                if tx.send(outcome).is_err() {
                    break;
                }

                match control_rx.recv_timeout(interval) {
                    Ok(Control::Refresh) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("poller stopped");
        });

        Self {
            receiver: rx,
            control: Some(control_tx),
        }
    }

    /// Skip the rest of the current wait and fetch now
    pub fn refresh(&self) {
        if let Some(control) = &self.control {
            // Full means a refresh is already pending
            let _ = control.try_send(Control::Refresh);
        }
    }

    /// Next finished cycle, if any (non-blocking)
    pub fn try_next(&self) -> Option<CycleOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next finished cycle
    #[cfg(test)]
    pub fn next_timeout(&self, timeout: Duration) -> Option<CycleOutcome> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.control.take();
    }
}
