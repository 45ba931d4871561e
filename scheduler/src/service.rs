//! Signal service actor.
//!
//! Owns the `SignalEngine` on a single task and serialises every input into
//! it: quotes, deferred-sample deadlines, heartbeat ticks and control
//! commands. Callers talk to it through a cloneable `ServiceHandle`.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use market::types::{AllowedAssets, Quote};

use crate::broadcaster::{EventBroadcaster, Subscription};
use crate::clock::Clock;
use crate::engine::{EngineSnapshot, SignalEngine};
use crate::error::SchedulerError;
use crate::metrics::Counters;
use crate::types::Event;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Backlog of quotes waiting for the engine.
    pub quote_capacity: usize,
    pub command_capacity: usize,
    /// Per-subscriber event queue.
    pub subscriber_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            quote_capacity: 1_024,
            command_capacity: 64,
            subscriber_capacity: 64,
        }
    }
}

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    ConnectionLost(String),
    SetAllowedAssets(AllowedAssets),
    WarmUp {
        asset: String,
        prices: Vec<f64>,
        reply: oneshot::Sender<usize>,
    },
    Greet(Uuid),
    Status(oneshot::Sender<ServiceStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub connected: bool,
    pub last_error: Option<String>,
    pub subscribers: usize,
    pub engine: EngineSnapshot,
}

#[derive(Clone)]
pub struct ServiceHandle {
    commands: mpsc::Sender<Command>,
    quotes: mpsc::Sender<Quote>,
    broadcaster: EventBroadcaster,
    subscriber_capacity: usize,
}

impl ServiceHandle {
    async fn send(&self, cmd: Command) -> Result<(), SchedulerError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| SchedulerError::ServiceClosed)
    }

    /// Starts accepting quotes.
    pub async fn connect(&self) -> Result<(), SchedulerError> {
        self.send(Command::Connect).await
    }

    /// Stops accepting quotes, releases the lock and drops pending evaluations.
    pub async fn disconnect(&self) -> Result<(), SchedulerError> {
        self.send(Command::Disconnect).await
    }

    /// Same reset as `disconnect`, recording `reason` as the last error.
    pub async fn connection_lost(&self, reason: impl Into<String>) -> Result<(), SchedulerError> {
        self.send(Command::ConnectionLost(reason.into())).await
    }

    pub async fn set_allowed_assets(&self, allowed: AllowedAssets) -> Result<(), SchedulerError> {
        self.send(Command::SetAllowedAssets(allowed)).await
    }

    /// Seeds an asset's history; returns how many prices were recorded.
    pub async fn warm_up(
        &self,
        asset: impl Into<String>,
        prices: Vec<f64>,
    ) -> Result<usize, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::WarmUp {
            asset: asset.into(),
            prices,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SchedulerError::ServiceClosed)
    }

    pub async fn status(&self) -> Result<ServiceStatus, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status(reply)).await?;
        rx.await.map_err(|_| SchedulerError::ServiceClosed)
    }

    /// Sender to hand to a `QuoteSource`.
    pub fn quote_sender(&self) -> mpsc::Sender<Quote> {
        self.quotes.clone()
    }

    pub async fn push_quote(&self, quote: Quote) -> Result<(), SchedulerError> {
        self.quotes
            .send(quote)
            .await
            .map_err(|_| SchedulerError::ServiceClosed)
    }

    /// Registers a subscriber; its first event is a heartbeat.
    pub async fn subscribe(&self) -> Result<Subscription, SchedulerError> {
        let sub = self.broadcaster.subscribe(self.subscriber_capacity);
        if let Err(e) = self.send(Command::Greet(sub.id)).await {
            self.broadcaster.unsubscribe(sub.id);
            return Err(e);
        }
        Ok(sub)
    }

    pub fn unsubscribe(&self, id: Uuid) -> bool {
        self.broadcaster.unsubscribe(id)
    }
}

struct SignalService<C> {
    engine: SignalEngine,
    clock: C,
    broadcaster: EventBroadcaster,
    counters: Counters,
    connected: bool,
    last_error: Option<String>,
}

/// Spawns the actor. The task ends once every `ServiceHandle` is dropped.
pub fn spawn_service<C: Clock>(
    engine: SignalEngine,
    clock: C,
    cfg: ServiceConfig,
) -> (ServiceHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(cfg.command_capacity.max(1));
    let (quote_tx, quote_rx) = mpsc::channel(cfg.quote_capacity.max(1));

    let counters = engine.counters().clone();
    let broadcaster = EventBroadcaster::new(counters.clone());

    let service = SignalService {
        engine,
        clock,
        broadcaster: broadcaster.clone(),
        counters,
        connected: false,
        last_error: None,
    };

    let join = tokio::spawn(
        service
            .run(cmd_rx, quote_rx)
            .instrument(info_span!("signal_service")),
    );

    let handle = ServiceHandle {
        commands: cmd_tx,
        quotes: quote_tx,
        broadcaster,
        subscriber_capacity: cfg.subscriber_capacity,
    };
    (handle, join)
}

impl<C: Clock> SignalService<C> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut quotes: mpsc::Receiver<Quote>,
    ) {
        let period = Duration::from_millis(self.engine.config().scheduler.heartbeat_interval_ms);
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut quotes_open = true;
        info!("signal service started");

        loop {
            let deadline = self.next_deadline();
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                // Commands win over queued quotes, so a Connect sent before
                // a batch of quotes is applied first.
                biased;

                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => break,
                },
                () = timer => {
                    let events = self.engine.on_timer(self.clock.now_ms());
                    self.publish_all(events);
                },
                quote = quotes.recv(), if quotes_open => match quote {
                    Some(quote) => self.on_quote(quote),
                    None => {
                        warn!("quote channel closed");
                        quotes_open = false;
                    }
                },
                _ = heartbeat.tick() => {
                    let ev = self.engine.heartbeat(self.clock.now_ms(), self.connected);
                    self.broadcaster.publish(&ev);
                },
            }
        }

        info!("signal service stopped");
    }

    /// Tokio instant at which the next deferred sample is due.
    fn next_deadline(&self) -> Option<Instant> {
        let due = self.engine.next_deadline()?;
        let wait = due.saturating_sub(self.clock.now_ms());
        Some(Instant::now() + Duration::from_millis(wait))
    }

    fn on_quote(&mut self, quote: Quote) {
        if !self.connected {
            Counters::incr(&self.counters.quotes_dropped);
            return;
        }
        let events = self.engine.on_quote(&quote, self.clock.now_ms());
        self.publish_all(events);
    }

    fn on_command(&mut self, cmd: Command) {
        let now = self.clock.now_ms();

        match cmd {
            Command::Connect => {
                self.connected = true;
                self.last_error = None;
                info!("upstream connected");
            }
            Command::Disconnect => {
                self.reset();
                info!("upstream disconnected");
            }
            Command::ConnectionLost(reason) => {
                warn!(%reason, "upstream connection lost");
                self.reset();
                self.last_error = Some(reason);
            }
            Command::SetAllowedAssets(allowed) => {
                self.engine.set_allowed_assets(allowed);
            }
            Command::WarmUp {
                asset,
                prices,
                reply,
            } => {
                let recorded = self.engine.warm_up(&asset, &prices, now);
                let _ = reply.send(recorded);
            }
            Command::Greet(id) => {
                let ev = self.engine.heartbeat(now, self.connected);
                if !self.broadcaster.send_to(id, ev) {
                    debug!(subscriber = %id, "initial ping not delivered");
                }
            }
            Command::Status(reply) => {
                let _ = reply.send(ServiceStatus {
                    connected: self.connected,
                    last_error: self.last_error.clone(),
                    subscribers: self.broadcaster.len(),
                    engine: self.engine.snapshot(now),
                });
            }
        }
    }

    fn reset(&mut self) {
        self.connected = false;
        self.engine.disconnect();
    }

    fn publish_all(&self, events: Vec<Event>) {
        for ev in &events {
            self.broadcaster.publish(ev);
        }
    }
}
