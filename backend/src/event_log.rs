//! Local subscriber that writes every published event to the log as its
//! server-sent-events frame, newlines escaped so a frame stays on one line.

use scheduler::broadcaster::Subscription;
use scheduler::types::Event;
use tracing::{debug, info, warn};

/// Drains `sub` until the service drops it. Returns the number of events seen.
pub async fn log_events(mut sub: Subscription) -> usize {
    let mut seen = 0;

    while let Some(event) = sub.rx.recv().await {
        seen += 1;

        let frame = match event.to_sse_frame() {
            Ok(frame) => frame.trim_end().replace('\n', "\\n"),
            Err(e) => {
                warn!(event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };

        match event {
            Event::Heartbeat(_) => debug!(target: "events", frame = %frame, "ping"),
            _ => info!(target: "events", frame = %frame, "{}", event.name()),
        }
    }

    debug!(subscriber = %sub.id, seen, "event log subscriber closed");
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use market::types::Direction;
    use scheduler::broadcaster::EventBroadcaster;
    use scheduler::types::{Heartbeat, TradeResult};
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn results_are_logged_as_sse_frames() {
        let b = EventBroadcaster::default();
        let sub = b.subscribe(4);

        b.publish(&Event::Result(TradeResult {
            asset: "EUR/USD".into(),
            timeframe: "M1".into(),
            direction: Direction::Sell,
            entry_at: 60_000,
            valid_until: 120_000,
            entry_price: Some(1.1),
            close_price: Some(1.0),
            win: Some(true),
        }));
        b.publish(&Event::Heartbeat(Heartbeat {
            t: 1,
            next_allowed_at: 0,
            connected: true,
        }));
        // closing the sender lets the drain finish after the queued events
        b.unsubscribe(sub.id);

        assert_eq!(log_events(sub).await, 2);
        assert!(logs_contain("event: result"));
        assert!(logs_contain("\"win\":true"));
        assert!(logs_contain("event: ping\\ndata: {\"t\":1"));
    }
}
