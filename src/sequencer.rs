//! Badge notification sequencer.
//!
//! Badge ids are queued by whoever observes a qualifying event and shown one
//! at a time. [`Sequencer`] is the state machine on its own, with no I/O: it
//! hands out [`FetchRequest`]s and is told their outcome. [`NotificationService`]
//! drives it on a tokio task, performing the fetches through a
//! [`BadgeSource`] and publishing the display slot.
//!
//! States:
//! - `Idle`: slot empty, no fetch in flight
//! - `Processing`: a fetch is in flight (slot empty)
//! - `Displaying`: slot populated
//!
//! Every path into `Processing` goes through [`Sequencer::process_next`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::AppResult;
use crate::models::Badge;
use crate::traits::BadgeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing,
    Displaying,
}

/// A badge lookup the owner of the sequencer must perform and report back
/// through [`Sequencer::on_fetched`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: u64,
    pub badge_id: String,
}

#[derive(Debug, Default)]
pub struct Sequencer {
    queue: VecDeque<String>,
    current: Option<Badge>,
    /// Ticket of the fetch in flight; doubles as the processing flag.
    in_flight: Option<u64>,
    next_ticket: u64,
    /// Badges shown so far.
    displayed: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `badge_id` to the back of the queue and start processing if
    /// nothing is shown or in flight.
    pub fn enqueue(&mut self, badge_id: impl Into<String>) -> Option<FetchRequest> {
        let badge_id = badge_id.into();
        tracing::debug!("Queued badge {} ({} pending)", badge_id, self.queue.len() + 1);
        self.queue.push_back(badge_id);
        self.process_next()
    }

    /// Pop the front id into a fetch, if the slot is empty, nothing is in
    /// flight and the queue is non-empty.
    pub fn process_next(&mut self) -> Option<FetchRequest> {
        if self.current.is_some() || self.in_flight.is_some() {
            return None;
        }
        let badge_id = self.queue.pop_front()?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        tracing::debug!("Fetching badge {} (ticket {})", badge_id, ticket);

        Some(FetchRequest { ticket, badge_id })
    }

    /// Report the outcome of a fetch. A failed or empty lookup drops the id.
    /// Outcomes for tickets that are no longer in flight are ignored.
    pub fn on_fetched(&mut self, ticket: u64, result: AppResult<Option<Badge>>) -> Option<FetchRequest> {
        if self.in_flight != Some(ticket) {
            tracing::debug!("Ignoring stale badge fetch (ticket {})", ticket);
            return None;
        }
        self.in_flight = None;

        match result {
            Ok(Some(badge)) => {
                tracing::debug!("Displaying badge {}", badge.id);
                self.current = Some(badge);
                self.displayed += 1;
                None
            }
            Ok(None) => {
                tracing::warn!("Badge for ticket {} not found, dropping", ticket);
                self.process_next()
            }
            Err(e) => {
                tracing::error!("Failed to fetch badge for ticket {}: {}", ticket, e);
                self.process_next()
            }
        }
    }

    /// Clear the display slot. Calling it with nothing displayed is a no-op,
    /// and a fetch already in flight is left alone.
    pub fn close_current(&mut self) -> Option<FetchRequest> {
        let closed = self.current.take()?;
        tracing::debug!("Closed badge {}", closed.id);
        self.process_next()
    }

    pub fn phase(&self) -> Phase {
        if self.current.is_some() {
            Phase::Displaying
        } else if self.in_flight.is_some() {
            Phase::Processing
        } else {
            Phase::Idle
        }
    }

    pub fn current(&self) -> Option<&Badge> {
        self.current.as_ref()
    }

    pub fn queued(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Idle with an empty queue.
    pub fn is_settled(&self) -> bool {
        self.phase() == Phase::Idle && self.queue.is_empty()
    }

    fn state(&self, handled: u64) -> SequencerState {
        SequencerState {
            current: self.current.clone(),
            phase: self.phase(),
            queued: self.queue.len(),
            displayed: self.displayed,
            handled,
        }
    }
}

// ==================== Async driver ====================

/// Published view of the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerState {
    pub current: Option<Badge>,
    pub phase: Phase,
    pub queued: usize,
    /// Increments each time a badge enters the display slot.
    pub displayed: u64,
    /// Number of caller events (enqueue / close) applied so far.
    pub handled: u64,
}

impl SequencerState {
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Idle && self.queued == 0
    }
}

#[derive(Debug)]
enum Event {
    Enqueue(String),
    Close,
    Fetched {
        ticket: u64,
        result: AppResult<Option<Badge>>,
    },
    Shutdown,
}

/// Cheap, cloneable handle to a running [`NotificationService`].
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    tx: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<SequencerState>,
    sent: Arc<AtomicU64>,
}

impl NotificationHandle {
    pub fn enqueue(&self, badge_id: impl Into<String>) {
        self.send(Event::Enqueue(badge_id.into()));
    }

    pub fn close(&self) {
        self.send(Event::Close);
    }

    /// Stop the service. Fetches still in flight complete but their results
    /// are discarded.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Event::Shutdown);
    }

    pub fn state(&self) -> SequencerState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Badge> {
        self.state.borrow().current.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SequencerState> {
        self.state.clone()
    }

    /// Wait until every event sent so far is applied and the sequencer is
    /// idle with an empty queue. Returns early if the service stopped.
    pub async fn wait_settled(&self) {
        let target = self.sent.load(Ordering::SeqCst);
        let mut rx = self.state.clone();
        let _ = rx.wait_for(|s| s.handled >= target && s.is_settled()).await;
    }

    fn send(&self, event: Event) {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(event).is_err() {
            tracing::warn!("Notification service is not running");
        }
    }
}

/// Owns a [`Sequencer`] on a tokio task and performs its fetches.
pub struct NotificationService;

impl NotificationService {
    /// Spawn the service. It runs until [`NotificationHandle::shutdown`] is
    /// called or every handle is dropped.
    pub fn start<S: BadgeSource>(source: Arc<S>) -> (NotificationHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let (state_tx, state_rx) = watch::channel(Sequencer::new().state(0));

        let handle = NotificationHandle {
            tx: tx.clone(),
            state: state_rx,
            sent: Arc::new(AtomicU64::new(0)),
        };
        // Fetch tasks report back through a weak sender so the loop can end
        // once all handles are gone.
        let fetch_tx = tx.downgrade();
        drop(tx);

        let task = tokio::spawn(async move {
            let mut sequencer = Sequencer::new();
            let mut handled: u64 = 0;

            while let Some(event) = rx.recv().await {
                let request = match event {
                    Event::Enqueue(id) => {
                        handled += 1;
                        sequencer.enqueue(id)
                    }
                    Event::Close => {
                        handled += 1;
                        sequencer.close_current()
                    }
                    Event::Fetched { ticket, result } => sequencer.on_fetched(ticket, result),
                    Event::Shutdown => break,
                };

                if let Some(request) = request {
                    spawn_fetch(source.clone(), request, fetch_tx.clone());
                }
                state_tx.send_replace(sequencer.state(handled));
            }

            tracing::debug!("Notification service stopped");
        });

        (handle, task)
    }
}

fn spawn_fetch<S: BadgeSource>(
    source: Arc<S>,
    request: FetchRequest,
    tx: mpsc::WeakUnboundedSender<Event>,
) {
    tokio::spawn(async move {
        let result = source.fetch_badge(&request.badge_id).await;
        if let Some(tx) = tx.upgrade() {
            let _ = tx.send(Event::Fetched {
                ticket: request.ticket,
                result,
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::BadgeType;

    fn badge(id: &str) -> Badge {
        Badge {
            id: id.to_string(),
            name: format!("Badge {id}"),
            description: None,
            image_path: None,
            badge_type: BadgeType::Mission,
            created_by: None,
        }
    }

    /// Complete a request successfully with a badge of the same id.
    fn deliver(seq: &mut Sequencer, req: &FetchRequest) -> Option<FetchRequest> {
        seq.on_fetched(req.ticket, Ok(Some(badge(&req.badge_id))))
    }

    #[test]
    fn test_enqueue_when_idle_starts_fetch() {
        let mut seq = Sequencer::new();
        assert_eq!(seq.phase(), Phase::Idle);

        let req = seq.enqueue("badge_a").expect("should start fetching");
        assert_eq!(req.badge_id, "badge_a");
        assert_eq!(seq.phase(), Phase::Processing);
        assert_eq!(seq.queue_len(), 0);
    }

    #[test]
    fn test_fifo_order_one_at_a_time() {
        let mut seq = Sequencer::new();
        let req_a = seq.enqueue("badge_a").unwrap();
        assert!(seq.enqueue("badge_b").is_none(), "second id must wait");
        assert_eq!(seq.queued().collect::<Vec<_>>(), vec!["badge_b"]);

        assert!(deliver(&mut seq, &req_a).is_none());
        assert_eq!(seq.phase(), Phase::Displaying);
        assert_eq!(seq.current().unwrap().id, "badge_a");

        let req_b = seq.close_current().expect("close should advance the queue");
        assert_eq!(req_b.badge_id, "badge_b");
        assert!(seq.current().is_none());

        deliver(&mut seq, &req_b);
        assert_eq!(seq.current().unwrap().id, "badge_b");
        assert!(seq.close_current().is_none());
        assert!(seq.is_settled());
    }

    #[test]
    fn test_enqueue_while_displaying_only_grows_queue() {
        let mut seq = Sequencer::new();
        let req = seq.enqueue("a").unwrap();
        deliver(&mut seq, &req);

        assert!(seq.enqueue("b").is_none());
        assert!(seq.enqueue("c").is_none());
        assert_eq!(seq.current().unwrap().id, "a");
        assert_eq!(seq.queue_len(), 2);
    }

    #[test]
    fn test_duplicates_are_shown_twice() {
        let mut seq = Sequencer::new();
        let first = seq.enqueue("same").unwrap();
        seq.enqueue("same");
        deliver(&mut seq, &first);

        let second = seq.close_current().unwrap();
        assert_eq!(second.badge_id, "same");
        assert_ne!(second.ticket, first.ticket);
    }

    #[test]
    fn test_fetch_failure_drops_item_and_moves_on() {
        let mut seq = Sequencer::new();
        let req_a = seq.enqueue("a").unwrap();
        seq.enqueue("b");

        let next = seq
            .on_fetched(req_a.ticket, Err(AppError::Network("offline".to_string())))
            .expect("next id should be fetched");
        assert_eq!(next.badge_id, "b");
        assert!(seq.current().is_none());
    }

    #[test]
    fn test_missing_badge_returns_to_idle() {
        let mut seq = Sequencer::new();
        let req = seq.enqueue("ghost").unwrap();
        assert!(seq.on_fetched(req.ticket, Ok(None)).is_none());
        assert_eq!(seq.phase(), Phase::Idle);
        assert!(seq.is_settled());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut seq = Sequencer::new();
        let req = seq.enqueue("a").unwrap();
        deliver(&mut seq, &req);

        assert!(seq.close_current().is_none());
        assert!(seq.close_current().is_none());
        assert_eq!(seq.phase(), Phase::Idle);
    }

    #[test]
    fn test_close_during_fetch_leaves_fetch_alone() {
        let mut seq = Sequencer::new();
        let req = seq.enqueue("a").unwrap();
        seq.enqueue("b");

        assert!(seq.close_current().is_none());
        assert_eq!(seq.phase(), Phase::Processing);

        deliver(&mut seq, &req);
        assert_eq!(seq.current().unwrap().id, "a");
        assert_eq!(seq.queue_len(), 1);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut seq = Sequencer::new();
        let req = seq.enqueue("a").unwrap();
        deliver(&mut seq, &req);
        seq.close_current();

        // Same ticket delivered again must not repopulate the slot
        assert!(deliver(&mut seq, &req).is_none());
        assert!(seq.current().is_none());
    }

    #[test]
    fn test_never_two_in_flight_or_displayed() {
        let mut seq = Sequencer::new();
        let mut requests = Vec::new();
        for id in ["a", "b", "c", "d"] {
            if let Some(r) = seq.enqueue(id) {
                requests.push(r);
            }
        }
        assert_eq!(requests.len(), 1);

        let mut shown = Vec::new();
        let mut pending = requests.pop();
        while let Some(req) = pending {
            assert_eq!(seq.phase(), Phase::Processing);
            deliver(&mut seq, &req);
            shown.push(seq.current().unwrap().id.clone());
            pending = seq.close_current();
        }
        assert_eq!(shown, vec!["a", "b", "c", "d"]);
        assert!(seq.is_settled());
    }
}
