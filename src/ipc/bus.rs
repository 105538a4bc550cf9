use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::channel::{Channel, Envelope, MessageId, Reply};

pub type ReplyCallback = Box<dyn FnOnce(Value) + 'static>;

/// The message channel to the core process. Fire-and-forget by default;
/// `request` registers a one-shot reply callback. The transport is assumed
/// reliable, so there are no retries and no timeouts.
pub trait MessageBus {
    fn send(&self, channel: Channel, payload: Value);
    fn request(&self, channel: Channel, payload: Value, on_reply: ReplyCallback);
}

/// Production bus over tokio channels. Lives on the UI event loop; the loop
/// calls `pump()` every tick to run reply callbacks on this thread.
pub struct CoreLink {
    outbound: mpsc::UnboundedSender<Envelope>,
    inbound_replies: RefCell<mpsc::UnboundedReceiver<Reply>>,
    pending: RefCell<HashMap<Uuid, ReplyCallback>>,
}

/// The transport-facing ends of a `CoreLink` pair
pub struct CoreSide {
    pub outbound: mpsc::UnboundedReceiver<Envelope>,
    pub replies: mpsc::UnboundedSender<Reply>,
}

impl CoreLink {
    /// Create a link plus the half the core transport attaches to
    pub fn pair() -> (Rc<Self>, CoreSide) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let link = Rc::new(Self {
            outbound: out_tx,
            inbound_replies: RefCell::new(reply_rx),
            pending: RefCell::new(HashMap::new()),
        });
        let side = CoreSide {
            outbound: out_rx,
            replies: reply_tx,
        };
        (link, side)
    }

    fn dispatch(&self, envelope: Envelope) {
        debug!("ipc send {}", envelope.channel);
        if self.outbound.send(envelope).is_err() {
            warn!("core link is down; message dropped");
        }
    }

    /// Run callbacks for any replies that have arrived
    pub fn pump(&self) {
        loop {
            let reply = match self.inbound_replies.borrow_mut().try_recv() {
                Ok(reply) => reply,
                Err(_) => break,
            };
            let callback = self.pending.borrow_mut().remove(&reply.request.0);
            match callback {
                Some(callback) => callback(reply.payload),
                None => debug!("reply for unknown request {:?}", reply.request),
            }
        }
    }
}

impl MessageBus for CoreLink {
    fn send(&self, channel: Channel, payload: Value) {
        self.dispatch(Envelope {
            id: MessageId::new(),
            channel,
            payload,
        });
    }

    fn request(&self, channel: Channel, payload: Value, on_reply: ReplyCallback) {
        let id = MessageId::new();
        self.pending.borrow_mut().insert(id.0, on_reply);
        self.dispatch(Envelope {
            id,
            channel,
            payload,
        });
    }
}

/// Test double: records every send and holds reply-style requests until the
/// test answers them with `respond`.
#[derive(Default)]
pub struct RecordingBus {
    sent: RefCell<Vec<(Channel, Value)>>,
    pending: RefCell<Vec<(Channel, ReplyCallback)>>,
}

impl RecordingBus {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// All fire-and-forget sends, in order
    pub fn sent(&self) -> Vec<(Channel, Value)> {
        self.sent.borrow().clone()
    }

    /// Payloads sent on one channel
    pub fn sent_on(&self, channel: Channel) -> Vec<Value> {
        self.sent
            .borrow()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Channels of requests still waiting for a reply
    pub fn pending_requests(&self) -> Vec<Channel> {
        self.pending.borrow().iter().map(|(c, _)| *c).collect()
    }

    /// Answer the oldest pending request on `channel`; returns false if none
    pub fn respond(&self, channel: Channel, payload: Value) -> bool {
        let position = self
            .pending
            .borrow()
            .iter()
            .position(|(c, _)| *c == channel);
        match position {
            Some(pos) => {
                let (_, callback) = self.pending.borrow_mut().remove(pos);
                callback(payload);
                true
            }
            None => false,
        }
    }
}

impl MessageBus for RecordingBus {
    fn send(&self, channel: Channel, payload: Value) {
        self.sent.borrow_mut().push((channel, payload));
    }

    fn request(&self, channel: Channel, _payload: Value, on_reply: ReplyCallback) {
        self.pending.borrow_mut().push((channel, on_reply));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    #[test]
    fn core_link_sends_envelopes() {
        let (link, mut side) = CoreLink::pair();
        link.send(Channel::FileNew, json!({"name": "a.md"}));
        let envelope = side.outbound.try_recv().unwrap();
        assert_eq!(envelope.channel, Channel::FileNew);
        assert_eq!(envelope.payload, json!({"name": "a.md"}));
    }

    #[test]
    fn reply_callback_fires_exactly_once_and_is_forgotten() {
        let (link, mut side) = CoreLink::pair();
        let calls = Rc::new(Cell::new(0u32));

        let seen = Rc::clone(&calls);
        link.request(Channel::GetCustomCss, Value::Null, Box::new(move |_| {
            seen.set(seen.get() + 1);
        }));

        let request_id = side.outbound.try_recv().unwrap().id;
        side.replies
            .send(Reply {
                request: request_id,
                payload: json!("body { }"),
            })
            .unwrap();
        // A stray duplicate reply must not fire the callback again
        side.replies
            .send(Reply {
                request: request_id,
                payload: json!("dup"),
            })
            .unwrap();

        link.pump();
        assert_eq!(calls.get(), 1);
        assert!(link.pending.borrow().is_empty());
    }

    #[test]
    fn unknown_reply_is_ignored() {
        let (link, side) = CoreLink::pair();
        side.replies
            .send(Reply {
                request: MessageId::new(),
                payload: Value::Null,
            })
            .unwrap();
        link.pump();
    }

    #[test]
    fn recording_bus_answers_requests_in_order() {
        let bus = RecordingBus::new();
        let got: Rc<RefCell<Vec<Value>>> = Rc::default();

        let sink = Rc::clone(&got);
        bus.request(Channel::GetTagsDatabase, Value::Null, Box::new(move |v| {
            sink.borrow_mut().push(v);
        }));

        assert_eq!(bus.pending_requests(), vec![Channel::GetTagsDatabase]);
        assert!(bus.respond(Channel::GetTagsDatabase, json!([{"name": "todo", "count": 3}])));
        assert!(!bus.respond(Channel::GetTagsDatabase, Value::Null));
        assert_eq!(got.borrow().len(), 1);
    }
}
