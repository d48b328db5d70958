//! The peer handshake state machine: a sans-I/O `Connection` that consumes bytes
//! via [`Connection::on_bytes`] and emits a closed set of typed [`Event`]s, leaving actual
//! socket I/O to a transport the caller owns.
//!
//! Grounded on the teacher's `ConversationTopicHandler`/`HandshakeInitConversationTopic`
//! (`peer/conversation.rs`): the same split between pure state-transition logic and the
//! actual async socket loop (`peer/connection.rs` in the teacher, not carried over here;
//! transport ownership is explicitly the caller's). The version/verack exchange itself is
//! generalized from the teacher's two-message Bitcoin handshake to Bitmessage's richer
//! validation: self-connection nonce, clock skew, stream intersection and service-bit gating.

pub mod version;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::bitfield::{services, Bitfield};
use crate::codec::buffer::IOBuffer;
use crate::error::{BmError, BmResult};
use crate::message::{DecodeOutcome, Message};
use version::{verack_message, VersionMessage, COMMAND_VERACK, COMMAND_VERSION};

pub const MIN_PROTOCOL_VERSION: u64 = 3;
pub const CLOCK_SKEW_TOLERANCE_SECONDS: i64 = 3600;
pub const HANDSHAKE_TIMEOUT_SECONDS: u64 = 20;
pub const ESTABLISHED_IDLE_TIMEOUT_SECONDS: u64 = 600;

pub fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock is before the unix epoch").as_secs()
}

/// Which side opened the TCP connection; the handshake is otherwise symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Inbound,
    Outbound,
}

/// Which required service bit this node advertises and demands of its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Normal,
    Gateway,
    Mobile,
}

impl NodeRole {
    pub fn required_service(self) -> u32 {
        match self {
            NodeRole::Normal => services::NODE_NETWORK,
            NodeRole::Gateway => services::NODE_GATEWAY,
            NodeRole::Mobile => services::NODE_MOBILE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Opened,
    SentVersion,
    GotVersion,
    Established,
    Closed,
}

/// Events the state machine emits, mirroring the transport collaborator interface: the
/// caller forwards these to its own application layer and writes [`Connection::take_outbound`]
/// bytes to the socket.
#[derive(Debug)]
pub enum Event {
    Open,
    /// A non-handshake command, once the connection is `Established`.
    Message { command: String, payload: Vec<u8> },
    Established(u64),
    Warning(BmError),
    Error(BmError),
    Close,
}

/// Everything the local node brings to the handshake: its own advertised version fields
/// plus the role that decides which service bit it requires of the peer.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub protocol_version: u64,
    pub services: Bitfield,
    pub addr_recv: std::net::SocketAddr,
    pub addr_from: std::net::SocketAddr,
    pub nonce: u64,
    pub user_agent: String,
    pub stream_numbers: Vec<u64>,
    pub role: NodeRole,
}

/// O(n·m) pairwise compare; both lists are short in practice (the local list is tiny, the
/// peer's list is bounded by [`crate::codec::var_int_list::MAX_LIST_LEN`]).
fn streams_intersect(local: &[u64], remote: &[u64]) -> bool {
    local.iter().any(|l| remote.contains(l))
}

pub struct Connection {
    role: Role,
    local: LocalConfig,
    state: State,
    inbound: IOBuffer,
    outbound: Vec<u8>,
    version_sent: bool,
    verack_sent: bool,
    verack_received: bool,
    pub remote_version: Option<VersionMessage>,
}

impl Connection {
    pub fn new(role: Role, local: LocalConfig) -> Self {
        Connection {
            role,
            local,
            state: State::Opened,
            inbound: IOBuffer::default(),
            outbound: Vec::new(),
            version_sent: false,
            verack_sent: false,
            verack_received: false,
            remote_version: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drains the bytes queued for the transport to write out.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    fn build_version_message(&self) -> VersionMessage {
        VersionMessage {
            protocol_version: self.local.protocol_version,
            services: self.local.services.clone(),
            timestamp: now_unix(),
            addr_recv: self.local.addr_recv,
            addr_from: self.local.addr_from,
            nonce: self.local.nonce,
            user_agent: self.local.user_agent.clone(),
            stream_numbers: self.local.stream_numbers.clone(),
        }
    }

    fn queue(&mut self, message: &Message) {
        self.outbound.extend(message.to_bytes());
    }

    fn send_version(&mut self) -> BmResult<()> {
        let version = self.build_version_message();
        self.queue(&version.to_message()?);
        self.version_sent = true;
        Ok(())
    }

    /// Outbound connections send `version` immediately on open; inbound connections wait
    /// for the peer's `version` first.
    pub fn open(&mut self) -> Vec<Event> {
        let mut events = vec![Event::Open];
        if self.role == Role::Outbound {
            match self.send_version() {
                Ok(()) => self.state = State::SentVersion,
                Err(err) => {
                    events.push(Event::Error(err));
                    events.extend(self.close());
                }
            }
        }
        events
    }

    pub fn on_bytes(&mut self, bytes: &[u8]) -> Vec<Event> {
        if self.state == State::Closed {
            return vec![];
        }
        self.inbound.extend(bytes);
        let mut events = Vec::new();
        loop {
            match crate::message::try_decode(&self.inbound) {
                DecodeOutcome::Pending => break,
                DecodeOutcome::Corrupt { bytes_to_drop } => {
                    self.inbound.shift_left(bytes_to_drop);
                }
                DecodeOutcome::Ok { message, consumed } => {
                    self.inbound.shift_left(consumed);
                    let stop = self.handle_message(message, &mut events);
                    if stop {
                        break;
                    }
                }
            }
        }
        events
    }

    /// Returns `true` once the connection has closed, so `on_bytes` stops processing
    /// further buffered frames.
    fn handle_message(&mut self, message: Message, events: &mut Vec<Event>) -> bool {
        if self.state == State::Closed {
            return true;
        }
        match message.command.as_str() {
            COMMAND_VERSION => self.handle_version(&message.payload, events),
            COMMAND_VERACK => {
                self.verack_received = true;
                if let Some(event) = self.maybe_establish() {
                    events.push(event);
                }
                false
            }
            _ => {
                if self.state == State::Established {
                    events.push(Event::Message { command: message.command, payload: message.payload });
                } else {
                    events.push(Event::Warning(BmError::protocol(format!(
                        "received '{}' before the handshake completed",
                        message.command
                    ))));
                }
                false
            }
        }
    }

    fn handle_version(&mut self, payload: &[u8], events: &mut Vec<Event>) -> bool {
        if self.remote_version.is_some() {
            events.push(Event::Error(BmError::protocol("duplicate version message")));
            events.extend(self.close());
            return true;
        }

        let version = match VersionMessage::decode(payload) {
            Ok(v) => v,
            Err(err) => {
                events.push(Event::Error(err));
                events.extend(self.close());
                return true;
            }
        };

        if let Err(err) = self.validate_version(&version) {
            events.push(Event::Error(err));
            events.extend(self.close());
            return true;
        }

        self.remote_version = Some(version);
        self.state = State::GotVersion;

        if self.role == Role::Inbound && !self.version_sent {
            if let Err(err) = self.send_version() {
                events.push(Event::Error(err));
                events.extend(self.close());
                return true;
            }
        }

        self.queue(&verack_message());
        self.verack_sent = true;

        if let Some(event) = self.maybe_establish() {
            events.push(event);
        }
        false
    }

    fn validate_version(&self, version: &VersionMessage) -> BmResult<()> {
        if version.protocol_version < MIN_PROTOCOL_VERSION {
            return Err(BmError::protocol(format!(
                "peer protocol version {} is below the minimum of {}",
                version.protocol_version, MIN_PROTOCOL_VERSION
            )));
        }
        if version.nonce == self.local.nonce {
            return Err(BmError::protocol("Connection to self"));
        }
        let skew = version.timestamp as i64 - now_unix() as i64;
        if skew.abs() > CLOCK_SKEW_TOLERANCE_SECONDS {
            return Err(BmError::protocol(format!("peer clock skew of {} seconds exceeds tolerance", skew)));
        }
        if !streams_intersect(&self.local.stream_numbers, &version.stream_numbers) {
            return Err(BmError::protocol("peer advertises no stream number in common with ours"));
        }
        let required = self.local.role.required_service();
        if !version.services.get(required).unwrap_or(false) {
            return Err(BmError::protocol(format!(
                "peer is missing the service bit required for a {:?} node",
                self.local.role
            )));
        }
        Ok(())
    }

    fn maybe_establish(&mut self) -> Option<Event> {
        if self.verack_sent && self.verack_received && self.state != State::Established {
            self.state = State::Established;
            let version = self.remote_version.as_ref().map(|v| v.protocol_version).unwrap_or(0);
            Some(Event::Established(version))
        } else {
            None
        }
    }

    pub fn close(&mut self) -> Vec<Event> {
        if self.state == State::Closed {
            vec![]
        } else {
            self.state = State::Closed;
            vec![Event::Close]
        }
    }
}
