//! `version`/`verack`: the two commands exchanged during the handshake.
//!
//! Grounded on the teacher's `VersionMessage`/`VerAckMessage` (`peer/wire_protocol.rs`):
//! same two-command exchange, same `nonce`-for-self-connection-detection trick, but
//! carried over Bitmessage's big-endian `message` frame instead of Bitcoin's, with the
//! teacher's single peer `NetAddr` pair (addr_recv/addr_trans) replaced by Bitmessage's
//! `streamNumbers` list and the user-agent stack replacing the raw sub-version string.

use crate::codec::bitfield::{services, Bitfield};
use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::net_addr;
use crate::codec::var_int::{read_var_int, write_var_int};
use crate::codec::var_int_list::{read_var_int_list, write_var_int_list};
use crate::codec::var_str::{read_var_str, write_var_str};
use crate::error::BmResult;
use crate::message::Message;
use std::net::SocketAddr;

pub const COMMAND_VERSION: &str = "version";
pub const COMMAND_VERACK: &str = "verack";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub protocol_version: u64,
    pub services: Bitfield,
    pub timestamp: u64,
    pub addr_recv: SocketAddr,
    pub addr_from: SocketAddr,
    pub nonce: u64,
    pub user_agent: String,
    pub stream_numbers: Vec<u64>,
}

impl VersionMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut composer = ByteBufferComposer::new();
        write_var_int(&mut composer, self.protocol_version);
        self.services.write(&mut composer);
        composer.append_u64_be(self.timestamp);
        net_addr::write_short(&mut composer, &self.services, &self.addr_recv);
        net_addr::write_short(&mut composer, &self.services, &self.addr_from);
        composer.append_u64_be(self.nonce);
        write_var_str(&mut composer, &self.user_agent);
        write_var_int_list(&mut composer, &self.stream_numbers);
        composer.result()
    }

    pub fn decode(payload: &[u8]) -> BmResult<Self> {
        let mut parser = ByteBufferParser::new(payload);
        let protocol_version = read_var_int(&mut parser)?;
        let services = Bitfield::read(&mut parser, services::LEN_BYTES)?;
        let timestamp = parser.read_u64_be()?;
        let (_, addr_recv) = net_addr::read_short(&mut parser)?;
        let (_, addr_from) = net_addr::read_short(&mut parser)?;
        let nonce = parser.read_u64_be()?;
        let user_agent = read_var_str(&mut parser)?;
        let stream_numbers = read_var_int_list(&mut parser)?;
        Ok(VersionMessage {
            protocol_version,
            services,
            timestamp,
            addr_recv,
            addr_from,
            nonce,
            user_agent,
            stream_numbers,
        })
    }

    pub fn to_message(&self) -> BmResult<Message> {
        Message::new(COMMAND_VERSION, self.to_bytes())
    }
}

pub fn verack_message() -> Message {
    Message::new(COMMAND_VERACK, vec![]).expect("empty verack payload always fits")
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn sample() -> VersionMessage {
        let mut services = Bitfield::new(services::LEN_BYTES);
        services.set(crate::codec::bitfield::services::NODE_NETWORK, true).unwrap();
        VersionMessage {
            protocol_version: 3,
            services,
            timestamp: 1_700_000_000,
            addr_recv: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8444),
            addr_from: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 8444),
            nonce: 0x1122334455667788,
            user_agent: "/bitmessage-core:0.1.0/".to_string(),
            stream_numbers: vec![1],
        }
    }

    #[test]
    fn round_trips() {
        let version = sample();
        let bytes = version.to_bytes();
        assert_eq!(VersionMessage::decode(&bytes).unwrap(), version);
    }

    #[test]
    fn wraps_into_a_named_frame() {
        let message = sample().to_message().unwrap();
        assert_eq!(message.command, COMMAND_VERSION);
    }

    #[test]
    fn verack_has_an_empty_payload() {
        let message = verack_message();
        assert_eq!(message.command, COMMAND_VERACK);
        assert!(message.payload.is_empty());
    }
}
