//! `net_addr`: long form (38 bytes, time+stream+services+ip+port) used in `addr`-style
//! listings, and short form (26 bytes, services+ip+port) used inline in `version`.

use std::net::SocketAddr;

use crate::codec::bitfield::{services, Bitfield};
use crate::codec::buffer::{ByteBufferComposer, ByteBufferParser};
use crate::codec::ip;
use crate::error::BmResult;

pub fn write_long(composer: &mut ByteBufferComposer, time: u64, stream: u32, svc: &Bitfield, addr: &SocketAddr) {
    composer.append_u64_be(time);
    composer.append_u32_be(stream);
    write_short(composer, svc, addr);
}

pub fn read_long(parser: &mut ByteBufferParser<'_>) -> BmResult<(u64, u32, Bitfield, SocketAddr)> {
    let time = parser.read_u64_be()?;
    let stream = parser.read_u32_be()?;
    let (svc, addr) = read_short(parser)?;
    Ok((time, stream, svc, addr))
}

pub fn write_short(composer: &mut ByteBufferComposer, svc: &Bitfield, addr: &SocketAddr) {
    svc.write(composer);
    composer.append(&ip::to_wire_bytes(&addr.ip()));
    composer.append_u16_be(addr.port());
}

pub fn read_short(parser: &mut ByteBufferParser<'_>) -> BmResult<(Bitfield, SocketAddr)> {
    let svc = Bitfield::read(parser, services::LEN_BYTES)?;
    let ip_bytes: [u8; 16] = parser.read(16)?.try_into().unwrap();
    let ip_addr = ip::from_wire_bytes(ip_bytes);
    let port = parser.read_u16_be()?;
    Ok((svc, SocketAddr::new(ip_addr, port)))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn long_form_round_trips() {
        let mut svc = Bitfield::new(services::LEN_BYTES);
        svc.set(services::NODE_NETWORK, true).unwrap();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8444);

        let mut composer = ByteBufferComposer::new();
        write_long(&mut composer, 1_700_000_000, 1, &svc, &addr);
        let bytes = composer.result();
        assert_eq!(bytes.len(), 38);

        let mut parser = ByteBufferParser::new(&bytes);
        let (time, stream, svc2, addr2) = read_long(&mut parser).unwrap();
        assert_eq!(time, 1_700_000_000);
        assert_eq!(stream, 1);
        assert_eq!(svc2, svc);
        assert_eq!(addr2, addr);
    }

    #[test]
    fn short_form_is_26_bytes() {
        let svc = Bitfield::new(services::LEN_BYTES);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 8444);
        let mut composer = ByteBufferComposer::new();
        write_short(&mut composer, &svc, &addr);
        assert_eq!(composer.result().len(), 26);
    }
}
