use std::net::Ipv4Addr;

use rand::Rng;

use super::checksum::rfc1071_checksum;
use super::tcp::{create_syn_header, TCP_HEADER_LEN};
use crate::types::{EncodingMode, TransferSession};

pub const IP_HEADER_LEN: usize = 20;
/// Every carrier packet is exactly 40 bytes: two bare headers, no payload.
pub const PACKET_LEN: usize = IP_HEADER_LEN + TCP_HEADER_LEN;

const TCP_PROTOCOL_NUM: u8 = 6;

pub struct Ipv4Header {
    // version: 4 bits
    pub version: u8,
    // Internet header length: 4 bits
    pub ihl: u8,
    // Type of service: 8 bits
    pub tos: u8,
    // Total length: 16 bits
    pub total_length: u16,
    // Identification: 16 bits
    pub identification: u16,
    // Flags: 3 bits
    pub flags: u8,
    // Fragment offset: 13 bits
    pub frag_offset: u16,
    // Time to live: 8 bits
    pub ttl: u8,
    // Protocol: 8 bits
    pub proto: u8,
    // Header checksum: 16 bits
    pub checksum: u16,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
}

impl Ipv4Header {
    /// Serializes the header into its 20-byte network-order wire form.
    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(IP_HEADER_LEN);

        buffer.push((self.version << 4) | (self.ihl & 0x0f));
        buffer.push(self.tos);
        buffer.extend_from_slice(&self.total_length.to_be_bytes());
        buffer.extend_from_slice(&self.identification.to_be_bytes());

        let flags_frag = (u16::from(self.flags) << 13) | (self.frag_offset & 0x1fff);
        buffer.extend_from_slice(&flags_frag.to_be_bytes());

        buffer.push(self.ttl);
        buffer.push(self.proto);
        buffer.extend_from_slice(&self.checksum.to_be_bytes());
        buffer.extend_from_slice(&self.source_address.octets());
        buffer.extend_from_slice(&self.destination_address.octets());

        buffer
    }
}

/// Builds the carrier IP header for one payload byte. Exactly one of the
/// ToS or TTL fields holds the byte; the other stays at its neutral default
/// (ToS 0, TTL 64). The identification varies per packet.
fn create_carrier_ip_header<R: Rng>(
    source: Ipv4Addr,
    dest: Ipv4Addr,
    mode: EncodingMode,
    payload: u8,
    rng: &mut R,
) -> Ipv4Header {
    Ipv4Header {
        version: 4,
        ihl: 5,
        tos: mode.carrier_tos(payload),
        total_length: PACKET_LEN as u16,
        identification: rng.gen_range(0..255u16),
        flags: 0,
        frag_offset: 0,
        ttl: mode.carrier_ttl(payload),
        proto: TCP_PROTOCOL_NUM,
        checksum: 0,
        source_address: source,
        destination_address: dest,
    }
}

/// Builds the 12-byte pseudo-header that prefixes the TCP header for
/// checksum purposes. Never transmitted.
fn pseudo_header(source: Ipv4Addr, dest: Ipv4Addr, tcp_length: u16) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(12);
    buffer.extend_from_slice(&source.octets());
    buffer.extend_from_slice(&dest.octets());
    buffer.push(0);
    buffer.push(TCP_PROTOCOL_NUM);
    buffer.extend_from_slice(&tcp_length.to_be_bytes());
    buffer
}

/// Assembles the complete 40-byte wire packet hiding `payload` in the field
/// selected by the session's encoding mode. Both checksums are final.
pub fn build_packet<R: Rng>(session: &TransferSession, payload: u8, rng: &mut R) -> Vec<u8> {
    // TCP first: checksum over pseudo-header + 20-byte header (32 bytes).
    let mut tcp = create_syn_header(session.source_port, session.dest_port, rng);
    let mut checksum_buffer =
        pseudo_header(session.source_ip, session.dest_ip, TCP_HEADER_LEN as u16);
    checksum_buffer.extend_from_slice(&tcp.pack());
    tcp.checksum = rfc1071_checksum(&checksum_buffer);

    let mut ip = create_carrier_ip_header(
        session.source_ip,
        session.dest_ip,
        session.mode,
        payload,
        rng,
    );
    ip.checksum = rfc1071_checksum(&ip.pack());

    let mut packet = ip.pack();
    packet.extend_from_slice(&tcp.pack());
    packet
}
