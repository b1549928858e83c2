use std::fs::File;
use std::io::Write;
use std::mem::MaybeUninit;
use std::net::Ipv4Addr;

use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::tcp::{TcpFlags, TcpPacket};
use socket2::{Domain, Protocol, Socket, Type};

use crate::hextools::format_hexdump;
use crate::net::ip::PACKET_LEN;
use crate::types::{ChannelError, EncodingMode, ListenSession};

/// Largest raw datagram a single read will accept.
const MAX_DATAGRAM: usize = 65535;

/// Extracts the hidden byte from a raw IPv4 buffer, or `None` when the
/// packet does not match the channel signature.
///
/// A packet is accepted only when it parses as IPv4, its TCP SYN flag is
/// set, and (if a filter is configured) its source address matches exactly.
/// Checksums are not verified on receipt.
pub fn decode_packet(
    buf: &[u8],
    mode: EncodingMode,
    expected_source: Option<Ipv4Addr>,
) -> Option<u8> {
    let ip = Ipv4Packet::new(buf)?;
    if ip.get_version() != 4 {
        return None;
    }

    if let Some(source) = expected_source {
        if ip.get_source() != source {
            return None;
        }
    }

    let header_len = usize::from(ip.get_header_length()) * 4;
    let tcp = TcpPacket::new(buf.get(header_len..)?)?;
    if tcp.get_flags() & TcpFlags::SYN == 0 {
        return None;
    }

    let tos = (ip.get_dscp() << 2) | ip.get_ecn();
    Some(mode.extract(tos, ip.get_ttl()))
}

/// Runs the receive loop until the process is terminated externally; this
/// one-way channel carries no end-of-stream marker, so there is no natural
/// exit. Each accepted packet appends one byte to the output file, flushed
/// immediately so every decoded byte survives a crash on its own.
pub fn run_receiver(session: &ListenSession) -> Result<(), ChannelError> {
    let mut output = File::create(&session.output)
        .map_err(|err| ChannelError::File(session.output.clone(), err))?;

    println!("📥 Listening for covert SYN traffic...");
    if let Some(source) = session.expected_source {
        println!("  Accepting packets from {} only", source);
    }

    let mut received = 0usize;
    loop {
        // One socket per packet, recreated each pass; a read error on one
        // pass does not poison the next.
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::TCP))
            .map_err(ChannelError::Socket)?;

        let mut recv_buffer: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); MAX_DATAGRAM];
        let received_len = match socket.recv(&mut recv_buffer[..]) {
            Ok(n) => n,
            Err(err) => {
                println!("Receive error: {}", err);
                continue;
            }
        };

        let buf: &[u8] = unsafe {
            std::slice::from_raw_parts(recv_buffer.as_ptr() as *const u8, received_len)
        };

        if let Some(byte) = decode_packet(buf, session.mode, session.expected_source) {
            output.write_all(&[byte])?;
            output.flush()?;
            received += 1;

            println!("Receiving data: 0x{:02x} ({} so far)", byte, received);
            println!("{}", format_hexdump(&buf[..buf.len().min(PACKET_LEN)]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ip::build_packet;
    use crate::types::TransferSession;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;
    use std::time::Duration;

    const SENDER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 71);

    fn session(mode: EncodingMode) -> TransferSession {
        TransferSession {
            source_ip: SENDER,
            dest_ip: Ipv4Addr::new(192, 168, 1, 72),
            source_port: 8000,
            dest_port: 8000,
            mode,
            input: PathBuf::from("secret.txt"),
            pacing: Duration::from_millis(0),
        }
    }

    #[test]
    fn decodes_tos_packet_with_matching_filter() {
        let mut rng = StdRng::seed_from_u64(10);
        let packet = build_packet(&session(EncodingMode::Tos), 0x41, &mut rng);
        assert_eq!(
            decode_packet(&packet, EncodingMode::Tos, Some(SENDER)),
            Some(0x41)
        );
    }

    #[test]
    fn decodes_ttl_packet_without_filter() {
        let mut rng = StdRng::seed_from_u64(11);
        let packet = build_packet(&session(EncodingMode::Ttl), 0xc8, &mut rng);
        // 0xc8 wraps the TTL field; wrapping extraction recovers it.
        assert_eq!(decode_packet(&packet, EncodingMode::Ttl, None), Some(0xc8));
    }

    #[test]
    fn discards_packet_from_unexpected_source() {
        let mut rng = StdRng::seed_from_u64(12);
        let packet = build_packet(&session(EncodingMode::Tos), 0x41, &mut rng);
        let other = Ipv4Addr::new(10, 0, 0, 1);
        assert_eq!(decode_packet(&packet, EncodingMode::Tos, Some(other)), None);
    }

    #[test]
    fn discards_packet_without_syn() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut packet = build_packet(&session(EncodingMode::Tos), 0x41, &mut rng);
        packet[33] = 0; // clear the TCP flag byte
        assert_eq!(decode_packet(&packet, EncodingMode::Tos, Some(SENDER)), None);
    }

    #[test]
    fn discards_truncated_buffers() {
        let mut rng = StdRng::seed_from_u64(14);
        let packet = build_packet(&session(EncodingMode::Tos), 0x41, &mut rng);
        assert_eq!(decode_packet(&packet[..10], EncodingMode::Tos, None), None);
        assert_eq!(decode_packet(&packet[..25], EncodingMode::Tos, None), None);
        assert_eq!(decode_packet(&[], EncodingMode::Tos, None), None);
    }

    #[test]
    fn sequential_packets_decode_in_file_order() {
        let session = session(EncodingMode::Tos);
        let mut rng = StdRng::seed_from_u64(15);
        let input: Vec<u8> = vec![0x41, 0x42, 0x00, 0xff, 0x10];

        let packets: Vec<Vec<u8>> = input
            .iter()
            .map(|&byte| build_packet(&session, byte, &mut rng))
            .collect();

        // The first two ToS fields match the end-to-end scenario bytes.
        assert_eq!(packets[0][1], 0x41);
        assert_eq!(packets[1][1], 0x42);

        let decoded: Vec<u8> = packets
            .iter()
            .filter_map(|p| decode_packet(p, EncodingMode::Tos, Some(SENDER)))
            .collect();
        assert_eq!(decoded, input);
    }
}
