use std::fs::File;
use std::io::{BufReader, Read};
use std::net::{IpAddr, SocketAddr};
use std::thread;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::hextools::format_hexdump;
use crate::net::ip::build_packet;
use crate::types::{ChannelError, TransferSession};

/// Drives the send loop: one packet per input byte, in strict file order,
/// paced by the session's delay. Transmission is fire-and-forget; a failed
/// send is logged and the loop moves on to the next byte.
pub fn run_transfer(session: &TransferSession) -> Result<(), ChannelError> {
    let input = File::open(&session.input)
        .map_err(|err| ChannelError::File(session.input.clone(), err))?;

    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::TCP))
        .map_err(ChannelError::Socket)?;
    socket
        .set_header_included_v4(true)
        .map_err(ChannelError::Socket)?;

    // The peer sockaddr takes the TCP *source* port, not the destination
    // port; raw sockets ignore it on send, so the wire is unaffected.
    let peer = SockAddr::from(SocketAddr::new(
        IpAddr::V4(session.dest_ip),
        session.source_port,
    ));

    println!("📤 Sending {} to {}", session.input.display(), session.dest_ip);
    println!("  Pacing: {:?} per byte", session.pacing);

    let mut rng = rand::thread_rng();
    let mut sent = 0usize;

    for byte in BufReader::new(input).bytes() {
        let byte = byte.map_err(ChannelError::Io)?;

        thread::sleep(session.pacing);

        let packet = build_packet(session, byte, &mut rng);
        match socket.send_to(&packet, &peer) {
            Ok(_) => {
                sent += 1;
                println!("Sent byte #{} (0x{:02x})", sent, byte);
                println!("{}", format_hexdump(&packet));
            }
            Err(err) => println!("Send failed for byte 0x{:02x}: {}", byte, err),
        }
    }

    println!("✅ Transfer complete, {} packets sent", sent);
    Ok(())
}
