use rand::Rng;

pub const TCP_HEADER_LEN: usize = 20;

/// Window size advertised on every carrier segment.
const SYN_WINDOW: u16 = 512;

/// Represents the structure of a TCP header. The channel only ever emits
/// 20-byte headers: no options, no payload.
#[derive(Debug, Clone)]
pub struct TcpHeader {
    /// Source port (16 bits)
    pub source_port: u16,
    /// Destination port (16 bits)
    pub destination_port: u16,
    /// Sequence number (32 bits)
    pub sequence_number: u32,
    /// Acknowledgment number (32 bits)
    pub ack_number: u32,
    /// Data offset (4 bits) - Number of 32-bit words in header
    pub data_offset: u8,
    /// Control flags
    pub flags_urg: bool, // Urgent
    pub flags_ack: bool, // Acknowledgment
    pub flags_psh: bool, // Push
    pub flags_rst: bool, // Reset
    pub flags_syn: bool, // Synchronize
    pub flags_fin: bool, // Finish
    /// Window size (16 bits)
    pub window: u16,
    /// Checksum (16 bits)
    pub checksum: u16,
    /// Urgent pointer (16 bits)
    pub urgent_pointer: u16,
}

/// Creates the SYN signature segment for one carrier packet. Only the SYN
/// flag is set; the sequence number is drawn fresh per packet so consecutive
/// segments do not look identical on the wire.
pub fn create_syn_header<R: Rng>(
    source_port: u16,
    destination_port: u16,
    rng: &mut R,
) -> TcpHeader {
    TcpHeader {
        source_port,
        destination_port,
        sequence_number: rng.gen_range(1..10_000u32),
        ack_number: 0,
        data_offset: 5,
        flags_urg: false,
        flags_ack: false,
        flags_psh: false,
        flags_rst: false,
        flags_syn: true,
        flags_fin: false,
        window: SYN_WINDOW,
        checksum: 0,
        urgent_pointer: 0,
    }
}

impl TcpHeader {
    /// Serializes the header into its 20-byte network-order wire form.
    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(TCP_HEADER_LEN);

        buffer.extend_from_slice(&self.source_port.to_be_bytes());
        buffer.extend_from_slice(&self.destination_port.to_be_bytes());
        buffer.extend_from_slice(&self.sequence_number.to_be_bytes());
        buffer.extend_from_slice(&self.ack_number.to_be_bytes());

        // Data offset in the high nibble, reserved bits zero.
        buffer.push(self.data_offset << 4);

        let flags: u8 = ((self.flags_urg as u8) << 5)
            | ((self.flags_ack as u8) << 4)
            | ((self.flags_psh as u8) << 3)
            | ((self.flags_rst as u8) << 2)
            | ((self.flags_syn as u8) << 1)
            | (self.flags_fin as u8);
        buffer.push(flags);

        buffer.extend_from_slice(&self.window.to_be_bytes());
        buffer.extend_from_slice(&self.checksum.to_be_bytes());
        buffer.extend_from_slice(&self.urgent_pointer.to_be_bytes());

        buffer
    }
}
