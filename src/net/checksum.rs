/// Computes the RFC 1071 Internet checksum over an arbitrary byte buffer.
///
/// The buffer is summed as big-endian 16-bit words into a 32-bit
/// accumulator. An odd trailing byte is added zero-extended (zero high
/// byte). The carries are folded back into the low 16 bits twice, then the
/// one's complement of the result is returned.
pub fn rfc1071_checksum(buffer: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = buffer.chunks_exact(2);
    for word in &mut words {
        sum += u32::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [odd] = words.remainder() {
        sum += u32::from(*odd);
    }

    // Fold the carry bits from the top 16 bits back into the low 16 bits;
    // the second fold absorbs the carry the first one can produce.
    sum = (sum >> 16) + (sum & 0xffff);
    sum += sum >> 16;

    !(sum as u16)
}
