/// Formats a byte buffer as a classic 16-bytes-per-row hexdump with an
/// ASCII gutter, used for the per-packet trace output.
pub fn format_hexdump(data: &[u8]) -> String {
    let mut out = String::new();

    for (row, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!("0x{:04x}:  ", row * 16));

        for col in 0..16 {
            match chunk.get(col) {
                Some(byte) => out.push_str(&format!("{:02x} ", byte)),
                None => out.push_str("   "),
            }
            // Extra gap between the two 8-byte halves.
            if col == 7 {
                out.push(' ');
            }
        }

        out.push(' ');
        for &byte in chunk {
            out.push(if byte.is_ascii_graphic() { byte as char } else { '.' });
        }
        out.push('\n');
    }

    out
}
