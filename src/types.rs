use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Baseline TTL for packets that do not carry data in the TTL field, and
/// the offset added to the payload byte when they do.
pub const TTL_BASE: u8 = 64;

/// Selects which IP header byte smuggles the payload byte. Fixed for the
/// whole run; sender and receiver must agree on it out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// The Type-of-Service byte carries the payload verbatim.
    Tos,
    /// The Time-to-Live byte carries `64 + payload`, wrapping at 256.
    Ttl,
}

impl EncodingMode {
    /// ToS value for a carrier packet holding `byte`.
    pub fn carrier_tos(self, byte: u8) -> u8 {
        match self {
            EncodingMode::Tos => byte,
            EncodingMode::Ttl => 0,
        }
    }

    /// TTL value for a carrier packet holding `byte`. Payload bytes above
    /// 191 wrap around in 8-bit arithmetic; extraction wraps the same way,
    /// so the round trip still recovers the byte.
    pub fn carrier_ttl(self, byte: u8) -> u8 {
        match self {
            EncodingMode::Tos => TTL_BASE,
            EncodingMode::Ttl => TTL_BASE.wrapping_add(byte),
        }
    }

    /// Recovers the hidden byte from a received packet's ToS and TTL fields.
    pub fn extract(self, tos: u8, ttl: u8) -> u8 {
        match self {
            EncodingMode::Tos => tos,
            EncodingMode::Ttl => ttl.wrapping_sub(TTL_BASE),
        }
    }
}

/// Run-scoped sender configuration, built once from the parsed arguments.
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub source_ip: Ipv4Addr,
    pub dest_ip: Ipv4Addr,
    pub source_port: u16,
    pub dest_port: u16,
    pub mode: EncodingMode,
    pub input: PathBuf,
    /// Delay before each packet. One packet per interval is the channel's
    /// only flow control and also its timing signature on the wire.
    pub pacing: Duration,
}

/// Run-scoped receiver configuration.
#[derive(Debug, Clone)]
pub struct ListenSession {
    pub mode: EncodingMode,
    pub output: PathBuf,
    /// When set, packets from any other source address are discarded.
    pub expected_source: Option<Ipv4Addr>,
}

/// Fatal startup errors. Each kind maps to its own exit status; per-packet
/// send and receive failures never surface here.
#[derive(Debug)]
pub enum ChannelError {
    Privilege,
    Usage(String),
    MissingMode,
    Resolve(String),
    File(PathBuf, io::Error),
    Socket(io::Error),
    Io(io::Error),
}

impl ChannelError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ChannelError::Privilege => 1,
            ChannelError::Usage(_) | ChannelError::MissingMode => 2,
            ChannelError::Resolve(_) => 3,
            ChannelError::File(..) => 4,
            ChannelError::Socket(_) => 5,
            ChannelError::Io(_) => 6,
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Privilege => write!(f, "raw sockets need root, run with elevated privileges"),
            ChannelError::Usage(msg) => write!(f, "{}", msg),
            ChannelError::MissingMode => {
                write!(f, "select an encoding field: -t (ToS) or -l (TTL)")
            }
            ChannelError::Resolve(host) => write!(f, "cannot resolve {}", host),
            ChannelError::File(path, err) => write!(f, "cannot open {}: {}", path.display(), err),
            ChannelError::Socket(err) => write!(f, "cannot create raw socket: {}", err),
            ChannelError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl From<io::Error> for ChannelError {
    fn from(err: io::Error) -> Self {
        ChannelError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tos_round_trip_covers_every_byte() {
        for byte in 0..=255u8 {
            let tos = EncodingMode::Tos.carrier_tos(byte);
            let ttl = EncodingMode::Tos.carrier_ttl(byte);
            assert_eq!(tos, byte);
            assert_eq!(ttl, TTL_BASE);
            assert_eq!(EncodingMode::Tos.extract(tos, ttl), byte);
        }
    }

    #[test]
    fn ttl_round_trip_below_wrap_threshold() {
        for byte in 0..=191u8 {
            let tos = EncodingMode::Ttl.carrier_tos(byte);
            let ttl = EncodingMode::Ttl.carrier_ttl(byte);
            assert_eq!(tos, 0);
            assert_eq!(ttl, 64 + byte);
            assert_eq!(EncodingMode::Ttl.extract(tos, ttl), byte);
        }
    }

    #[test]
    fn ttl_wraps_for_bytes_above_191() {
        // 64 + byte no longer fits in eight bits; the carrier value wraps
        // modulo 256 and wrapping extraction still recovers the byte.
        for byte in 192..=255u8 {
            let ttl = EncodingMode::Ttl.carrier_ttl(byte);
            assert_eq!(u16::from(ttl), (64 + u16::from(byte)) % 256);
            assert!(ttl < TTL_BASE);
            assert_eq!(EncodingMode::Ttl.extract(0, ttl), byte);
        }
    }

    #[test]
    fn ttl_wrap_boundary_values() {
        assert_eq!(EncodingMode::Ttl.carrier_ttl(191), 255);
        assert_eq!(EncodingMode::Ttl.carrier_ttl(192), 0);
        assert_eq!(EncodingMode::Ttl.carrier_ttl(255), 63);
        assert_eq!(EncodingMode::Ttl.extract(0, 0), 192);
        assert_eq!(EncodingMode::Ttl.extract(0, 63), 255);
    }

    #[test]
    fn error_exit_codes_are_distinct_per_kind() {
        let io_err = || io::Error::new(io::ErrorKind::Other, "x");
        assert_eq!(ChannelError::Privilege.exit_code(), 1);
        assert_eq!(ChannelError::MissingMode.exit_code(), 2);
        assert_eq!(ChannelError::Resolve("h".into()).exit_code(), 3);
        assert_eq!(ChannelError::File(PathBuf::from("f"), io_err()).exit_code(), 4);
        assert_eq!(ChannelError::Socket(io_err()).exit_code(), 5);
        assert_eq!(ChannelError::Io(io_err()).exit_code(), 6);
    }
}
