use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

mod hextools;
mod net;
mod recv;
mod resolve;
mod send;
mod types;

use resolve::resolve_ipv4;
use types::{ChannelError, EncodingMode, ListenSession, TransferSession};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SEND_FILE: &str = "secret.txt";
const DEFAULT_RECV_FILE: &str = "secret2.txt";
const DEFAULT_ADDR: &str = "192.168.1.71";
const DEFAULT_PACING_MS: u64 = 1000;

fn help(program_name: &str) {
    let help_message = format!(
        "
************************************************************************************************

    synveil smuggles a file one byte at a time inside the ToS or TTL field of
    spoofed TCP SYN segments. Sender and receiver must agree on the field. 🕳️

    Both modes require root (raw sockets).

    Usage:
    {program_name} --help | -h

    {program_name} --send [-S source] [-D dest] [-s sport] [-d dport] [-f file] [-w millis] (-t | -l)
    {program_name} --recv [-S expected-source] [-f file] (-t | -l)

    Options:
    -S   source address/hostname (send) or expected sender filter (recv)
    -D   destination address/hostname
    -s   TCP source port          (default {DEFAULT_PORT})
    -d   TCP destination port     (default {DEFAULT_PORT})
    -f   input/output file        (default {DEFAULT_SEND_FILE} / {DEFAULT_RECV_FILE})
    -w   pacing delay in milliseconds between packets (default {DEFAULT_PACING_MS})
    -t   hide bytes in the Type-of-Service field
    -l   hide bytes in the Time-to-Live field

    Examples:
    {program_name} --send -S 192.168.1.71 -D 192.168.1.72 -f plans.bin -t
    {program_name} --recv -S 192.168.1.71 -f plans.out -t

************************************************************************************************
",
    );
    println!("{}", help_message);
}

fn require_root() -> Result<(), ChannelError> {
    if unsafe { libc::getuid() } != 0 {
        return Err(ChannelError::Privilege);
    }
    Ok(())
}

fn take_value<'a>(args: &'a [String], index: &mut usize) -> Result<&'a str, ChannelError> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| ChannelError::Usage(format!("{} expects a value", args[*index - 1])))
}

fn parse_port(value: &str) -> Result<u16, ChannelError> {
    value
        .parse::<u16>()
        .map_err(|_| ChannelError::Usage(format!("invalid port number: {}", value)))
}

fn parse_send_args(args: &[String]) -> Result<TransferSession, ChannelError> {
    let mut source = DEFAULT_ADDR.to_string();
    let mut dest = DEFAULT_ADDR.to_string();
    let mut source_port = DEFAULT_PORT;
    let mut dest_port = DEFAULT_PORT;
    let mut input = PathBuf::from(DEFAULT_SEND_FILE);
    let mut pacing = Duration::from_millis(DEFAULT_PACING_MS);
    let mut mode = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-S" => source = take_value(args, &mut i)?.to_string(),
            "-D" => dest = take_value(args, &mut i)?.to_string(),
            "-s" => source_port = parse_port(take_value(args, &mut i)?)?,
            "-d" => dest_port = parse_port(take_value(args, &mut i)?)?,
            "-f" => input = PathBuf::from(take_value(args, &mut i)?),
            "-w" => {
                let millis = take_value(args, &mut i)?;
                let millis = millis
                    .parse::<u64>()
                    .map_err(|_| ChannelError::Usage(format!("invalid delay: {}", millis)))?;
                pacing = Duration::from_millis(millis);
            }
            "-t" => mode = Some(EncodingMode::Tos),
            "-l" => mode = Some(EncodingMode::Ttl),
            other => {
                return Err(ChannelError::Usage(format!("unknown option: {}", other)));
            }
        }
        i += 1;
    }

    // The encoding field must be picked before any file or network activity.
    let mode = mode.ok_or(ChannelError::MissingMode)?;
    let source_ip = resolve_ipv4(&source).map_err(|_| ChannelError::Resolve(source.clone()))?;
    let dest_ip = resolve_ipv4(&dest).map_err(|_| ChannelError::Resolve(dest.clone()))?;

    Ok(TransferSession {
        source_ip,
        dest_ip,
        source_port,
        dest_port,
        mode,
        input,
        pacing,
    })
}

fn parse_recv_args(args: &[String]) -> Result<ListenSession, ChannelError> {
    let mut expected = None;
    let mut output = PathBuf::from(DEFAULT_RECV_FILE);
    let mut mode = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-S" => expected = Some(take_value(args, &mut i)?.to_string()),
            "-f" => output = PathBuf::from(take_value(args, &mut i)?),
            "-t" => mode = Some(EncodingMode::Tos),
            "-l" => mode = Some(EncodingMode::Ttl),
            other => {
                return Err(ChannelError::Usage(format!("unknown option: {}", other)));
            }
        }
        i += 1;
    }

    let mode = mode.ok_or(ChannelError::MissingMode)?;
    let expected_source = match expected {
        Some(host) => {
            Some(resolve_ipv4(&host).map_err(|_| ChannelError::Resolve(host.clone()))?)
        }
        None => None,
    };

    Ok(ListenSession {
        mode,
        output,
        expected_source,
    })
}

fn run() -> Result<(), ChannelError> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--help") | Some("-h") => {
            help(&args[0]);
            Ok(())
        }
        Some("--send") | Some("-s") => {
            require_root()?;
            let session = parse_send_args(&args[2..])?;
            send::run_transfer(&session)
        }
        Some("--recv") | Some("-r") => {
            require_root()?;
            let session = parse_recv_args(&args[2..])?;
            recv::run_receiver(&session)
        }
        Some(other) => Err(ChannelError::Usage(format!(
            "unknown mode {}, use --help to see usage",
            other
        ))),
        None => Err(ChannelError::Usage(
            "no mode given, use --help to see usage".to_string(),
        )),
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("synveil: {}", err);
        process::exit(err.exit_code());
    }
}
