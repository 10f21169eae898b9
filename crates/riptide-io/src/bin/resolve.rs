//! Command-line front end for the resolution façades.
//!
//! Forward: `resolve example.org https --canonname`
//! Reverse: `resolve --reverse 127.0.0.1:80 --numeric-host --numeric-serv`

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use riptide_io::dns;
use riptide_io::{AddrInfoFlag, AddrInfoHints, NameInfoFlag};

#[derive(Parser)]
#[command(
    name = "resolve",
    about = "Forward and reverse name resolution through the OS resolver"
)]
struct Args {
    /// Host name or address (ip:port with --reverse).
    host: String,

    /// Service name or port number.
    #[arg(default_value = "")]
    service: String,

    /// Reverse lookup: map an address back to names.
    #[arg(long)]
    reverse: bool,

    /// The host argument is numeric; skip name lookup.
    #[arg(long)]
    numeric_host: bool,

    /// The service argument is numeric; skip service lookup.
    #[arg(long)]
    numeric_serv: bool,

    /// Request the canonical host name (forward only).
    #[arg(long)]
    canonname: bool,

    /// Restrict to one address family: 4 or 6 (forward only).
    #[arg(long)]
    family: Option<u8>,

    /// Emit JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let outcome = if args.reverse {
        reverse(&args).await
    } else {
        forward(&args).await
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("resolve: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn forward(args: &Args) -> Result<(), String> {
    let mut hints = AddrInfoHints::for_socket(libc::AF_UNSPEC, libc::SOCK_STREAM);
    match args.family {
        Some(4) => hints.family = libc::AF_INET,
        Some(6) => hints.family = libc::AF_INET6,
        Some(other) => return Err(format!("unknown address family {other}")),
        None => {}
    }
    if args.numeric_host {
        hints.flags.push(AddrInfoFlag::NumericHost);
    }
    if args.numeric_serv {
        hints.flags.push(AddrInfoFlag::NumericServ);
    }
    if args.canonname {
        hints.flags.push(AddrInfoFlag::CanonName);
    }

    let addrs = dns::resolve(Some(&hints), &args.host, &args.service)
        .await
        .map_err(|e| e.to_string())?;
    if args.json {
        let rendered = serde_json::to_string_pretty(&addrs).map_err(|e| e.to_string())?;
        println!("{rendered}");
    } else {
        for info in &addrs {
            if info.canon_name.is_empty() {
                println!("{}", info.addr);
            } else {
                println!("{}\t{}", info.addr, info.canon_name);
            }
        }
    }
    Ok(())
}

async fn reverse(args: &Args) -> Result<(), String> {
    let addr: SocketAddr = args
        .host
        .parse()
        .map_err(|_| format!("`{}` is not an ip:port address", args.host))?;
    let mut flags = Vec::new();
    if args.numeric_host {
        flags.push(NameInfoFlag::NumericHost);
    }
    if args.numeric_serv {
        flags.push(NameInfoFlag::NumericServ);
    }

    let (host, service) = dns::resolve_name(&flags, true, true, addr)
        .await
        .map_err(|e| e.to_string())?;
    if args.json {
        let rendered = serde_json::json!({ "host": host, "service": service });
        println!("{rendered:#}");
    } else {
        println!("{host}\t{service}");
    }
    Ok(())
}
