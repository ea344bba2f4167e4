use std::io;

use clap::{App, Arg};
use env_logger::Builder;
use log::{debug, error, info, LevelFilter};

use asbgpd::config::RouterConfig;
use asbgpd::handler::Router;
use asbgpd::session::SessionManager;

fn main() -> io::Result<()> {
    let matches = App::new("asbgpd")
        .version("0.1")
        .about("Simplified inter-AS routing daemon")
        .arg(
            Arg::with_name("asn")
                .help("Local AS number")
                .takes_value(true)
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name("neighbor")
                .help("Neighbor descriptor: <port>-<addr>-<cust|peer|prov>")
                .takes_value(true)
                .multiple(true)
                .index(2)
                .required(true),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of logging verbosity"),
        )
        .get_matches();

    let asn: u32 = matches
        .value_of("asn")
        .unwrap()
        .parse()
        .expect("AS number must be an integer");
    let descriptors: Vec<String> = matches
        .values_of("neighbor")
        .unwrap()
        .map(String::from)
        .collect();

    let (asbgpd_level, other_level) = match matches.occurrences_of("v") {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    Builder::new()
        .filter(Some("asbgpd"), asbgpd_level)
        .filter(None, other_level)
        .init();

    let config = RouterConfig::new(asn, &descriptors).expect("Invalid neighbor descriptor");
    debug!(
        "Configured {} neighbors for AS {}",
        config.neighbors.len(),
        config.local_as
    );

    // Handlers mutate the RIB without locks, everything runs on one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: RouterConfig) -> io::Result<()> {
    let mut sessions = SessionManager::connect(&config).await?;
    let mut router = Router::new(&config);

    for handshake in router.handshake_frames() {
        if let Err(err) = sessions.send(&handshake).await {
            error!("Handshake to {} failed: {}", handshake.to, err);
        }
    }
    info!(
        "AS {} online with {} neighbors",
        config.local_as,
        config.neighbors.len()
    );

    loop {
        let (source, frame) = match sessions.recv_frame().await {
            Ok(received) => received,
            Err(err) => {
                error!("{}", err);
                continue;
            }
        };
        for outbound in router.handle_frame(source, &frame) {
            if let Err(err) = sessions.send(&outbound).await {
                error!("Send to {} failed: {}", outbound.to, err);
            }
        }
    }
}
