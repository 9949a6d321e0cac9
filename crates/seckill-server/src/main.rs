//! Server implementation

#![warn(missing_docs)]

mod http;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use metrics_exporter_prometheus::PrometheusBuilder;
use seckill_core::{Config, RequestHandler, StoreKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command line options
#[derive(Debug)]
struct Opts {
    /// Configuration of the seckill engine
    config: Config,

    /// Port for the HTTP server to listen on
    port: u16,
    /// Host for the HTTP server to listen on
    host: String,
    /// Number of request handling threads
    handler_threads: u32,
    /// Port for the Prometheus scrape endpoint, none if unset
    metrics_port: Option<u16>,

    /// Set the inventory record to this many units before serving
    provision: Option<u64>,
}

fn parse<T: std::str::FromStr>(opt: &str, arg: &str, what: &str) -> Result<T> {
    arg.parse()
        .map_err(|_| eyre!("{opt} takes a decimal {what}, got `{arg}`"))
}

impl Opts {
    fn from_args() -> Result<Self> {
        let mut opts = Opts {
            port: 3001,
            host: String::from("127.0.0.1"),
            config: Config::default(),
            handler_threads: 64,
            metrics_port: None,
            provision: None,
        };
        if let Ok(url) = std::env::var("SECKILL_REDIS_URL") {
            opts.config.redis_url = url;
        }

        let mut option: Option<String> = None;
        for arg in std::env::args().skip(1) {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-port" => opts.port = parse(&opt, &arg, "u16")?,
                    "-host" => opts.host = arg,
                    "-handler-threads" => opts.handler_threads = parse(&opt, &arg, "u32")?,
                    "-metrics-port" => opts.metrics_port = Some(parse(&opt, &arg, "u16")?),
                    "-local-capacity" => opts.config.local_capacity = parse(&opt, &arg, "u32")?,
                    "-admission-timeout-ms" => {
                        opts.config.admission_timeout =
                            Duration::from_millis(parse(&opt, &arg, "u64")?)
                    }
                    "-redis-url" => opts.config.redis_url = arg,
                    "-pool-size" => opts.config.pool_size = parse(&opt, &arg, "u32")?,
                    "-pool-timeout-ms" => {
                        opts.config.pool_timeout = Duration::from_millis(parse(&opt, &arg, "u64")?)
                    }
                    "-order-key" => opts.config.order_key = arg,
                    "-total-field" => opts.config.total_field = arg,
                    "-sold-field" => opts.config.sold_field = arg,
                    "-audit-log" => opts.config.audit_log = PathBuf::from(arg),
                    "-provision" => opts.provision = Some(parse(&opt, &arg, "u64")?),
                    "-memory" => {
                        opts.config.store = StoreKind::Memory {
                            total: parse(&opt, &arg, "u64")?,
                        }
                    }
                    _ => {
                        eprintln!("Error: ignoring unknown option {opt}");
                        std::process::exit(1);
                    }
                }
                option = None;
            } else {
                option = Some(arg);
            }
        }
        if let Some(opt) = option {
            eprintln!("Error: ignoring leftover option {opt}");
            std::process::exit(1);
        }
        if opts.handler_threads == 0 {
            return Err(eyre!("-handler-threads must be at least 1"));
        }
        if opts.config.pool_size == 0 {
            return Err(eyre!("-pool-size must be at least 1"));
        }

        Ok(opts)
    }
}

fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H, stopping: &AtomicBool) {
    loop {
        match server.recv() {
            Ok(rq) => {
                if let Some(rq) = http::parse(rq) {
                    handler.handle(rq);
                }
            }
            Err(_) if stopping.load(Ordering::Acquire) => return,
            Err(err) => {
                error!(error = %err, "HTTP receive failed");
                return;
            }
        }
    }
}

/// Run `threads` handler threads until the server fails or [`stop`] is called
fn serve<H: RequestHandler + Sync>(
    server: &tiny_http::Server,
    handler: &H,
    threads: u32,
    stopping: &AtomicBool,
) -> Result<()> {
    thread::scope(|s| -> Result<()> {
        for i in 0..threads {
            thread::Builder::new()
                .name(format!("handler_{i}"))
                .spawn_scoped(s, || http_loop(server, handler, stopping))
                .wrap_err("failed to spawn handler thread")?;
        }
        Ok(())
    })
}

/// Make every thread blocked in [`http_loop`] return
fn stop(server: &tiny_http::Server, threads: u32, stopping: &AtomicBool) {
    stopping.store(true, Ordering::Release);
    // each call wakes a single receiver
    for _ in 0..threads {
        server.unblock();
    }
}

/// Stop the server on Ctrl-C
fn stop_on_ctrl_c(server: Arc<tiny_http::Server>, threads: u32, stopping: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name(String::from("signal"))
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "no signal handling, Ctrl-C skips the audit flush");
                    return;
                }
            };
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    info!("received Ctrl-C, shutting down");
                    stop(&server, threads, &stopping);
                }
                Err(err) => warn!(error = %err, "cannot listen for Ctrl-C"),
            }
        });
    if let Err(err) = spawned {
        warn!(error = %err, "failed to spawn signal thread");
    }
}

fn install_metrics(host: &str, port: u16) -> Result<()> {
    let addr: std::net::IpAddr = host
        .parse()
        .map_err(|_| eyre!("-metrics-port needs a numeric -host, got `{host}`"))?;
    PrometheusBuilder::new()
        .with_http_listener((addr, port))
        .install()
        .wrap_err("failed to install metrics exporter")?;
    info!(host, port, "serving metrics");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::from_args()?;
    if let Some(port) = opts.metrics_port {
        install_metrics(&opts.host, port)?;
    }

    let handler = seckill_engine::launch(&opts.config).wrap_err("failed to launch engine")?;
    if let Some(total) = opts.provision {
        handler
            .engine()
            .provision(total)
            .wrap_err("failed to provision inventory")?;
    }

    let server = tiny_http::Server::http((opts.host.as_str(), opts.port))
        .map_err(|err| eyre!("cannot listen on {}:{}: {err}", opts.host, opts.port))?;
    let server = Arc::new(server);
    info!(host = %opts.host, port = opts.port, threads = opts.handler_threads, "listening");

    let stopping = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(server.clone(), opts.handler_threads, stopping.clone());
    serve(&server, &handler, opts.handler_threads, &stopping)?;

    handler.shutdown();
    Ok(())
}
