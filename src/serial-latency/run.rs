use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use serial_latency::{
    BaudRate, BytePattern, ConsoleReporter, DisplayUnit, LatencyProbe, MonotonicClock,
    ProbeConfig, Reporter, SweepController,
    constants::{DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_SAMPLE_COUNT, STANDARD_BAUD_RATES},
    error::{LatencyError, LatencyResult},
    ideal_ns,
    interface::serialport::{SerialPortOpener, describe_port},
};
use tracing::info;

/// Measure round-trip byte latency on a serial port with TX looped back to RX
#[derive(Parser, Debug, Clone)]
#[command(name = "serial-latency", version, long_about = None)]
pub(crate) struct SweepOptions {
    /// Serial port, e.g. COM1 or /dev/ttyS0
    #[clap(env = "SERIAL_LATENCY_PORT")]
    port: String,

    /// File receiving every sample in nanoseconds, one line per baud rate
    output: Option<PathBuf>,

    /// Comma separated baud rates. Defaults to the platform's standard rates
    #[clap(value_delimiter = ',')]
    baud_rates: Option<Vec<BaudRate>>,

    /// Round trips measured at each baud rate
    #[clap(short = 'n', long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    samples: usize,

    /// How long to wait for each echo, in milliseconds
    #[clap(short, long, default_value_t = DEFAULT_RESPONSE_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Send this byte every time instead of cycling through 0..=255
    #[clap(long, value_parser = parse_byte)]
    fixed_byte: Option<u8>,

    /// Time scale of the console table
    #[clap(short, long, value_enum, default_value_t = DisplayUnit::Microseconds)]
    unit: DisplayUnit,

    /// Show a progress bar while each baud rate runs
    #[clap(long, default_value_t = false)]
    progress: bool,
}

fn parse_byte(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|e| format!("{} is not a byte value: {}", value, e))
}

pub(crate) fn handle_sweep(opts: SweepOptions) -> LatencyResult<()> {
    let port = describe_port(&opts.port)?;
    println!(
        "{} ({})",
        port.name,
        port.description.as_deref().unwrap_or("no description")
    );
    println!(
        "Vendor: {}",
        port.manufacturer.as_deref().unwrap_or("unknown")
    );

    let output = opts
        .output
        .as_ref()
        .map(|path| {
            File::create(path).map_err(|e| {
                LatencyError::Configuration(format!(
                    "Unable to open file: {}, {}",
                    path.display(),
                    e
                ))
            })
        })
        .transpose()?;

    let baud_rates = opts
        .baud_rates
        .clone()
        .unwrap_or_else(|| STANDARD_BAUD_RATES.to_vec());
    for &baud in &baud_rates {
        ideal_ns(baud)?;
    }

    let pattern = opts.fixed_byte.map_or(BytePattern::Cycle, BytePattern::Fixed);
    let config = ProbeConfig::new(
        opts.samples,
        Duration::from_millis(opts.timeout_ms),
        pattern,
    )?;

    let opener = SerialPortOpener::new(port.name.clone(), config.response_timeout());
    let mut controller =
        SweepController::new(opener, LatencyProbe::new(MonotonicClock::new(), config));
    let reporter = Reporter::new(opts.unit);
    let show_progress = opts.progress;

    // The sweep owns its own thread and reports back exactly once
    let (done_tx, done_rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("sweep".to_string())
        .spawn(move || {
            let mut console =
                ConsoleReporter::new(reporter, std::io::stdout(), config.sample_count());
            console.progress_bar(show_progress);

            let outcome = console
                .print_header()
                .and_then(|_| controller.run(&baud_rates, &mut console));
            let _ = done_tx.send(outcome);
        })
        .map_err(|e| {
            LatencyError::Configuration(format!("Failed to start sweep thread: {}", e))
        })?;

    let outcome = done_rx.recv().map_err(|_| {
        LatencyError::Communication("Sweep thread exited without a result".to_string())
    })?;
    worker
        .join()
        .map_err(|_| LatencyError::Communication("Sweep thread panicked".to_string()))?;
    let results = outcome?;

    if let (Some(file), Some(path)) = (output, opts.output.as_ref()) {
        reporter.persist(&results, BufWriter::new(file))?;
        info!("Wrote samples to {}", path.display());
    }

    Ok(())
}
