//! Framelink demonstration binary.
//!
//! Builds telemetry messages from command-line arguments, frames them
//! into a byte buffer, and feeds the bytes back through the decode and
//! dispatch pipeline, logging what happens at each step.

use anyhow::Result;
use bytes::BytesMut;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use framelink_wire::{hex_dump, Frame, Handler, Message, RangeMsg, SampleMsg, WireError};

mod config;

use config::RuntimeConfig;

/// Framelink wire runtime demo
#[derive(Parser, Debug)]
#[command(name = "framelink", version, about = "Frame, decode, and dispatch telemetry messages")]
struct Args {
    /// Sample reading to send; omit for a null reading
    #[arg(long)]
    value: Option<f64>,

    /// Also send a range measurement, in metres
    #[arg(long)]
    range_meters: Option<f64>,

    /// Disable the CRC32 payload trailer
    #[arg(long)]
    no_checksum: bool,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Keeps the most recent sample; everything else is only counted.
#[derive(Default)]
struct Sink {
    last_sample: Option<SampleMsg>,
    ranges: usize,
    unrecognized: usize,
}

impl Sink {
    fn release(&mut self) -> Option<SampleMsg> {
        self.last_sample.take()
    }
}

impl Handler for Sink {
    fn handle_sample(&mut self, msg: SampleMsg) {
        info!(
            mode = ?msg.reading().mode(),
            value = msg.reading().value(),
            "sample received"
        );
        self.last_sample = Some(msg);
    }

    fn handle_range(&mut self, msg: RangeMsg) {
        info!(
            meters = msg.range().meters(),
            raw = msg.range().value(),
            "range received"
        );
        self.ranges += 1;
    }

    fn handle_unrecognized(&mut self, msg: &dyn Message) {
        warn!(id = msg.msg_id(), name = msg.name(), "unhandled message");
        self.unrecognized += 1;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = RuntimeConfig::load(args.config.as_deref())?;
    if args.no_checksum {
        config.checksum = false;
    }
    debug!(?config, "effective configuration");

    let frame = Frame::new()
        .with_max_frame_size(config.max_frame_size)
        .with_checksum(config.checksum);

    // Encode side: build the messages and frame them back to back.
    let mut sample = SampleMsg::new();
    if let Some(value) = args.value {
        sample.reading_mut().set_wide();
        if let Err(err) = sample.reading_mut().set_value(value) {
            warn!(%err, "reading not stored");
        }
    }

    let mut buf = BytesMut::new();
    frame.write_message(&sample, &mut buf)?;

    if let Some(meters) = args.range_meters {
        let mut range = RangeMsg::new();
        range.range_mut().set_meters(meters);
        frame.write_message(&range, &mut buf)?;
    }

    info!(len = buf.len(), bytes = %hex_dump(&buf), "wire buffer");

    // Decode side: one frame per call until the buffer runs dry.
    let mut sink = Sink::default();
    while !buf.is_empty() {
        match frame.process_input_data(&mut buf, &mut sink) {
            Ok(()) => {}
            Err(WireError::NotEnoughData) => {
                warn!(remaining = buf.len(), "incomplete trailing frame");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(last) = sink.release() {
        info!(
            equal = (last == sample),
            "decoded sample matches the original"
        );
    }

    Ok(())
}
