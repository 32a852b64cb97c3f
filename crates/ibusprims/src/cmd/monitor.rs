use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ibusprims_frame::{FrameConfig, FrameError, PacketReader};
use ibusprims_transport::{BusConfig, SerialBus};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, MonitorArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    // Listening only: nothing we send, so nothing to drain.
    let bus = BusConfig::new(&args.port)
        .with_baud_rate(args.baud)
        .with_timeout(timeout)
        .with_self_echo(false);

    let stream = SerialBus::open(&bus).map_err(|err| transport_error("open failed", err))?;
    let config = FrameConfig {
        timeout: Some(timeout),
        drain_self_echo: false,
    };
    let mut reader = PacketReader::with_config_bus(stream, config)
        .map_err(|err| frame_error("configure failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(port = %args.port.display(), baud = args.baud, "monitoring bus");

    let mut printed = 0usize;
    let mut last: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        let packet = match reader.read_packet() {
            Ok(packet) => packet,
            Err(FrameError::Truncated { .. }) => continue,
            Err(FrameError::InvalidLength(length)) => {
                warn!(length, "invalid frame length, resyncing");
                continue;
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        let now = Instant::now();
        let elapsed_ms = last.map(|prev| now.duration_since(prev).as_millis() as u64);
        last = Some(now);

        print_packet(&packet, elapsed_ms, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

