use ibusprims_frame::{decode_packet, FrameError};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex("frame", &args.hex)?;
    let packet = decode_packet(&bytes).map_err(|err| match err {
        // Offline input cannot time out; a short frame is just bad data.
        FrameError::Truncated { .. } => {
            CliError::new(DATA_INVALID, format!("decode failed: {err}"))
        }
        other => frame_error("decode failed", other),
    })?;

    print_packet(&packet, None, format);

    if packet.checksum_valid() {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}
