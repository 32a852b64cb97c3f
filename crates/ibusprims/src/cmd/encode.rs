use ibusprims_frame::{FrameError, Response};

use crate::cmd::{parse_command, parse_hex, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let command = parse_command(&args.command)?;
    let payload = match &args.payload {
        Some(hex) => parse_hex("--payload", hex)?,
        None => Vec::new(),
    };

    let response = Response::new(command, args.address, payload);
    let wire = response
        .to_bytes()
        .map_err(|err| frame_error("encode failed", FrameError::from(err)))?;

    print_encoded(&response, &wire, format);
    Ok(SUCCESS)
}
