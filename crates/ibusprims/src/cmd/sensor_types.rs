use ibusprims_frame::SensorType;

use crate::cmd::SensorTypesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_sensor_types, OutputFormat};

pub fn run(_args: SensorTypesArgs, format: OutputFormat) -> CliResult<i32> {
    let types: Vec<SensorType> = SensorType::all().collect();
    print_sensor_types(&types, format);
    Ok(SUCCESS)
}
