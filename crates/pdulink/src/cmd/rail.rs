use pdulink_link::Connection;
use tracing::info;

use crate::cmd::RailArgs;
use crate::exit::{link_error, CliError, CliResult, SUCCESS};
use crate::output::{print_command, rail_label, OutputFormat};

pub fn run(args: RailArgs, format: OutputFormat) -> CliResult<i32> {
    // Reject bad input before touching the port.
    let rail = pdulink_schema::check_rail(args.rail).map_err(|err| CliError::usage(err.to_string()))?;
    let config = args.link.to_config()?;

    let connection = Connection::open_with_config(&args.link.port, &config)
        .map_err(|err| link_error("open failed", err))?;
    let port = connection.name().to_string();

    let command = connection
        .commands()
        .send_command(rail, args.state.is_on())
        .map_err(|err| link_error("send failed", err))?;
    info!(port = %port, rail, label = rail_label(rail), on = command.state(), "rail command sent");

    print_command(&command, &port, format);
    connection.close();
    Ok(SUCCESS)
}
