mod handler;
mod pump;

pub use handler::{run_connection, ws_handler};
pub use pump::{read_pump, write_pump, PumpConfig, PumpExit};
