mod connection_state;
mod driver_type;
mod listener;
mod printer_driver;

pub use connection_state::ConnectionState;
pub use driver_type::DriverType;
pub use listener::{DriverEvent, DriverListener};
pub use printer_driver::{DeviceScanner, PrinterDriver};
