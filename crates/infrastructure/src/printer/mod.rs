pub mod escpos;
pub mod file_printer;
pub mod network_printer;
pub mod simulated_printer;

pub use escpos::EscPosBuilder;
pub use file_printer::FilePrinter;
pub use network_printer::NetworkPrinter;
pub use simulated_printer::SimulatedPrinter;
