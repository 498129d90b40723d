mod address;
pub use address::ListenAddress;

mod constants;
pub use constants::{DEFAULT_HOST, DEFAULT_PORT};
