pub mod macros;
pub mod metrics;
pub mod time;
pub mod trip;

pub use metrics::*;
pub use time::*;
pub use trip::*;
