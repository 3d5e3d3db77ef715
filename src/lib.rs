pub use clock::{Clock, MonotonicClock};
pub use error::{LatencyError, LatencyResult};
pub use interface::{BaudRate, ChannelOpener, EchoChannel};
pub use probe::{BytePattern, LatencyProbe, ProbeConfig};
pub use report::{ConsoleReporter, DisplayUnit, Reporter};
pub use stats::{Measurement, RateResult, SweepResult, ideal_ns};
pub use sweep::{SweepController, SweepObserver};

pub mod clock;
pub mod constants;
pub mod error;
pub mod interface;
pub mod probe;
pub mod report;
pub mod stats;
pub mod sweep;
pub(crate) mod util;
