use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{LatencyError, LatencyResult};
use crate::interface::{BaudRate, ChannelOpener, EchoChannel};
use crate::probe::LatencyProbe;
use crate::stats::{RateResult, SweepResult, ideal_ns};

/// Receives results as the sweep produces them
pub trait SweepObserver {
    /// Called before the port is opened at `baud`
    fn rate_started(&mut self, _baud: BaudRate, _ideal_ns: u64) -> LatencyResult<()> {
        Ok(())
    }

    /// Called after every recorded sample of a supported rate
    fn sample_recorded(&mut self, _baud: BaudRate, _index: usize) {}

    /// Called once per requested rate, supported or not
    fn rate_finished(&mut self, result: &RateResult) -> LatencyResult<()>;
}

impl SweepObserver for () {
    fn rate_finished(&mut self, _result: &RateResult) -> LatencyResult<()> {
        Ok(())
    }
}

/// Runs the probe at each baud rate in turn, one rate at a time
pub struct SweepController<O, C> {
    opener: O,
    probe: LatencyProbe<C>,
}

impl<O: ChannelOpener, C: Clock> SweepController<O, C> {
    pub fn new(opener: O, probe: LatencyProbe<C>) -> Self {
        SweepController { opener, probe }
    }

    pub fn probe(&self) -> &LatencyProbe<C> {
        &self.probe
    }

    /// Test every rate in `baud_rates`, in the given order.
    /// A rate that cannot be opened is recorded as unsupported; a repeated
    /// rate keeps the result of its last run.
    pub fn run(
        &mut self,
        baud_rates: &[BaudRate],
        observer: &mut dyn SweepObserver,
    ) -> LatencyResult<SweepResult> {
        if baud_rates.is_empty() {
            return Err(LatencyError::Configuration("No baud rates to test".to_string()));
        }
        for &baud in baud_rates {
            ideal_ns(baud)?;
        }

        info!(
            "Testing {} baud rate(s), {} samples each",
            baud_rates.len(),
            self.probe.config().sample_count()
        );

        let mut results = SweepResult::new();
        for &baud in baud_rates {
            let result = self.test_rate(baud, observer)?;
            observer.rate_finished(&result)?;
            results.insert(baud, result);
        }

        Ok(results)
    }

    fn test_rate(
        &mut self,
        baud: BaudRate,
        observer: &mut dyn SweepObserver,
    ) -> LatencyResult<RateResult> {
        let ideal_ns = ideal_ns(baud)?;
        observer.rate_started(baud, ideal_ns)?;

        let mut channel = match self.opener.open(baud) {
            Ok(channel) => channel,
            Err(e) => {
                warn!("{} baud unsupported: {}", baud, e);
                return Ok(RateResult::unsupported(baud, ideal_ns));
            }
        };

        // Leftovers from the previous rate would be read as the first echo
        match channel.drain() {
            Ok(0) => {}
            Ok(stale) => debug!("Discarded {} stale byte(s) at {} baud", stale, baud),
            Err(e) => {
                warn!("{} baud unsupported, could not clear buffers: {}", baud, e);
                return Ok(RateResult::unsupported(baud, ideal_ns));
            }
        }

        let result = self.probe.run_with_progress(&mut channel, baud, &mut |index| {
            observer.sample_recorded(baud, index)
        })?;

        drop(channel);
        debug!("Closed port after {} baud", baud);
        Ok(result)
    }
}
