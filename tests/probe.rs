mod common;

use std::rc::Rc;
use std::time::Duration;

use common::{FakeClock, Reply, ScriptedOpener, loopback};
use serial_latency::{
    BaudRate, BytePattern, ChannelOpener, LatencyProbe, ProbeConfig, RateResult,
};

const TIMEOUT: Duration = Duration::from_millis(100);

fn probe_with(
    clock: &FakeClock,
    opener: &mut ScriptedOpener,
    baud: BaudRate,
    samples: usize,
) -> RateResult {
    let config = ProbeConfig::new(samples, TIMEOUT, BytePattern::Cycle).unwrap();
    let probe = LatencyProbe::new(clock.clone(), config);
    let mut channel = opener.open(baud).unwrap();
    probe.run(&mut channel, baud).unwrap()
}

#[test]
fn clean_loopback_has_no_flags() {
    let clock = FakeClock::default();
    let mut opener = ScriptedOpener::new(clock.clone(), loopback(2_000));

    let result = probe_with(&clock, &mut opener, 9600, 256);
    let m = result.measurement.as_ref().unwrap();

    assert!(!m.has_errors);
    assert!(!m.timed_out);
    assert_eq!(m.samples.len(), 256);
    assert!(m.samples.iter().all(|&s| s == 1_041_666 + 2_000));
    assert_eq!(m.min_ns, m.max_ns);
    assert_eq!(result.delta_ns(), Some(2_000));
}

#[test]
fn one_wrong_echo_sets_the_error_flag() {
    let clock = FakeClock::default();
    let script = Rc::new(|_: BaudRate, _: usize, index: usize| {
        if index == 17 {
            Reply::Corrupt(50_000)
        } else {
            Reply::Echo(50_000)
        }
    });
    let mut opener = ScriptedOpener::new(clock.clone(), script);

    let result = probe_with(&clock, &mut opener, 115200, 64);
    let m = result.measurement.unwrap();

    assert!(m.has_errors);
    assert!(!m.timed_out);
    assert!(m.samples.iter().all(|&s| s == 50_000));
}

#[test]
fn timeout_is_recorded_with_its_real_duration() {
    let clock = FakeClock::default();
    let script = Rc::new(|_: BaudRate, _: usize, index: usize| {
        if index == 3 {
            Reply::Silent
        } else {
            Reply::Echo(100_000)
        }
    });
    let mut opener = ScriptedOpener::new(clock.clone(), script);

    let result = probe_with(&clock, &mut opener, 115200, 10);
    let m = result.measurement.unwrap();

    assert!(m.timed_out);
    assert!(!m.has_errors);
    assert_eq!(m.samples.len(), 10);
    assert_eq!(m.samples[3], TIMEOUT.as_nanos() as u64);
    assert_eq!(m.max_ns, TIMEOUT.as_nanos() as u64);
    assert_eq!(m.min_ns, 100_000);
    assert_eq!(m.avg_ns, (9 * 100_000 + 100_000_000) / 10);
}

#[test]
fn silent_port_still_collects_every_sample() {
    let clock = FakeClock::default();
    let mut opener = ScriptedOpener::new(
        clock.clone(),
        Rc::new(|_: BaudRate, _: usize, _: usize| Reply::Silent),
    );

    let result = probe_with(&clock, &mut opener, 9600, 300);
    let m = result.measurement.unwrap();

    assert!(m.timed_out);
    assert_eq!(m.samples.len(), 300);
}

#[test]
fn transport_failures_count_as_errors() {
    let clock = FakeClock::default();
    let script = Rc::new(|_: BaudRate, _: usize, index: usize| {
        if index % 2 == 0 {
            Reply::Broken
        } else {
            Reply::Echo(10_000)
        }
    });
    let mut opener = ScriptedOpener::new(clock.clone(), script);

    let result = probe_with(&clock, &mut opener, 9600, 8);
    let m = result.measurement.unwrap();

    assert!(m.has_errors);
    assert_eq!(m.samples, vec![0, 10_000, 0, 10_000, 0, 10_000, 0, 10_000]);
    assert_eq!(m.avg_ns, 5_000);
}

#[test]
fn fixed_pattern_is_echoed_back() {
    let clock = FakeClock::default();
    let mut opener = ScriptedOpener::new(clock.clone(), loopback(0));
    let config = ProbeConfig::new(16, TIMEOUT, BytePattern::Fixed(0x0d)).unwrap();
    let probe = LatencyProbe::new(clock.clone(), config);

    let mut channel = opener.open(57600).unwrap();
    let result = probe.run(&mut channel, 57600).unwrap();

    assert!(!result.measurement.unwrap().has_errors);
}

#[test]
fn progress_callback_sees_every_index_in_order() {
    let clock = FakeClock::default();
    let mut opener = ScriptedOpener::new(clock.clone(), loopback(0));
    let config = ProbeConfig::new(5, TIMEOUT, BytePattern::Cycle).unwrap();
    let probe = LatencyProbe::new(clock.clone(), config);

    let mut seen = Vec::new();
    let mut channel = opener.open(9600).unwrap();
    probe
        .run_with_progress(&mut channel, 9600, &mut |index| seen.push(index))
        .unwrap();

    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}
