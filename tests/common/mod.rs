#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serial_latency::{BaudRate, ChannelOpener, Clock, EchoChannel, LatencyError, LatencyResult};

/// Clock that only moves when a fake channel says so
#[derive(Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn advance(&self, ns: u64) {
        self.now.set(self.now.get() + ns);
    }
}

impl Clock for FakeClock {
    fn now_ns(&self) -> u64 {
        self.now.get()
    }
}

/// How the far end answers one sample
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Correct echo after this many nanoseconds
    Echo(u64),
    /// Wrong byte after this many nanoseconds
    Corrupt(u64),
    /// Nothing; the whole timeout elapses
    Silent,
    /// The read itself fails
    Broken,
}

/// `(baud, open attempt, sample index) -> Reply`
pub type Script = Rc<dyn Fn(BaudRate, usize, usize) -> Reply>;

pub struct ScriptedChannel {
    clock: FakeClock,
    script: Script,
    baud: BaudRate,
    attempt: usize,
    stale: Vec<u8>,
    sent: Vec<u8>,
}

impl EchoChannel for ScriptedChannel {
    fn drain(&mut self) -> LatencyResult<usize> {
        let pending = self.stale.len();
        self.stale.clear();
        Ok(pending)
    }

    fn send_byte(&mut self, byte: u8) -> LatencyResult<()> {
        self.sent.push(byte);
        Ok(())
    }

    fn receive_byte(&mut self, timeout: Duration) -> LatencyResult<Option<u8>> {
        if !self.stale.is_empty() {
            return Ok(Some(self.stale.remove(0)));
        }

        let Some(&last) = self.sent.last() else {
            self.clock.advance(timeout.as_nanos() as u64);
            return Ok(None);
        };
        let index = self.sent.len() - 1;

        match (self.script)(self.baud, self.attempt, index) {
            Reply::Echo(ns) => {
                self.clock.advance(ns);
                Ok(Some(last))
            }
            Reply::Corrupt(ns) => {
                self.clock.advance(ns);
                Ok(Some(!last))
            }
            Reply::Silent => {
                self.clock.advance(timeout.as_nanos() as u64);
                Ok(None)
            }
            Reply::Broken => Err(LatencyError::Communication("device went away".to_string())),
        }
    }
}

pub struct ScriptedOpener {
    pub clock: FakeClock,
    pub script: Script,
    pub refused: Vec<BaudRate>,
    pub stale: Vec<u8>,
    pub opened: Rc<RefCell<Vec<BaudRate>>>,
}

impl ScriptedOpener {
    pub fn new(clock: FakeClock, script: Script) -> Self {
        ScriptedOpener {
            clock,
            script,
            refused: Vec::new(),
            stale: Vec::new(),
            opened: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ChannelOpener for ScriptedOpener {
    type Channel = ScriptedChannel;

    fn open(&mut self, baud: BaudRate) -> LatencyResult<ScriptedChannel> {
        if self.refused.contains(&baud) {
            return Err(LatencyError::Communication(format!(
                "{} baud not supported",
                baud
            )));
        }

        let attempt = self.opened.borrow().iter().filter(|&&b| b == baud).count();
        self.opened.borrow_mut().push(baud);

        Ok(ScriptedChannel {
            clock: self.clock.clone(),
            script: Rc::clone(&self.script),
            baud,
            attempt,
            stale: self.stale.clone(),
            sent: Vec::new(),
        })
    }
}

/// Perfect loopback: every echo arrives one frame time plus `overhead_ns` later
pub fn loopback(overhead_ns: u64) -> Script {
    Rc::new(move |baud: BaudRate, _: usize, _: usize| {
        Reply::Echo(serial_latency::ideal_ns(baud).unwrap() + overhead_ns)
    })
}
