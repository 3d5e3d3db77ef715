pub const DEFAULT_SAMPLE_COUNT: usize = 5000;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_DISPLAY_DIVISOR: u64 = 1000;

/// Start bit, 8 data bits and one stop bit
pub const BITS_PER_FRAME: u64 = 10;
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

#[cfg(windows)]
pub const STANDARD_BAUD_RATES: &[u32] = &[
    110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 56000, 57600, 115200, 128000,
    256000,
];

#[cfg(target_os = "macos")]
pub const STANDARD_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 7200, 9600, 14400, 19200,
    28800, 38400, 57600, 76800, 115200, 230400,
];

#[cfg(not(any(windows, target_os = "macos")))]
pub const STANDARD_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000,
    3000000, 3500000, 4000000,
];
