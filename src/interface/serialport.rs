use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPortType, StopBits};
use tracing::{debug, trace};

use super::{BaudRate, ChannelOpener, EchoChannel};
use crate::error::{LatencyError, LatencyResult};

pub type ComPort = String;

/// Serial port echo channel
pub struct SerialPortChannel {
    serial_port: Box<dyn serialport::SerialPort>,
    timeout: Duration,
}

impl SerialPortChannel {
    pub fn new(port: &str, baud: BaudRate, timeout: Duration) -> LatencyResult<SerialPortChannel> {
        let serial_port = serialport::new(port, baud)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| LatencyError::Communication(format!("{:?}", e)))?;

        debug!("Opened {} at {} baud", port, baud);
        Ok(SerialPortChannel {
            serial_port,
            timeout,
        })
    }
}

impl EchoChannel for SerialPortChannel {
    fn drain(&mut self) -> LatencyResult<usize> {
        let pending = self
            .serial_port
            .bytes_to_read()
            .map_err(|e| LatencyError::Communication(format!("{:?}", e)))?;
        self.serial_port.clear(ClearBuffer::All).map_err(|e| {
            LatencyError::Communication(format!("Failed to clear port buffers, {}", e))
        })?;

        Ok(pending as usize)
    }

    fn send_byte(&mut self, byte: u8) -> LatencyResult<()> {
        self.serial_port
            .write_all(&[byte])
            .map_err(|e| LatencyError::Communication(format!("{:?}", e)))?;
        trace!("Sent byte {:#04x}", byte);
        Ok(())
    }

    fn receive_byte(&mut self, timeout: Duration) -> LatencyResult<Option<u8>> {
        if timeout != self.timeout {
            self.serial_port
                .set_timeout(timeout)
                .map_err(|e| LatencyError::Communication(format!("{:?}", e)))?;
            self.timeout = timeout;
        }

        let mut buffer = [0u8; 1];
        let size = self
            .serial_port
            .read(&mut buffer)
            // Timeout error is fine, it is reported as "nothing arrived"
            .or_else(|e| {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    Ok(0)
                } else {
                    Err(e)
                }
            })
            .map_err(|e| LatencyError::Communication(format!("{:?}", e)))?;

        if size == 0 {
            return Ok(None);
        }
        trace!("Received byte {:#04x}", buffer[0]);
        Ok(Some(buffer[0]))
    }
}

/// Opens the same named port at whichever baud rate the sweep asks for
pub struct SerialPortOpener {
    port: ComPort,
    timeout: Duration,
}

impl SerialPortOpener {
    pub fn new(port: ComPort, timeout: Duration) -> Self {
        SerialPortOpener { port, timeout }
    }
}

impl ChannelOpener for SerialPortOpener {
    type Channel = SerialPortChannel;

    fn open(&mut self, baud: BaudRate) -> LatencyResult<SerialPortChannel> {
        SerialPortChannel::new(&self.port, baud, self.timeout)
    }
}

/// What the operating system knows about a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescription {
    pub name: ComPort,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
}

/// Look up `port` among the enumerated serial ports.
/// Ports that are not enumerated but exist as a device path (ptys, socat
/// loopbacks) are accepted without metadata.
pub fn describe_port(port: &str) -> LatencyResult<PortDescription> {
    let ports = serialport::available_ports().map_err(|e| {
        LatencyError::Configuration(format!("Could not get available ports. Err {:?}", e))
    })?;

    for info in ports {
        if info.port_name != port {
            continue;
        }
        let (description, manufacturer) = match info.port_type {
            SerialPortType::UsbPort(usb) => (usb.product, usb.manufacturer),
            SerialPortType::PciPort => (Some("PCI serial port".to_string()), None),
            SerialPortType::BluetoothPort => (Some("Bluetooth serial port".to_string()), None),
            SerialPortType::Unknown => (None, None),
        };
        return Ok(PortDescription {
            name: info.port_name,
            description,
            manufacturer,
        });
    }

    if Path::new(port).exists() {
        debug!("{} is not enumerated, using it as a raw device path", port);
        return Ok(PortDescription {
            name: port.to_string(),
            description: None,
            manufacturer: None,
        });
    }

    Err(LatencyError::Configuration(format!(
        "Unable to get <{}> port info",
        port
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_port_is_a_configuration_error() {
        let err = describe_port("/definitely/not/a/serial/port").unwrap_err();
        assert!(matches!(err, LatencyError::Configuration(_)));
    }
}
