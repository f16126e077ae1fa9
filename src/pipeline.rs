// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Fetch, format and send, with the port released on every path

use log::{error, info};
use thiserror::Error;
use crate::frame::{self, Frame};
use crate::serial::{Connection, PortOpener, SerialConfig, TransportError};
use crate::source::{FetchError, RecordSource};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no text to send")]
    EmptyInput,

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Format a record for display without sending it.
pub fn preview(raw: &str) -> Result<Frame, PipelineError> {
    if raw.trim().is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    let frame = frame::format(raw);
    info!("Formatted frame: {}", frame);
    Ok(frame)
}

/// Open, write one frame, close. The connection is closed whether or not the write succeeds.
pub fn send_frame<O: PortOpener + ?Sized>(
    opener: &O,
    frame: &Frame,
    config: &SerialConfig,
) -> Result<(), TransportError> {
    let mut conn = Connection::open_with(opener, config)?;
    let result = conn.send(frame);
    conn.close();
    result
}

/// Format `raw` and send it to the configured port. Returns the frame that went out.
pub fn send_formatted_frame<O: PortOpener + ?Sized>(
    opener: &O,
    raw: &str,
    config: &SerialConfig,
) -> Result<Frame, PipelineError> {
    let frame = preview(raw)?;
    if let Err(e) = send_frame(opener, &frame, config) {
        error!("Serial port {} error: {}", config.port_name, e);
        return Err(e.into());
    }
    Ok(frame)
}

/// Pull a record from `source` and send it. Nothing is opened if the fetch fails.
pub fn fetch_and_send<S: RecordSource + ?Sized, O: PortOpener + ?Sized>(
    source: &mut S,
    opener: &O,
    config: &SerialConfig,
) -> Result<Frame, PipelineError> {
    let raw = source.fetch().inspect_err(|e| error!("Fetch error: {}", e))?;
    send_formatted_frame(opener, &raw, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DateToken;
    use crate::serial::MockPorts;
    use crate::source::ReaderSource;

    struct FailingSource;

    impl RecordSource for FailingSource {
        fn fetch(&mut self) -> Result<String, FetchError> {
            Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "530 Login incorrect",
            )))
        }
    }

    fn expected_frame(middle: &str) -> String {
        format!("ROG|ID001|NAME|{}|{}|%%%", DateToken::today(), middle)
    }

    #[test]
    fn test_send_formatted_frame() {
        let expected = expected_frame("EXTRA");
        let ports = MockPorts::new(&["COM3"]).expect_writes(expected.as_bytes());

        let frame = send_formatted_frame(&ports, "ID001|NAME|EXTRA", &SerialConfig::new("COM3", 9600))
            .expect("send should succeed");

        assert_eq!(frame.as_str(), expected);
        assert!(!ports.is_held("COM3"));
    }

    #[test]
    fn test_empty_input_opens_nothing() {
        let ports = MockPorts::new(&["COM3"]);
        for raw in ["", "   \n"] {
            let err = send_formatted_frame(&ports, raw, &SerialConfig::new("COM3", 9600)).unwrap_err();
            assert!(matches!(err, PipelineError::EmptyInput));
        }
        assert_eq!(ports.open_count(), 0);
    }

    #[test]
    fn test_preview_empty() {
        assert!(matches!(preview(""), Err(PipelineError::EmptyInput)));
        assert_eq!(preview("ONLY").unwrap().as_str(), "ROG|ONLY|%%%");
    }

    #[test]
    fn test_transport_error_surfaces() {
        let ports = MockPorts::new(&["COM3"]);
        let err = send_formatted_frame(&ports, "A|B", &SerialConfig::new("COM9", 9600)).unwrap_err();

        match err {
            PipelineError::Transport(TransportError::PortUnavailable { port, .. }) => assert_eq!(port, "COM9"),
            other => panic!("Expected PortUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_write_releases_port() {
        let ports = MockPorts::new(&["COM3"]).fail_writes(std::io::ErrorKind::TimedOut);
        let config = SerialConfig::new("COM3", 9600);

        let err = send_formatted_frame(&ports, "A|B|C", &config).unwrap_err();
        assert!(matches!(err, PipelineError::Transport(TransportError::WriteFailed { .. })));
        assert!(!ports.is_held("COM3"));

        // A second attempt must reach the write again rather than failing to open
        let err = send_formatted_frame(&ports, "A|B|C", &config).unwrap_err();
        assert!(matches!(err, PipelineError::Transport(TransportError::WriteFailed { .. })));
        assert_eq!(ports.open_count(), 2);
    }

    #[test]
    fn test_invalid_baud_then_valid() {
        let ports = MockPorts::new(&["COM3"]).expect_writes(b"ROG|ONLY|%%%");

        let err = send_formatted_frame(&ports, "ONLY", &SerialConfig::new("COM3", 7)).unwrap_err();
        assert!(matches!(err, PipelineError::Transport(TransportError::InvalidParameter { .. })));

        send_formatted_frame(&ports, "ONLY", &SerialConfig::new("COM3", 9600)).expect("valid baud");
    }

    #[test]
    fn test_fetch_failure_skips_send() {
        let ports = MockPorts::new(&["COM3"]);
        let err = fetch_and_send(&mut FailingSource, &ports, &SerialConfig::new("COM3", 9600)).unwrap_err();

        assert!(matches!(err, PipelineError::Fetch(_)));
        assert!(err.to_string().contains("530 Login incorrect"));
        assert_eq!(ports.open_count(), 0);
    }

    #[test]
    fn test_fetch_and_send() {
        let expected = expected_frame("X");
        let ports = MockPorts::new(&["/dev/ttyUSB0"]).expect_writes(expected.as_bytes());
        let mut source = ReaderSource::new("\n ID001 | NAME | X \n".as_bytes());

        let frame = fetch_and_send(&mut source, &ports, &SerialConfig::new("/dev/ttyUSB0", 19200)).unwrap();
        assert_eq!(frame.as_str(), expected);
    }
}
