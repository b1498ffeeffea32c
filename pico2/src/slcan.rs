//! Serial-line CAN (Lawicel SLCAN) codec.
//!
//! The bus adapter speaks ASCII over the UART. Commands and frames are
//! terminated by `\r`; the adapter answers a command with `\r` (accepted) or
//! BEL (refused).
//!
//! ```text
//! t36083E801F4000000000\r     standard frame: id 0x360, 8 bytes
//! T000003E880102030405060708\r extended frame: id 0x3E8, 8 bytes
//! ```
//!
//! Everything here is pure byte manipulation so it runs on the host.

use ecu_dash_common::config::CanSpeed;
use ecu_dash_common::frame::{MAX_DATA_LEN, MAX_EXTENDED_ID, MAX_STANDARD_ID, RawFrame};
use heapless::Vec;

/// Line terminator and positive acknowledgement.
pub const CR: u8 = b'\r';

/// Negative acknowledgement.
pub const BEL: u8 = 0x07;

/// Close the channel.
pub const CMD_CLOSE: &[u8] = b"C\r";

/// Open the channel in normal mode.
pub const CMD_OPEN: &[u8] = b"O\r";

/// Longest line: `T` + 8 id digits + DLC + 16 data digits.
pub const MAX_LINE_LEN: usize = 1 + 8 + 1 + MAX_DATA_LEN * 2;

/// Bit-rate command for a bus speed.
pub const fn speed_command(speed: CanSpeed) -> &'static [u8] {
    match speed {
        CanSpeed::Kbps125 => b"S4\r",
        CanSpeed::Kbps250 => b"S5\r",
        CanSpeed::Kbps500 => b"S6\r",
        CanSpeed::Mbps1 => b"S8\r",
    }
}

// =============================================================================
// Parsing
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParseError {
    Empty,
    /// Line does not start with a frame command.
    NotAFrame,
    BadHex,
    /// Line length disagrees with the DLC, or DLC above 8.
    BadLength,
    IdOutOfRange,
}

/// Something the adapter sent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Ack,
    Nack,
    Frame(RawFrame),
    /// A line that is not a data frame (remote frame, transmit ack, status
    /// reply) or that failed to parse.
    Other,
}

#[inline]
fn hex_digit(byte: u8) -> Result<u8, ParseError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(ParseError::BadHex),
    }
}

fn hex_value(digits: &[u8]) -> Result<u32, ParseError> {
    digits.iter().try_fold(0u32, |acc, &d| Ok((acc << 4) | u32::from(hex_digit(d)?)))
}

/// Parse one data-frame line (without the terminator).
pub fn parse_frame(line: &[u8]) -> Result<RawFrame, ParseError> {
    let (&kind, rest) = line.split_first().ok_or(ParseError::Empty)?;
    let (id_len, extended, max_id) = match kind {
        b't' => (3, false, MAX_STANDARD_ID),
        b'T' => (8, true, MAX_EXTENDED_ID),
        _ => return Err(ParseError::NotAFrame),
    };
    if rest.len() < id_len + 1 {
        return Err(ParseError::BadLength);
    }

    let id = hex_value(&rest[..id_len])?;
    if id > max_id {
        return Err(ParseError::IdOutOfRange);
    }
    let dlc = hex_digit(rest[id_len])?;
    let digits = &rest[id_len + 1..];
    if usize::from(dlc) > MAX_DATA_LEN || digits.len() != usize::from(dlc) * 2 {
        return Err(ParseError::BadLength);
    }

    let mut data = [0u8; MAX_DATA_LEN];
    for (slot, pair) in data.iter_mut().zip(digits.chunks_exact(2)) {
        *slot = (hex_digit(pair[0])? << 4) | hex_digit(pair[1])?;
    }
    Ok(RawFrame::from_parts(id, extended, dlc, data))
}

/// Encode a frame as an SLCAN line, terminator included.
pub fn encode_frame(frame: &RawFrame) -> Vec<u8, { MAX_LINE_LEN + 1 }> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut line = Vec::new();
    let (kind, id_len) = if frame.is_extended() { (b'T', 8) } else { (b't', 3) };

    // Capacity covers the longest line, so pushes cannot fail.
    let _ = line.push(kind);
    for shift in (0..id_len).rev() {
        let _ = line.push(HEX[((frame.id() >> (shift * 4)) & 0xF) as usize]);
    }
    let _ = line.push(HEX[usize::from(frame.dlc().min(MAX_DATA_LEN as u8))]);
    for byte in frame.data() {
        let _ = line.push(HEX[usize::from(byte >> 4)]);
        let _ = line.push(HEX[usize::from(byte & 0xF)]);
    }
    let _ = line.push(CR);
    line
}

// =============================================================================
// Line Assembly
// =============================================================================

/// Splits the adapter's byte stream into events.
#[derive(Default)]
pub struct LineAssembler {
    line: Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte. Returns an event when a line or acknowledgement ends.
    pub fn push(
        &mut self,
        byte: u8,
    ) -> Option<Event> {
        match byte {
            BEL => {
                self.reset();
                Some(Event::Nack)
            }
            CR => {
                let event = if self.overflowed {
                    Event::Other
                } else if self.line.is_empty() {
                    Event::Ack
                } else {
                    parse_frame(&self.line).map_or(Event::Other, Event::Frame)
                };
                self.reset();
                Some(event)
            }
            // Some adapters send CRLF.
            b'\n' => None,
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.line.clear();
        self.overflowed = false;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(
        assembler: &mut LineAssembler,
        bytes: &[u8],
    ) -> std::vec::Vec<Event> {
        bytes.iter().filter_map(|&b| assembler.push(b)).collect()
    }

    #[test]
    fn test_parse_standard_frame() {
        let frame = parse_frame(b"t36081C2003E801F40000").unwrap();
        assert_eq!(frame.id(), 0x360);
        assert!(!frame.is_extended());
        assert_eq!(frame.dlc(), 8);
        assert_eq!(frame.data(), &[0x1C, 0x20, 0x03, 0xE8, 0x01, 0xF4, 0x00, 0x00]);
    }

    #[test]
    fn test_parse_extended_and_short_frames() {
        let frame = parse_frame(b"T1FFFFFFF2abCD").unwrap();
        assert_eq!(frame.id(), 0x1FFF_FFFF);
        assert!(frame.is_extended());
        assert_eq!(frame.data(), &[0xAB, 0xCD]);

        let empty = parse_frame(b"t7FF0").unwrap();
        assert_eq!(empty.dlc(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_frame(b""), Err(ParseError::Empty));
        assert_eq!(parse_frame(b"r3600"), Err(ParseError::NotAFrame));
        assert_eq!(parse_frame(b"t36"), Err(ParseError::BadLength));
        assert_eq!(parse_frame(b"t3602AB"), Err(ParseError::BadLength));
        assert_eq!(parse_frame(b"t3609"), Err(ParseError::BadLength));
        assert_eq!(parse_frame(b"t36G0"), Err(ParseError::BadHex));
        assert_eq!(parse_frame(b"t8000"), Err(ParseError::IdOutOfRange));
        assert_eq!(parse_frame(b"T200000000"), Err(ParseError::IdOutOfRange));
    }

    #[test]
    fn test_encode_matches_parse() {
        let frame = RawFrame::new(0x3E8, &[0x0B, 0xB8, 0x01, 0x2C, 140, 75, 138, 150]).unwrap();
        let line = encode_frame(&frame);
        assert_eq!(&line[..], b"t3E880BB8012C8C4B8A96\r");
        assert_eq!(parse_frame(&line[..line.len() - 1]), Ok(frame));

        let ext = RawFrame::new_extended(0x18DA_F110, &[1, 2]).unwrap();
        assert_eq!(&encode_frame(&ext)[..], b"T18DAF11020102\r");
    }

    #[test]
    fn test_assembler_events() {
        let mut a = LineAssembler::new();
        let events = feed(&mut a, b"\r\x07t1230\r\nz\rt12");
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], Event::Ack);
        assert_eq!(events[1], Event::Nack);
        assert!(matches!(events[2], Event::Frame(f) if f.id() == 0x123 && f.dlc() == 0));
        assert_eq!(events[3], Event::Other);

        // Partial line completes on the next chunk.
        let events = feed(&mut a, b"30\r");
        assert!(matches!(events[..], [Event::Frame(f)] if f.id() == 0x123));
    }

    #[test]
    fn test_assembler_recovers_from_overflow() {
        let mut a = LineAssembler::new();
        let junk = [b'A'; MAX_LINE_LEN + 10];
        assert!(feed(&mut a, &junk).is_empty());
        assert_eq!(a.push(CR), Some(Event::Other));
        let events = feed(&mut a, b"t1000\r");
        assert!(matches!(events[..], [Event::Frame(_)]));
    }

    #[test]
    fn test_speed_commands() {
        assert_eq!(speed_command(CanSpeed::Kbps125), b"S4\r");
        assert_eq!(speed_command(CanSpeed::Mbps1), b"S8\r");
    }
}
