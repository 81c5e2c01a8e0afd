//! Message content framing for the DATA phase (RFC 5321 section 4.5.2).

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the start of a line.
    LineStart,
    /// Inside a line.
    Text,
    /// Just wrote a CR that may start a CRLF.
    SawCr,
}

/// Frame `message` for transmission after a 354 reply.
///
/// Bare LF becomes CRLF, a `.` starting a line is doubled, and the result
/// ends with `\r\n.\r\n` (the line break is only added when the message
/// does not already end with one).
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 5);
    let mut state = State::LineStart;

    for &byte in message {
        match byte {
            b'\n' => {
                if state != State::SawCr {
                    out.push(b'\r');
                }
                out.push(b'\n');
                state = State::LineStart;
            }
            b'\r' => {
                out.push(b'\r');
                state = State::SawCr;
            }
            b'.' if state == State::LineStart => {
                out.extend_from_slice(b"..");
                state = State::Text;
            }
            _ => {
                out.push(byte);
                state = State::Text;
            }
        }
    }

    if state != State::LineStart {
        if state == State::SawCr {
            out.push(b'\n');
        } else {
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b".\r\n");

    out
}
