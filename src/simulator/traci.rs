//! Minimal TraCI client: only the command subset the control loop consumes.
//!
//! The wire format is the TraCI framing: every TCP message starts with a
//! 4-byte big-endian length (covering itself), followed by commands that
//! carry a 1-byte length (or a 0 marker plus a 4-byte extended length), the
//! command id, and the payload. Every command is answered by a status
//! command first; value responses follow the status.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::shared_data::SignalPhase;

use super::session::{SessionError, SimulatorSession};

// Command identifiers.
const CMD_GET_VERSION: u8 = 0x00;
const CMD_SIM_STEP: u8 = 0x02;
const CMD_CLOSE: u8 = 0x7f;
const CMD_GET_TL_VARIABLE: u8 = 0xa2;
const CMD_SET_TL_VARIABLE: u8 = 0xc2;
const CMD_GET_EDGE_VARIABLE: u8 = 0xaa;
const CMD_GET_SIM_VARIABLE: u8 = 0xab;

// Variable identifiers.
const VAR_LAST_STEP_VEHICLE_NUMBER: u8 = 0x10;
const VAR_LAST_STEP_HALTING_NUMBER: u8 = 0x14;
const VAR_TL_PHASE_INDEX: u8 = 0x22;
const VAR_TL_CURRENT_PHASE: u8 = 0x28;
const VAR_TIME: u8 = 0x66;

// Wire type identifiers.
const TYPE_INTEGER: u8 = 0x09;
const TYPE_DOUBLE: u8 = 0x0b;

const RTYPE_OK: u8 = 0x00;

// A get response echoes the get command id shifted into the response range.
const RESPONSE_OFFSET: u8 = 0x10;

const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How to start the simulator process for one run.
#[derive(Debug, Clone)]
pub struct SumoLaunch {
    pub binary: String,
    pub scenario: String,
    pub tripinfo_output: String,
    pub port: u16,
}

/// A live TraCI connection plus the simulator process behind it.
pub struct TraciSession {
    stream: TcpStream,
    child: Child,
    closed: bool,
}

impl TraciSession {
    /// Spawns the simulator configured for trip-output logging and connects
    /// to its remote-control port, retrying while the process boots.
    pub fn start(launch: &SumoLaunch) -> Result<Self, SessionError> {
        let mut child = Command::new(&launch.binary)
            .arg("-c")
            .arg(&launch.scenario)
            .arg("--tripinfo-output")
            .arg(&launch.tripinfo_output)
            .arg("--remote-port")
            .arg(launch.port.to_string())
            .arg("--start")
            .arg("--quit-on-end")
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| SessionError::Launch(format!("{}: {}", launch.binary, e)))?;

        let stream = match connect_with_retry(launch.port) {
            Ok(stream) => stream,
            Err(e) => {
                // The process is useless without a connection; reap it.
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        let mut session = Self {
            stream,
            child,
            closed: false,
        };
        session.handshake()?;
        Ok(session)
    }

    fn handshake(&mut self) -> Result<(), SessionError> {
        let mut reader = self.exchange(CMD_GET_VERSION, &[])?;
        let response = reader.read_command_header()?;
        if response != CMD_GET_VERSION {
            return Err(SessionError::Protocol(format!(
                "version response carried command {:#04x}",
                response
            )));
        }
        let api = reader.read_i32()?;
        let version = reader.read_string()?;
        log::info!("connected to {} (TraCI api {})", version, api);
        Ok(())
    }

    /// Sends one command and reads the full response message, verifying the
    /// leading status. The returned reader is positioned at the first value
    /// response.
    fn exchange(&mut self, cmd: u8, payload: &[u8]) -> Result<MessageReader, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let body = encode_command(cmd, payload);
        let mut message = Vec::with_capacity(body.len() + 4);
        message.extend_from_slice(&((body.len() as i32 + 4).to_be_bytes()));
        message.extend_from_slice(&body);
        self.stream.write_all(&message)?;

        let mut length = [0u8; 4];
        self.stream.read_exact(&mut length)?;
        let total = i32::from_be_bytes(length);
        if total < 4 {
            return Err(SessionError::Protocol(format!(
                "message length {} underflows its own prefix",
                total
            )));
        }
        let mut data = vec![0u8; total as usize - 4];
        self.stream.read_exact(&mut data)?;

        let mut reader = MessageReader::new(data);
        reader.expect_status(cmd)?;
        Ok(reader)
    }

    fn get_int(&mut self, cmd: u8, var: u8, object_id: &str) -> Result<i32, SessionError> {
        let mut reader = self.get_variable(cmd, var, object_id)?;
        reader.expect_type(TYPE_INTEGER)?;
        reader.read_i32()
    }

    fn get_double(&mut self, cmd: u8, var: u8, object_id: &str) -> Result<f64, SessionError> {
        let mut reader = self.get_variable(cmd, var, object_id)?;
        reader.expect_type(TYPE_DOUBLE)?;
        reader.read_f64()
    }

    /// Issues a get-variable command and positions the reader at the typed
    /// value, after verifying the response echoes the request.
    fn get_variable(
        &mut self,
        cmd: u8,
        var: u8,
        object_id: &str,
    ) -> Result<MessageReader, SessionError> {
        let mut payload = vec![var];
        put_string(&mut payload, object_id);
        let mut reader = self.exchange(cmd, &payload)?;

        let response = reader.read_command_header()?;
        if response != cmd.wrapping_add(RESPONSE_OFFSET) {
            return Err(SessionError::Protocol(format!(
                "get {:#04x} answered by {:#04x}",
                cmd, response
            )));
        }
        let echoed_var = reader.read_u8()?;
        let echoed_id = reader.read_string()?;
        if echoed_var != var || echoed_id != object_id {
            return Err(SessionError::Protocol(format!(
                "response for variable {:#04x} of '{}', requested {:#04x} of '{}'",
                echoed_var, echoed_id, var, object_id
            )));
        }
        Ok(reader)
    }
}

impl SimulatorSession for TraciSession {
    fn simulated_time(&mut self) -> Result<f64, SessionError> {
        self.get_double(CMD_GET_SIM_VARIABLE, VAR_TIME, "")
    }

    fn current_phase(&mut self, tls_id: &str) -> Result<SignalPhase, SessionError> {
        let index = self.get_int(CMD_GET_TL_VARIABLE, VAR_TL_CURRENT_PHASE, tls_id)?;
        SignalPhase::from_index(index).ok_or(SessionError::UnknownPhase(index))
    }

    fn set_phase(&mut self, tls_id: &str, phase: SignalPhase) -> Result<(), SessionError> {
        let mut payload = vec![VAR_TL_PHASE_INDEX];
        put_string(&mut payload, tls_id);
        payload.push(TYPE_INTEGER);
        payload.extend_from_slice(&phase.index().to_be_bytes());
        self.exchange(CMD_SET_TL_VARIABLE, &payload)?;
        Ok(())
    }

    fn halting_count(&mut self, edge_id: &str) -> Result<u32, SessionError> {
        let count = self.get_int(CMD_GET_EDGE_VARIABLE, VAR_LAST_STEP_HALTING_NUMBER, edge_id)?;
        Ok(count.max(0) as u32)
    }

    fn vehicle_count(&mut self, edge_id: &str) -> Result<u32, SessionError> {
        let count = self.get_int(CMD_GET_EDGE_VARIABLE, VAR_LAST_STEP_VEHICLE_NUMBER, edge_id)?;
        Ok(count.max(0) as u32)
    }

    fn advance_step(&mut self) -> Result<(), SessionError> {
        // A zero target time advances exactly one step. The payload is a
        // raw double, not a typed value.
        let mut reader = self.exchange(CMD_SIM_STEP, &0f64.to_be_bytes())?;
        // Ignore subscription results; this client never subscribes.
        let _subscription_count = reader.read_i32()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        let result = self.exchange(CMD_CLOSE, &[]).map(|_| ());
        self.closed = true;
        if result.is_err() {
            // The simulator never got the shutdown command; don't wait on it.
            let _ = self.child.kill();
        }
        // Wait for the process so the trip output is fully flushed.
        if let Err(e) = self.child.wait() {
            log::warn!("failed to reap simulator process: {}", e);
        }
        result
    }
}

impl Drop for TraciSession {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::warn!("failed to close simulator session: {}", e);
            }
        }
    }
}

fn connect_with_retry(port: u16) -> Result<TcpStream, SessionError> {
    for _ in 0..CONNECT_ATTEMPTS {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(_) => thread::sleep(CONNECT_RETRY_DELAY),
        }
    }
    Err(SessionError::Launch(format!(
        "simulator did not open port {} in time",
        port
    )))
}

/// Frames one command: short form when the length fits a byte, extended
/// form (0 marker plus 4-byte length) otherwise.
fn encode_command(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let short_len = payload.len() + 2;
    let mut out = Vec::with_capacity(short_len + 4);
    if short_len <= u8::MAX as usize {
        out.push(short_len as u8);
    } else {
        out.push(0);
        out.extend_from_slice(&((short_len as i32 + 4).to_be_bytes()));
    }
    out.push(cmd);
    out.extend_from_slice(payload);
    out
}

/// TraCI strings are a 4-byte length followed by raw bytes.
fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as i32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// Cursor over one response message.
struct MessageReader {
    data: Vec<u8>,
    pos: usize,
}

impl MessageReader {
    fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&[u8], SessionError> {
        if self.pos + len > self.data.len() {
            return Err(SessionError::Protocol(format!(
                "response truncated at byte {} of {}",
                self.pos,
                self.data.len()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, SessionError> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> Result<i32, SessionError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f64(&mut self) -> Result<f64, SessionError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_be_bytes(raw))
    }

    fn read_string(&mut self) -> Result<String, SessionError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(SessionError::Protocol(format!(
                "negative string length {}",
                len
            )));
        }
        let bytes = self.take(len as usize)?.to_vec();
        String::from_utf8(bytes)
            .map_err(|e| SessionError::Protocol(format!("string is not utf-8: {}", e)))
    }

    /// Reads a command header (short or extended length form) and returns
    /// the command id.
    fn read_command_header(&mut self) -> Result<u8, SessionError> {
        let len = self.read_u8()?;
        if len == 0 {
            let _extended = self.read_i32()?;
        }
        self.read_u8()
    }

    /// Verifies the status command that answers `cmd`.
    fn expect_status(&mut self, cmd: u8) -> Result<(), SessionError> {
        let response = self.read_command_header()?;
        if response != cmd {
            return Err(SessionError::Protocol(format!(
                "status for {:#04x}, expected {:#04x}",
                response, cmd
            )));
        }
        let result = self.read_u8()?;
        let description = self.read_string()?;
        if result != RTYPE_OK {
            return Err(SessionError::Rejected {
                command: cmd,
                description,
            });
        }
        Ok(())
    }

    fn expect_type(&mut self, expected: u8) -> Result<(), SessionError> {
        let value_type = self.read_u8()?;
        if value_type != expected {
            return Err(SessionError::Protocol(format!(
                "value type {:#04x}, expected {:#04x}",
                value_type, expected
            )));
        }
        Ok(())
    }
}
