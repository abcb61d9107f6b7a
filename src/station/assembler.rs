/// Frame assembly and checksum validation for the console's HID report stream
use log::{debug, error, warn};

/// Two consecutive payload bytes of this value mark a frame boundary.
pub const SYNC_BYTE: u8 = 0xFF;

/// The console never sends a frame longer than this.
pub const FRAME_CAPACITY: usize = 20;

/// Frame length by sensor-type byte. Fixed protocol constants, the length
/// includes the trailing two-byte checksum.
pub fn expected_frame_len(sensor_code: u8) -> Option<usize> {
    match sensor_code {
        0x41 => Some(17), // rain
        0x42 => Some(12), // temperature / humidity
        0x46 => Some(8),  // pressure
        0x47 => Some(6),  // uv
        0x48 => Some(11), // wind
        0x60 => Some(12), // status
        _ => None,
    }
}

/// Verify the trailing little-endian 16-bit checksum against the wrapping
/// sum of all preceding bytes.
pub fn verify_checksum(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let declared = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
    let sum = frame[..frame.len() - 2]
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    sum == declared
}

/// Reassembles complete sensor frames from raw HID reports.
///
/// The console delivers data as tiny chunks, usually one byte per report,
/// where the first report byte says how many payload bytes follow. A frame
/// starts after two consecutive sync bytes; its length is known once the
/// sensor-type byte (frame byte 1) has arrived. The link is lossy, so every
/// failure path resets the state and resumes hunting for a sync sequence.
pub struct FrameAssembler {
    buf: [u8; FRAME_CAPACITY],
    len: usize,
    syncs_seen: u8,
    /// 0 until the sensor-type byte has been seen.
    expected: usize,
    checksum_failures: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        FrameAssembler {
            buf: [0; FRAME_CAPACITY],
            len: 0,
            syncs_seen: 0,
            expected: 0,
            checksum_failures: 0,
        }
    }

    /// Consume one raw HID report: `data[0]` is the number of valid payload
    /// bytes, `data[1..]` the payload. Returns a complete, checksum-verified
    /// frame when this report finishes one.
    ///
    /// Malformed reports are dropped without touching any state; the stream
    /// must keep resynchronizing no matter what the device sends.
    pub fn handle_report(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        if data.len() < 2 {
            error!("Dropping malformed HID report: {:02X?}", data);
            return None;
        }
        let count = data[0] as usize;
        if count > data.len() - 1 {
            error!(
                "Dropping HID report declaring {} bytes but carrying {}",
                count,
                data.len() - 1
            );
            return None;
        }

        if self.syncs_seen == 2 {
            // In sync: accumulate payload bytes until the frame is complete.
            for &byte in &data[1..1 + count] {
                if let Some(frame) = self.push_byte(byte) {
                    return Some(frame);
                }
                if self.syncs_seen != 2 {
                    // push_byte trashed the frame; the rest of this report
                    // belongs to it and is dropped with it.
                    break;
                }
            }
        } else if self.syncs_seen == 1 && data[1] != SYNC_BYTE {
            // False start, a lone sync byte inside ordinary data.
            self.syncs_seen = 0;
        } else if data[1] == SYNC_BYTE {
            self.syncs_seen += 1;
        }

        None
    }

    /// Checksum mismatches seen since start-up, for diagnostics.
    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures
    }

    fn push_byte(&mut self, byte: u8) -> Option<Vec<u8>> {
        if self.len == FRAME_CAPACITY {
            warn!("Frame buffer overflow, resynchronizing");
            self.reset();
            return None;
        }
        self.buf[self.len] = byte;
        self.len += 1;

        if self.expected == 0 && self.len > 2 {
            match expected_frame_len(self.buf[1]) {
                Some(len) => self.expected = len,
                None => {
                    warn!("Got an unknown sensor code: 0x{:02x}", self.buf[1]);
                    self.reset();
                    return None;
                }
            }
        }

        if self.expected != 0 && self.len == self.expected {
            let frame = self.buf[..self.len].to_vec();
            self.reset();
            if verify_checksum(&frame) {
                debug!(
                    "Assembled {} byte frame for sensor 0x{:02x}",
                    frame.len(),
                    frame[1]
                );
                return Some(frame);
            }
            self.checksum_failures += 1;
            debug!(
                "Checksum mismatch on sensor 0x{:02x} frame, {} so far",
                frame[1], self.checksum_failures
            );
        }

        None
    }

    fn reset(&mut self) {
        self.len = 0;
        self.syncs_seen = 0;
        self.expected = 0;
    }
}
