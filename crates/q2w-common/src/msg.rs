// msg.rs — byte-oriented message buffers for the server command stream
//
// All multi-byte values are little endian. Positions are three full floats;
// directions are packed as pitch and yaw, each quantised to a byte.

use crate::q_shared::{vectoangles_exact, angle_vectors, Vec3, PITCH, YAW};

/// Growable outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageWriter {
    data: Vec<u8>,
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { data: Vec::with_capacity(cap) }
    }

    pub fn write_byte(&mut self, c: i32) -> &mut Self {
        self.data.push(c as u8);
        self
    }

    pub fn write_short(&mut self, c: i32) -> &mut Self {
        self.data.extend_from_slice(&(c as i16).to_le_bytes());
        self
    }

    pub fn write_long(&mut self, c: i32) -> &mut Self {
        self.data.extend_from_slice(&c.to_le_bytes());
        self
    }

    pub fn write_float(&mut self, f: f32) -> &mut Self {
        self.data.extend_from_slice(&f.to_le_bytes());
        self
    }

    pub fn write_string(&mut self, s: &str) -> &mut Self {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self
    }

    pub fn write_position(&mut self, pos: &Vec3) -> &mut Self {
        for v in pos {
            self.write_float(*v);
        }
        self
    }

    pub fn write_dir(&mut self, dir: &Vec3) -> &mut Self {
        let (pitch, yaw) = pack_dir(dir);
        self.data.push(pitch);
        self.data.push(yaw);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Hand the buffered bytes off, leaving the writer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }
}

/// Quantise a unit direction to (pitch, yaw) bytes.
pub fn pack_dir(dir: &Vec3) -> (u8, u8) {
    if dir[0] == 0.0 && dir[1] == 0.0 && dir[2] == 0.0 {
        return (0, 0);
    }
    let angles = vectoangles_exact(dir);
    let pack = |a: f32| (((a * 256.0 / 360.0).round() as i32) & 255) as u8;
    (pack(angles[PITCH]), pack(angles[YAW]))
}

pub fn unpack_dir(pitch: u8, yaw: u8) -> Vec3 {
    let angles = [pitch as f32 * 360.0 / 256.0, yaw as f32 * 360.0 / 256.0, 0.0];
    let mut forward = [0.0; 3];
    angle_vectors(&angles, Some(&mut forward), None, None);
    forward
}

/// Cursor over a received message. Reads past the end yield `None`.
#[derive(Debug, Clone)]
pub struct MessageReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MessageReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn read_short(&mut self) -> Option<i16> {
        self.take(2).map(|b| i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_long(&mut self) -> Option<i32> {
        self.take(4).map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_float(&mut self) -> Option<f32> {
        self.take(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_string(&mut self) -> Option<String> {
        let rest = self.data.get(self.pos..)?;
        let len = rest.iter().position(|&b| b == 0)?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Some(s)
    }

    pub fn read_position(&mut self) -> Option<Vec3> {
        Some([self.read_float()?, self.read_float()?, self.read_float()?])
    }

    pub fn read_dir(&mut self) -> Option<Vec3> {
        let pitch = self.read_byte()?;
        let yaw = self.read_byte()?;
        Some(unpack_dir(pitch, yaw))
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
