//! Bit-level output for JPEG entropy-coded segments.

/// A bit writer that packs bits MSB first and applies JPEG byte stuffing.
#[derive(Debug)]
pub struct BitWriterMsb {
    buffer: Vec<u8>,
    current_byte: u8,
    bit_position: u8, // Counts from 8 down to 0
}

impl BitWriterMsb {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            current_byte: 0,
            bit_position: 8,
        }
    }

    /// Write the low `num_bits` bits of `value`, most significant first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, num_bits: u8) {
        debug_assert!(num_bits <= 32);

        let mut remaining = num_bits;
        while remaining > 0 {
            let to_write = remaining.min(self.bit_position);
            let shift = remaining - to_write;
            let mask = (1u32 << to_write) - 1;
            let bits = ((value >> shift) & mask) as u8;

            self.bit_position -= to_write;
            self.current_byte |= bits << self.bit_position;
            remaining -= to_write;

            if self.bit_position == 0 {
                self.push_stuffed(self.current_byte);
                self.current_byte = 0;
                self.bit_position = 8;
            }
        }
    }

    #[inline]
    fn push_stuffed(&mut self, byte: u8) {
        self.buffer.push(byte);
        // A literal 0xFF in scan data must be followed by 0x00
        if byte == 0xFF {
            self.buffer.push(0x00);
        }
    }

    /// Pads the partial byte with 1s.
    pub fn flush(&mut self) {
        if self.bit_position < 8 {
            let padded = self.current_byte | ((1u8 << self.bit_position) - 1);
            self.push_stuffed(padded);
            self.current_byte = 0;
            self.bit_position = 8;
        }
    }

    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.bit_position == 8
    }
}

impl Default for BitWriterMsb {
    fn default() -> Self {
        Self::new()
    }
}
