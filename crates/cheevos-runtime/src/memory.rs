//! Emulated memory window exposed to trigger evaluation

/// Main RAM size (32 MiB)
pub const MAIN_RAM_SIZE: u32 = 0x0200_0000;

/// Scratchpad size (16 KiB), mapped directly after main RAM
pub const SCRATCHPAD_SIZE: u32 = 0x4000;

/// Bytes visible to trigger expressions
pub const EXPOSED_MEMORY_SIZE: u32 = MAIN_RAM_SIZE + SCRATCHPAD_SIZE;

/// Peek/poke by address.
///
/// Reads outside the exposed window return 0 and writes outside it are
/// ignored; neither may fault.
pub trait MemoryAccessor {
    /// Read a 1, 2 or 4 byte little-endian value
    fn peek(&self, address: u32, size: u32) -> u32;

    /// Write a 1, 2 or 4 byte little-endian value
    fn poke(&mut self, address: u32, size: u32, value: u32);
}

/// Bounds-checked view over a byte buffer
#[derive(Debug)]
pub struct MemoryWindow<B> {
    bytes: B,
    exposed: u32,
}

impl<B: AsRef<[u8]>> MemoryWindow<B> {
    /// Window over `bytes` limited to `EXPOSED_MEMORY_SIZE`
    pub fn new(bytes: B) -> Self {
        Self::with_exposed_size(bytes, EXPOSED_MEMORY_SIZE)
    }

    /// Window limited to `exposed` bytes (or the buffer length, if shorter)
    pub fn with_exposed_size(bytes: B, exposed: u32) -> Self {
        let len = u32::try_from(bytes.as_ref().len()).unwrap_or(u32::MAX);
        Self {
            bytes,
            exposed: exposed.min(len),
        }
    }

    pub fn exposed_size(&self) -> u32 {
        self.exposed
    }

    pub fn into_inner(self) -> B {
        self.bytes
    }

    fn range(&self, address: u32, size: u32) -> Option<std::ops::Range<usize>> {
        if !matches!(size, 1 | 2 | 4) {
            return None;
        }
        let end = address.checked_add(size)?;
        if end > self.exposed {
            return None;
        }
        Some(address as usize..end as usize)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> MemoryAccessor for MemoryWindow<B> {
    fn peek(&self, address: u32, size: u32) -> u32 {
        let Some(range) = self.range(address, size) else {
            return 0;
        };

        let mut value = [0u8; 4];
        value[..size as usize].copy_from_slice(&self.bytes.as_ref()[range]);
        u32::from_le_bytes(value)
    }

    fn poke(&mut self, address: u32, size: u32, value: u32) {
        let Some(range) = self.range(address, size) else {
            return;
        };

        let bytes = value.to_le_bytes();
        self.bytes.as_mut()[range].copy_from_slice(&bytes[..size as usize]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_sizes() {
        let window = MemoryWindow::new(vec![0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(window.peek(0, 1), 0x11);
        assert_eq!(window.peek(0, 2), 0x2211);
        assert_eq!(window.peek(1, 4), 0x5544_3322);
        assert_eq!(window.peek(0, 3), 0);
    }

    #[test]
    fn test_out_of_window_access() {
        let mut window = MemoryWindow::with_exposed_size(vec![0xAAu8; 16], 8);
        assert_eq!(window.exposed_size(), 8);
        assert_eq!(window.peek(7, 1), 0xAA);
        assert_eq!(window.peek(7, 2), 0);
        assert_eq!(window.peek(u32::MAX, 4), 0);

        window.poke(8, 1, 0x55);
        window.poke(u32::MAX - 1, 4, 0x55);
        assert_eq!(window.into_inner()[8], 0xAA);
    }

    #[test]
    fn test_poke_little_endian() {
        let mut ram = vec![0u8; 8];
        {
            let mut window = MemoryWindow::new(ram.as_mut_slice());
            window.poke(2, 4, 0xDEAD_BEEF);
            window.poke(0, 2, 0x1234_5678);
        }
        assert_eq!(ram, vec![0x78, 0x56, 0xEF, 0xBE, 0xAD, 0xDE, 0, 0]);
    }
}
