/// A byte buffer that holds a mutable or immutable byte slice.
#[derive(Debug)]
pub enum Buffer<'a> {
    Immutable(&'a [u8]),
    Mutable(&'a mut [u8]),
}

impl Buffer<'_> {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Immutable(packet) => packet,
            Buffer::Mutable(packet) => packet,
        }
    }

    /// Panics if called on a view over an immutable buffer.
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        match self {
            Buffer::Immutable(_) => panic!("write operation called on readonly buffer"),
            Buffer::Mutable(packet) => packet,
        }
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    pub fn write(&mut self, offset: usize, val: u8) {
        self.as_slice_mut()[offset] = val;
    }

    /// Get N bytes starting at `offset`.
    pub fn get_bytes<const N: usize>(&self, offset: usize) -> [u8; N] {
        core::array::from_fn(|i| self.read(offset + i))
    }

    pub fn set_bytes<const N: usize>(&mut self, offset: usize, bytes: [u8; N]) {
        self.as_slice_mut()[offset..offset + N].copy_from_slice(&bytes);
    }

    /// Copy `vals` into the buffer starting at `offset`, truncating to fit.
    pub fn copy_from(&mut self, offset: usize, vals: &[u8]) {
        let slice = self.as_slice_mut();
        let end = slice.len().min(offset + vals.len());
        if offset < end {
            slice[offset..end].copy_from_slice(&vals[..end - offset]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutable_buffer() {
        let mut buf = [0_u8; 6];
        let mut buffer = Buffer::Mutable(&mut buf);
        buffer.set_bytes(1, [0xab, 0xcd]);
        buffer.write(0, 7);
        assert_eq!([7, 0xab, 0xcd], buffer.get_bytes(0));
        buffer.copy_from(4, &[1, 2, 3, 4]);
        assert_eq!(&[7, 0xab, 0xcd, 0, 1, 2], buffer.as_slice());
    }

    #[test]
    fn test_copy_from_out_of_range() {
        let mut buf = [0_u8; 2];
        let mut buffer = Buffer::Mutable(&mut buf);
        buffer.copy_from(5, &[1, 2]);
        assert_eq!(&[0, 0], buffer.as_slice());
    }

    #[test]
    #[should_panic(expected = "write operation called on readonly buffer")]
    fn test_immutable_buffer_cannot_write() {
        let buf = [0_u8; 4];
        let mut buffer = Buffer::Immutable(&buf);
        buffer.write(0, 1);
    }
}
