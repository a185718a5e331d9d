use crate::GuestBuffer;
use crate::GuestPtr;
use crate::Len;

/// Out of bounds access to a linear memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutOfBounds {
    pub buffer: GuestBuffer,
    pub size: u64,
}

impl std::fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is outside of linear memory of {} bytes",
            self.buffer, self.size
        )
    }
}

/// A byte addressable view of guest linear memory.
///
/// Implementations are views taken for the duration of a single marshaling step. Any guest call
/// can grow the memory and invalidate a view, so a view must never be held across a guest call.
pub trait LinearMemory {
    /// current size of the memory in bytes
    fn size(&self) -> u64;

    /// fill `buf` with the bytes starting at `ptr`
    /// must not touch `buf` if any part of the range is out of bounds
    fn read(&self, ptr: GuestPtr, buf: &mut [u8]) -> Result<(), OutOfBounds>;

    /// copy `bytes` into memory starting at `ptr`
    /// must not write anything if any part of the range is out of bounds
    fn write(&mut self, ptr: GuestPtr, bytes: &[u8]) -> Result<(), OutOfBounds>;
}

/// bounds check shared by implementations
/// the length of a host slice is only trusted once it fits the wasm32 address space
pub fn checked_range(ptr: GuestPtr, len: usize, size: u64) -> Result<GuestBuffer, OutOfBounds> {
    match Len::try_from(len) {
        Ok(len) if GuestBuffer::new(ptr, len).fits_within(size) => Ok(GuestBuffer::new(ptr, len)),
        _ => Err(OutOfBounds {
            buffer: GuestBuffer::new(ptr, Len::try_from(len).unwrap_or(Len::MAX)),
            size,
        }),
    }
}

impl<M: LinearMemory + ?Sized> LinearMemory for &mut M {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read(&self, ptr: GuestPtr, buf: &mut [u8]) -> Result<(), OutOfBounds> {
        (**self).read(ptr, buf)
    }

    fn write(&mut self, ptr: GuestPtr, bytes: &[u8]) -> Result<(), OutOfBounds> {
        (**self).write(ptr, bytes)
    }
}

/// a fixed size memory held entirely on the host
impl LinearMemory for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read(&self, ptr: GuestPtr, buf: &mut [u8]) -> Result<(), OutOfBounds> {
        let buffer = checked_range(ptr, buf.len(), self.size())?;
        buf.copy_from_slice(&self[buffer.ptr() as usize..buffer.end() as usize]);
        Ok(())
    }

    fn write(&mut self, ptr: GuestPtr, bytes: &[u8]) -> Result<(), OutOfBounds> {
        let buffer = checked_range(ptr, bytes.len(), self.size())?;
        self[buffer.ptr() as usize..buffer.end() as usize].copy_from_slice(bytes);
        Ok(())
    }
}
