use crate::GuestPtr;
use crate::Len;
use serde::Deserialize;
use serde::Serialize;

/// GuestBuffer is an offset/length pair describing a region of guest linear memory
///
/// the offset always represents a position in wasm linear memory _never_ on the host
/// the length always represents u8 bytes _not_ items
///
/// the host never validates a GuestBuffer on construction, the guest is trusted to hand out
/// regions inside its own memory, but every read and write through a GuestBuffer is checked
/// against the current size of the memory
///
/// a GuestBuffer is only a description, it does not own anything, the invoker tracks ownership
/// separately so that each region is released exactly once
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestBuffer {
    ptr: GuestPtr,
    len: Len,
}

impl GuestBuffer {
    pub fn new(ptr: GuestPtr, len: Len) -> Self {
        Self { ptr, len }
    }

    pub fn ptr(&self) -> GuestPtr {
        self.ptr
    }

    pub fn len(&self) -> Len {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// one past the last byte of the region
    /// computed in u64 so a region touching the top of the address space does not overflow
    pub fn end(&self) -> u64 {
        u64::from(self.ptr) + u64::from(self.len)
    }

    /// true if every byte of the region lies below `size`
    pub fn fits_within(&self, size: u64) -> bool {
        self.end() <= size
    }
}

impl std::fmt::Display for GuestBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.ptr, self.len)
    }
}
