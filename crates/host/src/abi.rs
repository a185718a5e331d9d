use corundum_wasmer_common::GuestBuffer;
use corundum_wasmer_common::GuestPtr;
use corundum_wasmer_common::Len;
use corundum_wasmer_common::LinearMemory;
use corundum_wasmer_common::PackedResult;
use thiserror::Error;

/// Guest execution faulted. The message is whatever the runtime reported.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GuestTrap(pub String);

/// The three exports and the memory a guest module offers the host.
///
/// Each method is a single synchronous call into the guest. Any of them can grow linear memory,
/// which is why `memory` hands out a fresh view every time instead of one that is kept around.
pub trait GuestAbi {
    type Memory<'a>: LinearMemory
    where
        Self: 'a;

    /// called once at the start of every request before any guest call
    fn prepare(&mut self) {}

    /// reserve `len` bytes in guest memory
    fn alloc(&mut self, len: Len) -> Result<GuestPtr, GuestTrap>;

    /// release a region previously returned by `alloc` or described by a `solve` result
    fn free(&mut self, buffer: GuestBuffer) -> Result<(), GuestTrap>;

    /// run the guest computation over the utf-8 input in `input`
    fn solve(&mut self, input: GuestBuffer) -> Result<PackedResult, GuestTrap>;

    /// view of linear memory as it is right now
    fn memory(&mut self) -> Self::Memory<'_>;
}
