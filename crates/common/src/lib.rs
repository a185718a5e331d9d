pub mod buffer;
pub mod marshal;
pub mod memory;
pub mod packed;
pub mod result;

pub use buffer::GuestBuffer;
pub use memory::LinearMemory;
pub use packed::PackedResult;
pub use result::*;

/// something like usize for wasm
/// wasm32 has a memory limit of 4GB so offsets and lengths fit in u32
///
/// the host reads and writes directly to the guest's memory so we need a predictable number of
/// bytes to represent offsets and lengths, independent of the host's `usize`
pub type WasmSize = u32;

pub type Len = WasmSize;
pub type GuestPtr = WasmSize;

/// size of the full wasm32 address space in bytes
/// no guest region may end beyond this
pub const WASM32_ADDRESS_SPACE: u64 = 1 << 32;
