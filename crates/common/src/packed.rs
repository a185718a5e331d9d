use crate::wasm_error;
use crate::GuestBuffer;
use crate::GuestPtr;
use crate::Len;
use crate::WasmError;
use crate::WasmErrorInner;
use crate::WASM32_ADDRESS_SPACE;
use serde::Deserialize;
use serde::Serialize;

/// number of bits the address is shifted left by in a packed value
pub const ADDRESS_SHIFT: u32 = 32;
/// mask selecting the length half of a packed value
pub const LENGTH_MASK: u64 = 0xFFFF_FFFF;

/// PackedResult is the single u64 the guest `solve` export returns to describe its output
///
/// bit layout:
///
/// ```text
/// 63                              32 31                               0
/// +---------------------------------+---------------------------------+
/// |         address (u32)           |          length (u32)           |
/// +---------------------------------+---------------------------------+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedResult(u64);

impl PackedResult {
    /// packs an address and length that may have been computed in wider integers
    /// each half must fit in 32 bits or the host and guest disagree about the protocol
    pub fn pack(address: u64, length: u64) -> Result<Self, WasmError> {
        let ptr = GuestPtr::try_from(address).map_err(|_| {
            wasm_error!(WasmErrorInner::Protocol(format!(
                "address {address} does not fit in 32 bits"
            )))
        })?;
        let len = Len::try_from(length).map_err(|_| {
            wasm_error!(WasmErrorInner::Protocol(format!(
                "length {length} does not fit in 32 bits"
            )))
        })?;
        Ok(Self(merge_u32(ptr, len)))
    }

    /// splits the packed value back into the output buffer it describes
    /// fails if the described region runs past the end of the wasm32 address space, which no
    /// well behaved guest can ever produce
    pub fn unpack(self) -> Result<GuestBuffer, WasmError> {
        let (ptr, len) = split_u64(self.0);
        let buffer = GuestBuffer::new(ptr, len);
        if buffer.fits_within(WASM32_ADDRESS_SPACE) {
            Ok(buffer)
        } else {
            Err(wasm_error!(WasmErrorInner::Protocol(format!(
                "packed result {:#018x} describes {buffer} which ends past the wasm32 address space",
                self.0
            ))))
        }
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PackedResult {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<PackedResult> for u64 {
    fn from(packed: PackedResult) -> Self {
        packed.0
    }
}

impl From<GuestBuffer> for PackedResult {
    fn from(buffer: GuestBuffer) -> Self {
        Self(merge_u32(buffer.ptr(), buffer.len()))
    }
}

/// the only place the address and length are combined into a single u64
pub fn merge_u32(ptr: GuestPtr, len: Len) -> u64 {
    (u64::from(ptr) << ADDRESS_SHIFT) | u64::from(len)
}

/// the only place a single u64 is split back into address and length
/// truncation is the point here, each half is exactly 32 bits wide
pub fn split_u64(packed: u64) -> (GuestPtr, Len) {
    ((packed >> ADDRESS_SHIFT) as GuestPtr, (packed & LENGTH_MASK) as Len)
}
