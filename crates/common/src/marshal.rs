//! Conversion between host text and guest byte ranges.
//!
//! Nothing here owns guest memory. Every function takes a view that the caller derived right
//! before the call and drops right after it.

use crate::memory::LinearMemory;
use crate::wasm_error;
use crate::GuestBuffer;
use crate::GuestPtr;
use crate::Len;
use crate::WasmError;
use crate::WasmErrorInner;

/// length in bytes of the utf-8 encoding of `text`, as the guest sees it
pub fn encoded_len(text: &str) -> Result<Len, WasmError> {
    Len::try_from(text.len()).map_err(|_| {
        wasm_error!(WasmErrorInner::Encoding(format!(
            "{} bytes of utf-8 do not fit in the wasm32 address space",
            text.len()
        )))
    })
}

/// write the utf-8 bytes of `text` into `memory` at `ptr`
///
/// the caller must already have reserved at least `encoded_len(text)` bytes at `ptr`
/// returns the number of bytes written
pub fn encode_into<M: LinearMemory + ?Sized>(
    memory: &mut M,
    ptr: GuestPtr,
    text: &str,
) -> Result<Len, WasmError> {
    let len = encoded_len(text)?;
    if len > 0 {
        memory
            .write(ptr, text.as_bytes())
            .map_err(|e| wasm_error!(WasmErrorInner::Encoding(e.to_string())))?;
    }
    Ok(len)
}

/// read exactly `len` bytes at `ptr` out of `memory` and decode them as utf-8
///
/// a range outside the memory is a protocol error, the guest handed out a region it does not
/// have, and is never truncated to fit
pub fn decode_from<M: LinearMemory + ?Sized>(
    memory: &M,
    ptr: GuestPtr,
    len: Len,
) -> Result<String, WasmError> {
    let buffer = GuestBuffer::new(ptr, len);
    if !buffer.fits_within(memory.size()) {
        return Err(wasm_error!(WasmErrorInner::Protocol(format!(
            "guest output {buffer} runs past the end of linear memory ({} bytes)",
            memory.size()
        ))));
    }
    let mut bytes = vec![0_u8; len as usize];
    memory
        .read(ptr, &mut bytes)
        .map_err(|e| wasm_error!(WasmErrorInner::Protocol(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| {
        wasm_error!(WasmErrorInner::Decoding {
            buffer,
            valid_up_to: e.utf8_error().valid_up_to(),
        })
    })
}
