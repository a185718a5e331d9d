use corundum_wasmer_common::Len;
use std::mem;

/// allocate a length of bytes that won't be dropped by the allocator
/// return the pointer to it so the host can write bytes into the allocation
///
/// returns null if the allocator cannot reserve `len` bytes, the host treats address 0 as the
/// out of memory sentinel for any non-empty request
pub fn allocate(len: Len) -> *mut u8 {
    let mut dummy: Vec<u8> = Vec::new();
    if dummy.try_reserve_exact(len as usize).is_err() {
        return std::ptr::null_mut();
    }
    let mut dummy = mem::ManuallyDrop::new(dummy);
    dummy.as_mut_ptr()
}

/// restore an allocation so that it is dropped immediately
/// this needs to be called on anything allocated above, or leaked by `leak_bytes`, as the
/// allocator will never free the memory otherwise
///
/// # Safety
///
/// `ptr` and `len` must describe exactly one live allocation from `allocate` or `leak_bytes`
/// that has not been deallocated yet.
pub unsafe fn deallocate(ptr: *mut u8, len: Len) {
    let _: Vec<u8> = Vec::from_raw_parts(ptr, 0, len as usize);
}

/// leak `bytes` so that they outlive the guest call that produced them
/// the capacity is shrunk to the length so that `deallocate(ptr, len)` restores the exact layout
pub fn leak_bytes(bytes: Vec<u8>) -> (*mut u8, usize) {
    let boxed = mem::ManuallyDrop::new(bytes.into_boxed_slice());
    (boxed.as_ptr() as *mut u8, boxed.len())
}
