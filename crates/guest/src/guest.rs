//! Guest side of the corundum boundary.
//!
//! A guest crate compiled for `wasm32-unknown-unknown` exports its text transformation with
//!
//! ```ignore
//! fn reverse(input: &str) -> String {
//!     input.chars().rev().collect()
//! }
//!
//! corundum_wasmer_guest::corundum_guest!(reverse);
//! ```
//!
//! which produces the `alloc`, `free` and `solve` exports the host binds against.

pub mod allocation;

pub use corundum_wasmer_common::packed::merge_u32;
pub use corundum_wasmer_common::GuestPtr;
pub use corundum_wasmer_common::Len;

/// run `f` over the utf-8 input at `ptr`/`len` and leak its output for the host to read
/// returns the output location as host-width pointer and length
///
/// the input stays owned by the host, which frees it after reading the output
///
/// # Safety
///
/// `ptr` and `len` must describe initialized memory that stays alive for the whole call.
pub unsafe fn solve_with<F>(ptr: *const u8, len: Len, f: F) -> (*mut u8, usize)
where
    F: FnOnce(&str) -> String,
{
    let input = std::slice::from_raw_parts(ptr, len as usize);
    let output = match std::str::from_utf8(input) {
        Ok(text) => f(text),
        // panics trap inside wasm
        Err(e) => panic!("solve input is not valid utf-8: {e}"),
    };
    allocation::leak_bytes(output.into_bytes())
}

/// export `alloc`, `free` and `solve` around a `fn(&str) -> String`
///
/// the exports only exist on wasm32 where pointers fit in a `GuestPtr`, a native build of a
/// guest crate (e.g. for its unit tests) gets nothing
#[macro_export]
macro_rules! corundum_guest {
    ( $solve:path ) => {
        #[cfg(target_arch = "wasm32")]
        #[no_mangle]
        pub extern "C" fn alloc(len: $crate::Len) -> $crate::GuestPtr {
            $crate::allocation::allocate(len) as usize as $crate::GuestPtr
        }

        #[cfg(target_arch = "wasm32")]
        #[no_mangle]
        pub unsafe extern "C" fn free(ptr: $crate::GuestPtr, len: $crate::Len) {
            $crate::allocation::deallocate(ptr as usize as *mut u8, len)
        }

        #[cfg(target_arch = "wasm32")]
        #[no_mangle]
        pub unsafe extern "C" fn solve(ptr: $crate::GuestPtr, len: $crate::Len) -> u64 {
            let (out_ptr, out_len) = $crate::solve_with(ptr as usize as *const u8, len, $solve);
            $crate::merge_u32(out_ptr as usize as $crate::GuestPtr, out_len as $crate::Len)
        }
    };
}
