use corundum_wasmer_common::GuestPtr;
use serde::Deserialize;
use serde::Serialize;

/// one hundred giga ops
pub const WASM_METERING_LIMIT: u64 = 100_000_000_000;

/// How the host binds against a guest module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    /// name of the exported linear memory
    pub memory_export: String,
    /// name of the `(len: u32) -> u32` allocator export
    pub alloc_export: String,
    /// name of the `(ptr: u32, len: u32)` release export
    pub free_export: String,
    /// name of the `(ptr: u32, len: u32) -> u64` computation export
    pub solve_export: String,
    /// address `alloc` returns when it cannot reserve a non-empty region
    pub alloc_failure_sentinel: GuestPtr,
    /// operator budget for a single request, `None` disables metering
    /// exhausting the budget traps the guest
    pub metering_limit: Option<u64>,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            memory_export: "memory".into(),
            alloc_export: "alloc".into(),
            free_export: "free".into(),
            solve_export: "solve".into(),
            alloc_failure_sentinel: 0,
            metering_limit: Some(WASM_METERING_LIMIT),
        }
    }
}

impl GuestConfig {
    pub fn with_metering_limit(mut self, metering_limit: Option<u64>) -> Self {
        self.metering_limit = metering_limit;
        self
    }

    pub fn with_alloc_failure_sentinel(mut self, sentinel: GuestPtr) -> Self {
        self.alloc_failure_sentinel = sentinel;
        self
    }
}
