use crate::GuestBuffer;
use crate::Len;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// How the guest allocator refused a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationFailure {
    /// `alloc` returned the configured failure sentinel for a non-empty request.
    OutOfMemory,
    /// `alloc` itself trapped.
    Trap(String),
}

impl std::fmt::Display for AllocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Trap(trap) => write!(f, "trapped: {trap}"),
        }
    }
}

/// Enum of all possible ERROR states that crossing the host/guest boundary can produce.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[rustfmt::skip]
pub enum WasmErrorInner {
    /// the guest could not reserve memory for the input
    /// no further guest calls are made and nothing is released
    #[error("guest allocation of {len} bytes failed: {cause}")]
    Allocation { len: Len, cause: AllocationFailure },
    /// the input could not be represented in guest memory
    /// utf-8 encoding is total so in practice this only happens for inputs too large for the
    /// wasm32 address space or for a reservation that lies outside the guest memory
    #[error("input could not be encoded into guest memory: {0}")]
    Encoding(String),
    /// the guest returned bytes that are not valid utf-8
    /// the bytes are never lossily converted, a replacement character would silently corrupt the
    /// guest's result
    #[error("guest output at {buffer} is not valid utf-8 after {valid_up_to} bytes")]
    Decoding { buffer: GuestBuffer, valid_up_to: usize },
    /// guest execution faulted
    /// the guest's internal state is undefined afterwards so nothing more is asked of it
    #[error("guest trapped: {0}")]
    GuestTrap(String),
    /// host and guest disagree about the shape of a value crossing the boundary
    /// e.g. a packed result describing a region outside the guest memory
    #[error("host/guest protocol mismatch: {0}")]
    Protocol(String),
    /// an earlier request trapped so the guest instance can no longer be trusted
    #[error("guest instance is poisoned by an earlier trap")]
    Poisoned,
    /// another request is already in flight against this guest instance
    #[error("a request is already in flight against this guest instance")]
    Busy,
    /// the guest module does not export something the host binds against
    #[error("guest export error: {0}")]
    Export(String),
    /// the guest module could not be instantiated
    #[error("guest instantiation failed: {0}")]
    Instantiate(String),
    /// the guest module could not be built from the given bytes
    #[error("guest module build failed: {0}")]
    ModuleBuild(String),
}

/// Coarse, distinguishable outcome for callers that do not care about error details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    Allocation,
    Encoding,
    Decoding,
    GuestTrap,
    Protocol,
    Poisoned,
    Busy,
    Setup,
}

impl WasmErrorInner {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Decoding { .. } => ErrorKind::Decoding,
            Self::GuestTrap(_) => ErrorKind::GuestTrap,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Poisoned => ErrorKind::Poisoned,
            Self::Busy => ErrorKind::Busy,
            Self::Export(_) | Self::Instantiate(_) | Self::ModuleBuild(_) => ErrorKind::Setup,
        }
    }

    /// true for every failure that leaves the guest in an undefined state
    pub fn is_trap(&self) -> bool {
        matches!(
            self,
            Self::GuestTrap(_)
                | Self::Allocation {
                    cause: AllocationFailure::Trap(_),
                    ..
                }
        )
    }
}

/// Wraps a WasmErrorInner with a file and line number.
/// The easiest way to generate this is with the `wasm_error!` macro that will
/// insert the correct file/line.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub struct WasmError {
    pub file: String,
    pub line: u32,
    pub error: WasmErrorInner,
}

impl std::fmt::Display for WasmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}:{})", self.error, self.file, self.line)
    }
}

impl WasmError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

#[macro_export]
macro_rules! wasm_error {
    ($e:expr) => {
        $crate::WasmError {
            // On Windows the `file!()` macro returns a path with inconsistent formatting:
            // from the workspace to the package root it uses backwards-slashes,
            // then within the package it uses forwards-slashes.
            // To remedy this we normalize the formatting here.
            file: file!().replace('\\', "/").to_string(),
            line: line!(),
            error: $e.into(),
        }
    };
}
