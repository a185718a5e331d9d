use crate::abi::GuestAbi;
use crate::abi::GuestTrap;
use corundum_wasmer_common::GuestBuffer;

/// The guest buffers the host currently owns for one request.
///
/// A buffer enters when the guest hands it over (from `alloc` or a `solve` result) and leaves
/// through exactly one of:
///
/// - `release`, which frees every buffer once in the order they were acquired
/// - `abandon`, the trap path, which frees nothing because the guest can no longer be trusted
///
/// Both consume the leases so nothing can be released twice.
#[derive(Debug, Default)]
pub struct Leases {
    buffers: Vec<GuestBuffer>,
}

impl Leases {
    pub fn push(&mut self, buffer: GuestBuffer) {
        self.buffers.push(buffer);
    }

    /// free every leased buffer
    /// stops at the first trap, the guest is in an undefined state after it
    pub fn release<G: GuestAbi + ?Sized>(mut self, guest: &mut G) -> Result<(), GuestTrap> {
        let buffers = std::mem::take(&mut self.buffers);
        for (i, buffer) in buffers.iter().enumerate() {
            if let Err(trap) = guest.free(*buffer) {
                let abandoned = &buffers[i + 1..];
                tracing::error!(
                    %buffer,
                    %trap,
                    ?abandoned,
                    "guest trapped while releasing a buffer"
                );
                return Err(trap);
            }
            tracing::trace!(%buffer, "released guest buffer");
        }
        Ok(())
    }

    /// give up on every leased buffer without touching the guest
    pub fn abandon(mut self) -> Vec<GuestBuffer> {
        let buffers = std::mem::take(&mut self.buffers);
        if !buffers.is_empty() {
            tracing::warn!(abandoned = ?buffers, "abandoning guest buffers after a trap");
        }
        buffers
    }
}

impl Drop for Leases {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            tracing::warn!(leaked = ?self.buffers, "guest buffers dropped without release");
        }
    }
}
