use crate::abi::GuestAbi;
use crate::lease::Leases;
use corundum_wasmer_common::marshal;
use corundum_wasmer_common::wasm_error;
use corundum_wasmer_common::AllocationFailure;
use corundum_wasmer_common::GuestBuffer;
use corundum_wasmer_common::GuestPtr;
use corundum_wasmer_common::WasmError;
use corundum_wasmer_common::WasmErrorInner;
use std::time::Duration;
use std::time::Instant;

/// Where the last request got to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestState {
    Idle,
    Allocating,
    Encoding,
    Invoking,
    Decoding,
    Releasing,
    Done,
    Failed,
}

/// Decoded guest output and the wall clock time of the whole request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub output: String,
    pub elapsed: Duration,
}

impl Submission {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Runs requests against one guest, one at a time.
///
/// Every request is: allocate the input in the guest, write it, call solve, read the output back,
/// free both buffers. Buffers are freed on success and on every recoverable error. A guest trap
/// is not recoverable: nothing more is asked of the guest for that request, the input buffer is
/// abandoned and every later request fails with `Poisoned`.
pub struct Invoker<G> {
    guest: G,
    alloc_failure_sentinel: GuestPtr,
    state: RequestState,
    poisoned: bool,
}

impl<G: GuestAbi> Invoker<G> {
    pub fn new(guest: G, alloc_failure_sentinel: GuestPtr) -> Self {
        Self {
            guest,
            alloc_failure_sentinel,
            state: RequestState::Idle,
            poisoned: false,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn guest(&self) -> &G {
        &self.guest
    }

    pub fn guest_mut(&mut self) -> &mut G {
        &mut self.guest
    }

    pub fn into_guest(self) -> G {
        self.guest
    }

    /// run one request end to end
    pub fn submit(&mut self, input: &str) -> Result<Submission, WasmError> {
        if self.poisoned {
            return Err(wasm_error!(WasmErrorInner::Poisoned));
        }
        self.state = RequestState::Idle;
        let start = Instant::now();
        let result = self.request(input);
        let elapsed = start.elapsed();
        match result {
            Ok(output) => {
                self.transition(RequestState::Done);
                tracing::debug!(
                    input_len = input.len(),
                    output_len = output.len(),
                    ?elapsed,
                    "guest request done"
                );
                Ok(Submission { output, elapsed })
            }
            Err(e) => {
                if e.error.is_trap() {
                    self.poisoned = true;
                    tracing::error!(error = %e, "guest trapped, poisoning invoker");
                } else {
                    tracing::debug!(error = %e, ?elapsed, "guest request failed");
                }
                self.transition(RequestState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: RequestState) {
        tracing::trace!(from = ?self.state, to = ?next, "request state");
        self.state = next;
    }

    fn request(&mut self, input: &str) -> Result<String, WasmError> {
        self.transition(RequestState::Allocating);
        self.guest.prepare();
        let len = marshal::encoded_len(input)?;
        let ptr = self.guest.alloc(len).map_err(|trap| {
            wasm_error!(WasmErrorInner::Allocation {
                len,
                cause: AllocationFailure::Trap(trap.0),
            })
        })?;
        // an empty region may legitimately sit at the sentinel address
        if len > 0 && ptr == self.alloc_failure_sentinel {
            return Err(wasm_error!(WasmErrorInner::Allocation {
                len,
                cause: AllocationFailure::OutOfMemory,
            }));
        }
        let input_buffer = GuestBuffer::new(ptr, len);
        let mut leases = Leases::default();
        leases.push(input_buffer);

        self.transition(RequestState::Encoding);
        let encoded = marshal::encode_into(&mut self.guest.memory(), ptr, input);
        if let Err(e) = encoded {
            return self.release(leases, Err(e));
        }

        self.transition(RequestState::Invoking);
        let packed = match self.guest.solve(input_buffer) {
            Ok(packed) => packed,
            Err(trap) => {
                leases.abandon();
                return Err(wasm_error!(WasmErrorInner::GuestTrap(trap.0)));
            }
        };

        self.transition(RequestState::Decoding);
        let outcome = match packed.unpack() {
            Ok(output_buffer) => {
                leases.push(output_buffer);
                marshal::decode_from(
                    &self.guest.memory(),
                    output_buffer.ptr(),
                    output_buffer.len(),
                )
            }
            // no usable descriptor means no output buffer was received, only the input is ours
            Err(e) => Err(e),
        };
        self.release(leases, outcome)
    }

    fn release(
        &mut self,
        leases: Leases,
        outcome: Result<String, WasmError>,
    ) -> Result<String, WasmError> {
        self.transition(RequestState::Releasing);
        match leases.release(&mut self.guest) {
            Ok(()) => outcome,
            Err(trap) => {
                let trap = wasm_error!(WasmErrorInner::GuestTrap(trap.0));
                match outcome {
                    Ok(_) => Err(trap),
                    Err(e) => {
                        // the original failure is what the caller needs to see
                        self.poisoned = true;
                        tracing::error!(error = %trap, "guest trapped while releasing after a failed request");
                        Err(e)
                    }
                }
            }
        }
    }
}
