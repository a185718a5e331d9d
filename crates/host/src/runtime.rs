use crate::config::GuestConfig;
use crate::guest::WasmerGuest;
use crate::invoker::Invoker;
use crate::invoker::Submission;
use crate::module::ModuleBuilder;
use corundum_wasmer_common::wasm_error;
use corundum_wasmer_common::WasmError;
use corundum_wasmer_common::WasmErrorInner;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// A ready guest instance that callers submit text to.
///
/// Guest linear memory is a single mutable resource, so at most one request is in flight per
/// runtime. `submit` waits its turn, `try_submit` refuses instead of waiting.
pub struct GuestRuntime {
    invoker: Mutex<Invoker<WasmerGuest>>,
    /// copy of the invoker's flag, readable without the lock
    poisoned: AtomicBool,
}

impl GuestRuntime {
    /// compile and instantiate a guest from wasm bytes or wat text
    pub fn new(wasm: &[u8], config: GuestConfig) -> Result<Self, WasmError> {
        let builder = ModuleBuilder::new(config.metering_limit);
        let module = builder.from_binary(wasm)?;
        let guest = WasmerGuest::new(&builder, &module, &config)?;
        tracing::info!(
            exports = ?[&config.alloc_export, &config.free_export, &config.solve_export],
            "guest runtime ready"
        );
        Ok(Self {
            invoker: Mutex::new(Invoker::new(guest, config.alloc_failure_sentinel)),
            poisoned: AtomicBool::new(false),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: GuestConfig) -> Result<Self, WasmError> {
        let path = path.as_ref();
        let wasm = std::fs::read(path).map_err(|e| {
            wasm_error!(WasmErrorInner::ModuleBuild(format!(
                "could not read {}: {e}",
                path.display()
            )))
        })?;
        Self::new(&wasm, config)
    }

    /// run one request, waiting for any request already in flight to finish first
    pub fn submit(&self, input: &str) -> Result<Submission, WasmError> {
        self.run(&mut self.invoker.lock(), input)
    }

    /// run one request only if no other request is in flight
    pub fn try_submit(&self, input: &str) -> Result<Submission, WasmError> {
        match self.invoker.try_lock() {
            Some(mut invoker) => self.run(&mut invoker, input),
            None => Err(wasm_error!(WasmErrorInner::Busy)),
        }
    }

    fn run(
        &self,
        invoker: &mut Invoker<WasmerGuest>,
        input: &str,
    ) -> Result<Submission, WasmError> {
        let result = invoker.submit(input);
        self.poisoned.store(invoker.is_poisoned(), Ordering::Release);
        result
    }

    /// true once a request has trapped, never blocks on a request in flight
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// exclusive access to the underlying guest, no request can start while `f` runs
    /// `f` must not call `submit` or `with_guest` on the same runtime, the lock is not reentrant
    pub fn with_guest<R, F: FnOnce(&mut WasmerGuest) -> R>(&self, f: F) -> R {
        f(self.invoker.lock().guest_mut())
    }
}
