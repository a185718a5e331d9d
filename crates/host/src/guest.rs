use crate::abi::GuestAbi;
use crate::abi::GuestTrap;
use crate::config::GuestConfig;
use crate::module::ModuleBuilder;
use corundum_wasmer_common::memory::checked_range;
use corundum_wasmer_common::memory::OutOfBounds;
use corundum_wasmer_common::wasm_error;
use corundum_wasmer_common::GuestBuffer;
use corundum_wasmer_common::GuestPtr;
use corundum_wasmer_common::Len;
use corundum_wasmer_common::LinearMemory;
use corundum_wasmer_common::PackedResult;
use corundum_wasmer_common::WasmError;
use corundum_wasmer_common::WasmErrorInner;
use wasmer::imports;
use wasmer::ExportError;
use wasmer::Instance;
use wasmer::Memory;
use wasmer::MemoryView;
use wasmer::Module;
use wasmer::RuntimeError;
use wasmer::Store;
use wasmer::TypedFunction;
use wasmer::Value;
use wasmer_middlewares::metering::get_remaining_points;
use wasmer_middlewares::metering::set_remaining_points;
use wasmer_middlewares::metering::MeteringPoints;

/// Guest linear memory as it is at the moment the view was taken.
///
/// Reads and writes go through wasmer's bounds checked `MemoryView` rather than raw pointers into
/// the host's mapping of guest memory, so a guest handing out bogus offsets can at worst produce
/// an error, never corrupt the host.
pub struct GuestMemory<'a>(MemoryView<'a>);

impl LinearMemory for GuestMemory<'_> {
    fn size(&self) -> u64 {
        self.0.data_size()
    }

    fn read(&self, ptr: GuestPtr, buf: &mut [u8]) -> Result<(), OutOfBounds> {
        let size = self.size();
        let buffer = checked_range(ptr, buf.len(), size)?;
        self.0
            .read(u64::from(buffer.ptr()), buf)
            .map_err(|_| OutOfBounds { buffer, size })
    }

    fn write(&mut self, ptr: GuestPtr, bytes: &[u8]) -> Result<(), OutOfBounds> {
        let size = self.size();
        let buffer = checked_range(ptr, bytes.len(), size)?;
        self.0
            .write(u64::from(buffer.ptr()), bytes)
            .map_err(|_| OutOfBounds { buffer, size })
    }
}

/// A live wasmer instance of a guest module and the exports the host binds against.
pub struct WasmerGuest {
    store: Store,
    instance: Instance,
    memory: Memory,
    alloc: TypedFunction<Len, GuestPtr>,
    free: TypedFunction<(GuestPtr, Len), ()>,
    solve: TypedFunction<(GuestPtr, Len), u64>,
    metering_limit: Option<u64>,
}

fn export_error(e: ExportError) -> WasmError {
    wasm_error!(WasmErrorInner::Export(e.to_string()))
}

fn trap(e: RuntimeError) -> GuestTrap {
    GuestTrap(e.to_string())
}

impl WasmerGuest {
    /// instantiate `module` in a fresh store from `builder` and look up the configured exports
    /// the guest gets no imports, it can only compute over its own memory
    pub fn new(
        builder: &ModuleBuilder,
        module: &Module,
        config: &GuestConfig,
    ) -> Result<Self, WasmError> {
        let mut store = builder.store();
        let instance = Instance::new(&mut store, module, &imports! {})
            .map_err(|e| wasm_error!(WasmErrorInner::Instantiate(e.to_string())))?;
        let memory = instance
            .exports
            .get_memory(&config.memory_export)
            .map_err(export_error)?
            .clone();
        let alloc = instance
            .exports
            .get_typed_function(&store, &config.alloc_export)
            .map_err(export_error)?;
        let free = instance
            .exports
            .get_typed_function(&store, &config.free_export)
            .map_err(export_error)?;
        let solve = instance
            .exports
            .get_typed_function(&store, &config.solve_export)
            .map_err(export_error)?;
        tracing::debug!(
            memory_bytes = memory.view(&store).data_size(),
            metering_limit = ?builder.metering_limit(),
            "guest instantiated"
        );
        Ok(Self {
            store,
            instance,
            memory,
            alloc,
            free,
            solve,
            metering_limit: builder.metering_limit(),
        })
    }

    /// read an exported global, e.g. for guests that expose counters for diagnostics
    pub fn global(&mut self, name: &str) -> Result<Value, WasmError> {
        Ok(self
            .instance
            .exports
            .get_global(name)
            .map_err(export_error)?
            .get(&mut self.store))
    }

    /// operator budget left for the current request, `None` if metering is off
    pub fn metering_points(&mut self) -> Option<MeteringPoints> {
        self.metering_limit
            .map(|_| get_remaining_points(&mut self.store, &self.instance))
    }

    pub fn memory_size(&self) -> u64 {
        self.memory.view(&self.store).data_size()
    }
}

impl GuestAbi for WasmerGuest {
    type Memory<'a> = GuestMemory<'a>;

    /// every request gets the full operator budget
    fn prepare(&mut self) {
        if let Some(limit) = self.metering_limit {
            set_remaining_points(&mut self.store, &self.instance, limit);
        }
    }

    fn alloc(&mut self, len: Len) -> Result<GuestPtr, GuestTrap> {
        self.alloc.call(&mut self.store, len).map_err(trap)
    }

    fn free(&mut self, buffer: GuestBuffer) -> Result<(), GuestTrap> {
        self.free
            .call(&mut self.store, buffer.ptr(), buffer.len())
            .map_err(trap)
    }

    fn solve(&mut self, input: GuestBuffer) -> Result<PackedResult, GuestTrap> {
        self.solve
            .call(&mut self.store, input.ptr(), input.len())
            .map(PackedResult::from)
            .map_err(trap)
    }

    fn memory(&mut self) -> Self::Memory<'_> {
        GuestMemory(self.memory.view(&self.store))
    }
}
