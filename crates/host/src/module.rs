use corundum_wasmer_common::wasm_error;
use corundum_wasmer_common::WasmError;
use corundum_wasmer_common::WasmErrorInner;
use std::sync::Arc;
use wasmer::sys::CompilerConfig;
use wasmer::wasmparser;
use wasmer::Cranelift;
use wasmer::Engine;
use wasmer::Module;
use wasmer::Store;
use wasmer_middlewares::Metering;

/// Generate an engine with a wasm compiler
/// and Metering (use limits) in place when a limit is given.
pub(crate) fn make_engine(metering_limit: Option<u64>) -> Engine {
    let mut compiler = Cranelift::default();
    compiler.canonicalize_nans(true);

    if let Some(limit) = metering_limit {
        let cost_function = |_operator: &wasmparser::Operator| -> u64 { 1 };
        let metering = Arc::new(Metering::new(limit, cost_function));
        compiler.push_middleware(metering);
    }

    Engine::from(compiler)
}

/// Responsible for storing the wasmer Engine used to build wasmer Modules
/// and the Stores they are instantiated in.
///
/// A module can only be instantiated in a store backed by the engine that compiled it, so both
/// always come from the same builder.
pub struct ModuleBuilder {
    engine: Engine,
    metering_limit: Option<u64>,
}

impl ModuleBuilder {
    pub fn new(metering_limit: Option<u64>) -> Self {
        Self {
            engine: make_engine(metering_limit),
            metering_limit,
        }
    }

    /// compile a module from wasm bytes or wat text
    pub fn from_binary(&self, wasm: &[u8]) -> Result<Module, WasmError> {
        Module::new(&self.engine, wasm)
            .map_err(|e| wasm_error!(WasmErrorInner::ModuleBuild(e.to_string())))
    }

    pub fn store(&self) -> Store {
        Store::new(self.engine.clone())
    }

    /// the operator budget compiled into every module this builder produces
    pub fn metering_limit(&self) -> Option<u64> {
        self.metering_limit
    }
}
