pub use crate::abi::GuestAbi;
pub use crate::abi::GuestTrap;
pub use crate::config::GuestConfig;
pub use crate::config::WASM_METERING_LIMIT;
pub use crate::guest::WasmerGuest;
pub use crate::invoker::Invoker;
pub use crate::invoker::RequestState;
pub use crate::invoker::Submission;
pub use crate::module::ModuleBuilder;
pub use crate::runtime::GuestRuntime;
pub use corundum_wasmer_common::marshal;
pub use corundum_wasmer_common::wasm_error;
pub use corundum_wasmer_common::*;
