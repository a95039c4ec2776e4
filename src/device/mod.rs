//! Compute device selection for inference.

mod libraries;
mod selector;

pub use libraries::{
    cuda_library_patterns, find_library, library_search_paths, rocm_library_patterns,
};
pub use selector::{
    ACCELERATOR_PRIORITY, AcceleratorProbe, Device, DeviceKind, DeviceSelector, RuntimeProbe,
    prompt_cpu_fallback,
};
