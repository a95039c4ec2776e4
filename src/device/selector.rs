//! Compute device selection.

use super::libraries::{cuda_library_patterns, find_library, library_search_paths, rocm_library_patterns};
use crate::config::InferenceDevice;
use crate::error::{Error, Result};
use ort::ep::{CUDA, CoreML, ExecutionProvider, ExecutionProviderDispatch, ROCm};
use serde::Serialize;
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// Compute backend kinds, in the order they are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// NVIDIA CUDA.
    Cuda,
    /// Apple unified-memory accelerator via CoreML.
    CoreMl,
    /// AMD ROCm.
    Rocm,
    /// Central processor.
    Cpu,
}

/// Accelerators tried before falling back to CPU.
pub const ACCELERATOR_PRIORITY: [DeviceKind; 3] =
    [DeviceKind::Cuda, DeviceKind::CoreMl, DeviceKind::Rocm];

impl DeviceKind {
    /// Whether this is a hardware accelerator.
    pub const fn is_accelerator(self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cuda => "CUDA (NVIDIA GPU acceleration)",
            Self::CoreMl => "CoreML (Apple GPU/Neural Engine)",
            Self::Rocm => "ROCm (AMD GPU acceleration)",
            Self::Cpu => "CPU (always available)",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cuda => "CUDA",
            Self::CoreMl => "CoreML",
            Self::Rocm => "ROCm",
            Self::Cpu => "CPU",
        };
        f.write_str(name)
    }
}

/// The device chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    kind: DeviceKind,
}

impl Device {
    /// Device of the given kind.
    pub const fn new(kind: DeviceKind) -> Self {
        Self { kind }
    }

    /// CPU device.
    pub const fn cpu() -> Self {
        Self::new(DeviceKind::Cpu)
    }

    /// Backend kind.
    pub const fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Execution providers to register on an ONNX session for this device.
    ///
    /// Accelerator providers are registered with `error_on_failure` so a
    /// session never silently lands on CPU after an accelerator was chosen.
    pub fn execution_providers(&self) -> Vec<ExecutionProviderDispatch> {
        match self.kind {
            DeviceKind::Cuda => vec![CUDA::default().build().error_on_failure()],
            DeviceKind::CoreMl => {
                vec![CoreML::default().build().error_on_failure()]
            }
            DeviceKind::Rocm => vec![ROCm::default().build().error_on_failure()],
            DeviceKind::Cpu => Vec::new(),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

/// Reports whether an accelerator can be used on this machine.
pub trait AcceleratorProbe {
    /// Whether `kind` is usable right now.
    fn is_available(&self, kind: DeviceKind) -> bool;
}

/// Probe backed by ONNX Runtime provider checks and runtime library lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeProbe;

impl AcceleratorProbe for RuntimeProbe {
    fn is_available(&self, kind: DeviceKind) -> bool {
        let (provider_ok, libraries_ok) = match kind {
            DeviceKind::Cuda => (
                provider_available(&CUDA::default()),
                find_library(&library_search_paths(), cuda_library_patterns()).is_some(),
            ),
            DeviceKind::CoreMl => (
                cfg!(target_os = "macos")
                    && provider_available(&CoreML::default()),
                true,
            ),
            DeviceKind::Rocm => (
                provider_available(&ROCm::default()),
                find_library(&library_search_paths(), rocm_library_patterns()).is_some(),
            ),
            DeviceKind::Cpu => (true, true),
        };

        debug!("Probe {kind}: provider={provider_ok}, runtime libraries={libraries_ok}");
        provider_ok && libraries_ok
    }
}

fn provider_available(provider: &impl ExecutionProvider) -> bool {
    provider.is_available().unwrap_or_else(|e| {
        debug!("Provider availability check failed: {e}");
        false
    })
}

/// Chooses the compute device for a run.
pub struct DeviceSelector<P: AcceleratorProbe = RuntimeProbe> {
    probe: P,
    mode: InferenceDevice,
    confirm_cpu_fallback: bool,
}

impl DeviceSelector<RuntimeProbe> {
    /// Selector probing the real runtime.
    pub const fn new(mode: InferenceDevice, confirm_cpu_fallback: bool) -> Self {
        Self::with_probe(RuntimeProbe, mode, confirm_cpu_fallback)
    }
}

impl<P: AcceleratorProbe> DeviceSelector<P> {
    /// Selector using a custom probe.
    pub const fn with_probe(probe: P, mode: InferenceDevice, confirm_cpu_fallback: bool) -> Self {
        Self {
            probe,
            mode,
            confirm_cpu_fallback,
        }
    }

    /// First available accelerator in priority order.
    pub fn best_accelerator(&self) -> Option<DeviceKind> {
        ACCELERATOR_PRIORITY
            .into_iter()
            .find(|kind| self.probe.is_available(*kind))
    }

    /// Availability of every device kind, for display.
    pub fn survey(&self) -> Vec<(DeviceKind, bool)> {
        ACCELERATOR_PRIORITY
            .into_iter()
            .map(|kind| (kind, self.probe.is_available(kind)))
            .chain(std::iter::once((DeviceKind::Cpu, true)))
            .collect()
    }

    /// Select the device for this run.
    ///
    /// `confirm` is consulted only in auto mode when no accelerator exists
    /// and confirmation is enabled; returning `false` aborts the run.
    pub fn select(&self, confirm: impl FnOnce() -> Result<bool>) -> Result<Device> {
        let device = match self.mode {
            InferenceDevice::Cpu => {
                info!("Requested device: CPU");
                Device::cpu()
            }
            InferenceDevice::Gpu => {
                let kind = self
                    .best_accelerator()
                    .ok_or_else(|| Error::DeviceUnavailable {
                        reason: format!(
                            "none of {} is usable",
                            ACCELERATOR_PRIORITY
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    })?;
                info!("--gpu: Selected {kind}");
                Device::new(kind)
            }
            InferenceDevice::Auto => {
                if let Some(kind) = self.best_accelerator() {
                    info!("Auto mode: {kind} available");
                    Device::new(kind)
                } else {
                    warn!("Auto mode: no accelerator available, falling back to CPU");
                    if self.confirm_cpu_fallback && !confirm()? {
                        return Err(Error::CpuFallbackDeclined);
                    }
                    Device::cpu()
                }
            }
        };

        info!("Using device: {}", device.kind().description());
        Ok(device)
    }
}

/// Ask on the terminal whether to continue on CPU.
#[allow(clippy::print_stdout)]
pub fn prompt_cpu_fallback() -> Result<bool> {
    print!("No GPU available. CPU inference may be slow for large archives. Continue? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
