//! Process-wide inference backend
//!
//! The compute device is initialised once per process and shared by every
//! loader and model through an `Arc`. The global slot only holds a `Weak`,
//! so the backend is released when the last handle goes away.

use aiterm_runtime_api::LoadError;
use candle_core::Device;
use std::sync::{Arc, Mutex, Weak};

static BACKEND: Mutex<Weak<Backend>> = Mutex::new(Weak::new());

#[derive(Debug)]
pub struct Backend {
    device: Device,
}

impl Backend {
    /// Return the live backend, initialising it if no handle exists.
    ///
    /// `use_gpu` only matters for the call that performs initialisation.
    pub fn acquire(use_gpu: bool) -> Result<Arc<Backend>, LoadError> {
        let mut slot = BACKEND.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(backend) = slot.upgrade() {
            tracing::debug!("Reusing inference backend on {:?}", backend.device);
            return Ok(backend);
        }

        let device = select_device(use_gpu)?;
        tracing::info!("Initialised inference backend on {:?}", device);

        let backend = Arc::new(Backend { device });
        *slot = Arc::downgrade(&backend);
        Ok(backend)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        tracing::info!("Released inference backend");
    }
}

fn select_device(use_gpu: bool) -> Result<Device, LoadError> {
    if !use_gpu {
        tracing::info!("Using CPU device (GPU disabled in config)");
        return Ok(Device::Cpu);
    }

    #[cfg(feature = "metal")]
    {
        tracing::info!("Using Metal device");
        Device::new_metal(0).map_err(|e| LoadError::Backend(e.to_string()))
    }
    #[cfg(all(feature = "cuda", not(feature = "metal")))]
    {
        tracing::info!("Using CUDA device");
        Device::new_cuda(0).map_err(|e| LoadError::Backend(e.to_string()))
    }
    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    {
        tracing::info!("Using CPU device (no GPU features enabled)");
        Ok(Device::Cpu)
    }
}

/// Serialises tests that acquire the backend, so one test's handles never
/// keep another test's backend alive.
#[cfg(test)]
pub(crate) fn exclusive() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_backend() -> Option<Arc<Backend>> {
        BACKEND.lock().unwrap().upgrade()
    }

    #[test]
    fn concurrent_handles_share_one_backend() {
        let _guard = exclusive();
        let first = Backend::acquire(false).unwrap();
        let second = Backend::acquire(true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn last_handle_releases_and_next_acquire_starts_fresh() {
        let _guard = exclusive();
        let first = Backend::acquire(false).unwrap();
        let second = Backend::acquire(false).unwrap();
        let old = Arc::downgrade(&first);

        drop(first);
        assert!(live_backend().is_some());

        drop(second);
        assert!(live_backend().is_none());
        assert!(old.upgrade().is_none());

        let fresh = Backend::acquire(false).unwrap();
        // `old` still pins the released allocation, so a new backend cannot share its address
        assert!(!Weak::ptr_eq(&old, &Arc::downgrade(&fresh)));
        assert!(Arc::ptr_eq(&fresh, &live_backend().unwrap()));
        assert_eq!(Arc::strong_count(&fresh), 1);
    }

    #[test]
    fn cpu_backend_when_gpu_disabled() {
        let device = select_device(false).unwrap();
        assert!(matches!(device, Device::Cpu));
    }
}
