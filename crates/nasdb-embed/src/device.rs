use candle_core::Device;

/// Picks the fastest compiled-in backend, falling back to the CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(dev) = Device::new_cuda(0) { tracing::info!("embedding device: CUDA"); return dev; }
    }
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { tracing::info!("embedding device: Metal"); return dev; }
    }
    tracing::info!("embedding device: CPU");
    Device::Cpu
}
