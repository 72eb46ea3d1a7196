//! WGSL shader sources for dose assembly.

/// The dense assembly compute shader. The marker line `//__KERNEL_DOSE__`
/// is replaced with the kernel's `kernel_dose` definition before the
/// module is compiled.
pub const DOSE_SHADER: &str = include_str!("dose.wgsl");

/// Marker replaced by [`crate::GpuDoseKernel::wgsl_source`].
pub const KERNEL_MARKER: &str = "//__KERNEL_DOSE__";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_contains_kernel_marker() {
        assert!(DOSE_SHADER.contains(KERNEL_MARKER));
    }
}
