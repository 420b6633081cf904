//! Which runtimes this build can drive, and which one `auto` resolves to.

use super::Backend;

/// A runtime compiled into this build.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub backend: Backend,
    /// Label used in listings.
    pub name: &'static str,
    /// A usable platform was found when probing.
    pub available: bool,
    /// Preference when resolving `auto`; larger wins.
    pub rank: u32,
    pub summary: &'static str,
}

fn host_runtime() -> BackendInfo {
    BackendInfo {
        backend: Backend::Cpu,
        name: "CPU",
        available: true,
        rank: 10,
        summary: "host runtime, reference kernels only, rows split across rayon workers",
    }
}

#[cfg(feature = "opencl")]
fn opencl_runtime() -> BackendInfo {
    let available = super::OpenClBackend::is_available();
    BackendInfo {
        backend: Backend::OpenCl,
        name: "OpenCL",
        available,
        rank: if available { 100 } else { 0 },
        summary: "installed OpenCL platforms, any kernel source",
    }
}

/// Runtimes compiled into this build, highest rank first.
pub fn detect_backends() -> Vec<BackendInfo> {
    let mut found = vec![host_runtime()];
    #[cfg(feature = "opencl")]
    found.push(opencl_runtime());
    found.sort_by_key(|info| std::cmp::Reverse(info.rank));
    found
}

/// The runtime `auto` resolves to. The host runtime is always usable, so
/// this never fails.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .find(|info| info.available)
        .map_or(Backend::Cpu, |info| info.backend)
}

/// Listing for `clconv devices`: `[+]` usable, `[-]` compiled in but no
/// platform found.
pub fn describe_backends() -> String {
    detect_backends()
        .iter()
        .map(|info| {
            let mark = if info.available { '+' } else { '-' };
            format!("[{mark}] {}: {}\n", info.name, info.summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_runtime_listed_and_usable() {
        let found = detect_backends();
        assert!(found.iter().any(|info| info.backend == Backend::Cpu && info.available));
        assert!(found.windows(2).all(|w| w[0].rank >= w[1].rank));
        assert!(describe_backends().contains("[+] CPU"));
    }

    #[cfg(not(feature = "opencl"))]
    #[test]
    fn test_auto_without_opencl_is_host() {
        assert_eq!(select_best_backend(), Backend::Cpu);
        assert_eq!(Backend::Auto.resolve(), Backend::Cpu);
    }
}
