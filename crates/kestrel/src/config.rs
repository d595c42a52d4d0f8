use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Static configuration of a sack, fixed at construction time.
#[derive(Debug, Clone)]
pub struct SackConfig {
    /// Directory holding the metadata cache files.
    pub cachedir: PathBuf,
    /// The system architecture packages are selected for.
    pub arch: String,
    /// Suppress architecture filtering entirely.
    pub all_arch: bool,
    /// The installation root. Anything other than `/` disables the
    /// running-kernel resolver.
    pub rootdir: PathBuf,
    /// Provide names whose versions may coexist (kernels and friends).
    pub installonly: Vec<String>,
    /// How many versions of an installonly name may be installed at once;
    /// 0 disables enforcement.
    pub installonly_limit: u32,
    /// Per-repo override of whether include lists constrain the repo.
    pub use_includes_per_repo: HashMap<String, bool>,
    /// Whether replacements may switch the package vendor.
    pub allow_vendor_change: bool,
}

impl Default for SackConfig {
    fn default() -> Self {
        Self {
            cachedir: default_cachedir(),
            arch: std::env::consts::ARCH.to_owned(),
            all_arch: false,
            rootdir: PathBuf::from("/"),
            installonly: Vec::new(),
            installonly_limit: 0,
            use_includes_per_repo: HashMap::new(),
            allow_vendor_change: true,
        }
    }
}

impl SackConfig {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache directory.
    pub fn cachedir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cachedir = path.into();
        self
    }

    /// Sets the system architecture.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Disables architecture filtering.
    pub fn all_arch(mut self, all_arch: bool) -> Self {
        self.all_arch = all_arch;
        self
    }

    /// Sets the installation root.
    pub fn rootdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.rootdir = path.into();
        self
    }

    /// Sets the installonly provide names and limit.
    pub fn installonly(mut self, names: &[&str], limit: u32) -> Self {
        self.installonly = names.iter().map(|s| (*s).to_owned()).collect();
        self.installonly_limit = limit;
        self
    }

    /// Overrides include-list handling for one repo.
    pub fn use_includes_for_repo(mut self, repo: impl Into<String>, enabled: bool) -> Self {
        self.use_includes_per_repo.insert(repo.into(), enabled);
        self
    }

    /// Whether the running-kernel resolver is active under this configuration.
    pub fn running_kernel_enabled(&self) -> bool {
        self.rootdir == Path::new("/")
    }
}

fn default_cachedir() -> PathBuf {
    // root caches system wide, everyone else under the temp dir
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_owned());
    if user == "root" {
        PathBuf::from("/var/cache/kestrel")
    } else {
        std::env::temp_dir().join(format!("kestrel-{user}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rootdir_gates_running_kernel() {
        assert!(SackConfig::default().running_kernel_enabled());
        assert!(!SackConfig::default()
            .rootdir("/mnt/sysroot")
            .running_kernel_enabled());
    }

    #[test]
    fn builder_composes() {
        let config = SackConfig::new()
            .arch("x86_64")
            .installonly(&["kernel", "kernel-core"], 3)
            .use_includes_for_repo("updates", false);
        assert_eq!(config.arch, "x86_64");
        assert_eq!(config.installonly_limit, 3);
        assert_eq!(config.use_includes_per_repo.get("updates"), Some(&false));
    }
}
