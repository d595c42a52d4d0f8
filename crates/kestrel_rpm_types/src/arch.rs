/// The architecture-independent pseudo arch.
pub const NOARCH: &str = "noarch";

/// Source package arches, never installable.
pub const SRC_ARCHES: &[&str] = &["src", "nosrc"];

/// Maps a concrete architecture to the base architecture of its multilib family.
/// Unknown arches map to themselves.
pub fn basearch(arch: &str) -> &str {
    match arch {
        "athlon" | "geode" | "i386" | "i486" | "i586" | "i686" => "i386",
        "amd64" | "ia32e" | "x86_64" => "x86_64",
        "armv5tel" | "armv6l" | "armv7l" | "armv8l" => "arm",
        "armv6hl" | "armv7hl" | "armv7hnl" | "armv8hl" => "armhfp",
        "aarch64" => "aarch64",
        "ppc64" | "ppc64iseries" | "ppc64p7" | "ppc64pseries" => "ppc64",
        "ppc64le" => "ppc64le",
        "s390x" => "s390x",
        "riscv64" => "riscv64",
        other => other,
    }
}

/// Whether a package of arch `a` may replace or satisfy a package of arch `b`.
/// `noarch` is compatible with everything; otherwise the arches must share a
/// multilib family.
pub fn is_arch_compatible(a: &str, b: &str) -> bool {
    a == b || a == NOARCH || b == NOARCH || basearch(a) == basearch(b)
}
