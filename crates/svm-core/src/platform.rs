#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Darwin,
    Linux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArch {
    X64,
    X86,
    Arm64,
    Arm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: HostOs,
    pub arch: HostArch,
}

impl HostOs {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" => Some(Self::Windows),
            "darwin" | "macos" | "mac" | "osx" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }
}

impl HostArch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Some(Self::X64),
            "x86" | "386" | "i386" | "i686" => Some(Self::X86),
            "arm64" | "aarch64" => Some(Self::Arm64),
            "arm" | "armv7" => Some(Self::Arm),
            _ => None,
        }
    }
}

impl HostPlatform {
    pub fn new(os: HostOs, arch: HostArch) -> Self {
        Self { os, arch }
    }

    /// Unknown operating systems are treated as Linux and unknown
    /// architectures as x64, the layouts most upstreams publish.
    pub fn detect() -> Self {
        let os = HostOs::parse(std::env::consts::OS).unwrap_or(HostOs::Linux);
        let arch = HostArch::parse(std::env::consts::ARCH).unwrap_or(HostArch::X64);
        Self { os, arch }
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }
}
