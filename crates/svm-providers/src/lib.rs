//! Upstream catalogs and install conventions of every supported toolchain.

mod catalog;
mod dotnet;
mod go;
mod java;
mod node;
mod python;

use anyhow::{anyhow, Result};
use svm_core::{HostPlatform, ProviderAdapter, Transport};

pub use dotnet::{DotnetComponent, DotnetProvider, DOTNET_COMPONENTS};
pub use go::GoProvider;
pub use java::JavaProvider;
pub use node::NodeProvider;
pub use python::PythonProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Node,
    Go,
    Java,
    Python,
    Dotnet,
}

impl Toolchain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Go => "go",
            Self::Java => "java",
            Self::Python => "python",
            Self::Dotnet => "dotnet",
        }
    }

    pub fn has_components(self) -> bool {
        self == Self::Dotnet
    }
}

/// Builds the adapter for `toolchain`. `component` is required for
/// toolchains with components and rejected for the rest.
pub fn provider_for<'a>(
    toolchain: Toolchain,
    component: Option<&str>,
    transport: &'a dyn Transport,
    platform: HostPlatform,
) -> Result<Box<dyn ProviderAdapter + 'a>> {
    if !toolchain.has_components() {
        if let Some(component) = component {
            return Err(anyhow!(
                "{} has no components (got '{component}')",
                toolchain.as_str()
            ));
        }
    }

    let provider: Box<dyn ProviderAdapter + 'a> = match toolchain {
        Toolchain::Node => Box::new(NodeProvider::new(transport, platform)),
        Toolchain::Go => Box::new(GoProvider::new(transport, platform)),
        Toolchain::Java => Box::new(JavaProvider::new(transport, platform)),
        Toolchain::Python => Box::new(PythonProvider::new(transport, platform)),
        Toolchain::Dotnet => {
            let requested = component.unwrap_or("sdk");
            let component = DotnetComponent::parse(requested).ok_or_else(|| {
                anyhow!(
                    "unknown dotnet component '{requested}' (expected one of: {})",
                    DOTNET_COMPONENTS.join(", ")
                )
            })?;
            Box::new(DotnetProvider::new(transport, platform, component))
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests;
