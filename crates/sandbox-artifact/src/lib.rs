//! Sandbox Artifact Primitives
//!
//! Value types shared by every sandbox crate and the bytecode linker.
//!
//! # Core Concepts
//!
//! - [`Address`]: 20-byte account or program address
//! - [`Bytes32`] / [`AssetKey`]: 32-byte names, right-padded with zeros
//! - [`Uint`]: unsigned setting value (18-decimal fixed point by convention)
//! - [`CompiledArtifact`]: compiler output with library placeholders
//! - [`link`]: pure placeholder substitution producing [`LinkedBytecode`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sandbox_artifact::{link, CompiledArtifact, LibraryBindingMap};
//!
//! let artifact = CompiledArtifact::load("artifacts/SystemSettings.json")?;
//! let libs = LibraryBindingMap::new().with("SafeDecimalMath", math_address);
//! let linked = link(&artifact, &libs)?;
//! println!("linked {} ({})", artifact.name(), linked.hash().short());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod address;
mod artifact;
mod hash;
mod linker;
mod name;
mod units;

pub use address::{Address, AddressError, ADDRESS_LEN};
pub use artifact::{ArtifactError, CompiledArtifact, LinkReference};
pub use hash::ContentHash;
pub use linker::{link, LibraryBindingMap, LinkError, LinkedBytecode};
pub use name::{AssetKey, Bytes32, NameError};
pub use units::{Uint, BPS_IN_EIGHTEEN, ONE_IN_EIGHTEEN};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
