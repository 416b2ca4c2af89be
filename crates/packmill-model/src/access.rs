//! Access flags for classes and members.

use serde::{Deserialize, Serialize};

/// Declared visibility of a class, field or method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    PackagePrivate,
    Private,
}

impl Visibility {
    /// Whether access to this item can depend on the accessor's package:
    /// package-private always, protected unless the accessor is a subtype.
    pub fn is_package_sensitive(self) -> bool {
        matches!(self, Visibility::PackagePrivate | Visibility::Protected)
    }
}

/// The subset of access flags the repackaging passes care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFlags {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub is_synthetic: bool,
}

impl AccessFlags {
    pub fn new(visibility: Visibility) -> AccessFlags {
        AccessFlags {
            visibility,
            is_static: false,
            is_final: false,
            is_abstract: false,
            is_interface: false,
            is_synthetic: false,
        }
    }

    pub fn public() -> AccessFlags {
        AccessFlags::new(Visibility::Public)
    }

    pub fn protected() -> AccessFlags {
        AccessFlags::new(Visibility::Protected)
    }

    pub fn package_private() -> AccessFlags {
        AccessFlags::new(Visibility::PackagePrivate)
    }

    pub fn private() -> AccessFlags {
        AccessFlags::new(Visibility::Private)
    }

    pub fn with_static(mut self) -> AccessFlags {
        self.is_static = true;
        self
    }

    pub fn with_final(mut self) -> AccessFlags {
        self.is_final = true;
        self
    }

    pub fn with_abstract(mut self) -> AccessFlags {
        self.is_abstract = true;
        self
    }

    pub fn with_interface(mut self) -> AccessFlags {
        self.is_interface = true;
        self
    }

    pub fn with_synthetic(mut self) -> AccessFlags {
        self.is_synthetic = true;
        self
    }
}
