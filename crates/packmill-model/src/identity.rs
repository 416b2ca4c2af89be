//! Value identities for types, fields and methods.
//!
//! Types are kept in JVM descriptor form (`I`, `La/b/C;`, `[[La/b/C;`) so
//! array dimensions and primitive/class distinctions fall out of the string
//! shape, matching the compiled-program representation the model is built
//! from. Member identities are full signatures: renaming a type changes the
//! exact key of every member it appears in, so maps over members must always
//! be consulted signature-wise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between a package and a class name in binary names.
pub const PACKAGE_SEPARATOR: char = '/';

/// Separator between an outer and inner class simple name.
pub const INNER_CLASS_SEPARATOR: char = '$';

/// A type in JVM descriptor form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef(String);

impl TypeRef {
    /// A class type from its binary name, e.g. `a/b/C` or `a/b/Outer$Inner`.
    pub fn class(binary_name: &str) -> TypeRef {
        TypeRef(format!("L{binary_name};"))
    }

    /// A primitive type from its single-letter descriptor (`I`, `J`, `V`, ...).
    pub fn primitive(descriptor: char) -> TypeRef {
        TypeRef(descriptor.to_string())
    }

    /// An array type of the given element with `dims` extra dimensions.
    pub fn array_of(element: &TypeRef, dims: usize) -> TypeRef {
        TypeRef(format!("{}{}", "[".repeat(dims), element.0))
    }

    /// A type from a raw descriptor string, unvalidated.
    ///
    /// Use [`TypeRef::is_well_formed`] when the descriptor comes from an
    /// untrusted method body.
    pub fn from_descriptor(descriptor: impl Into<String>) -> TypeRef {
        TypeRef(descriptor.into())
    }

    pub fn descriptor(&self) -> &str {
        &self.0
    }

    pub fn is_array(&self) -> bool {
        self.0.starts_with('[')
    }

    pub fn is_class(&self) -> bool {
        self.0.starts_with('L')
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_array() && !self.is_class()
    }

    /// Number of array dimensions (0 for non-arrays).
    pub fn dimensions(&self) -> usize {
        self.0.bytes().take_while(|b| *b == b'[').count()
    }

    /// The element type of an array, with all dimensions stripped.
    /// Identity for non-arrays.
    pub fn base_type(&self) -> TypeRef {
        if self.is_array() {
            TypeRef(self.0.trim_start_matches('[').to_string())
        } else {
            self.clone()
        }
    }

    /// Rebuild this type around a new base, preserving array dimensions.
    pub fn replace_base(&self, base: &TypeRef) -> TypeRef {
        TypeRef::array_of(base, self.dimensions())
    }

    /// The binary name of a class type (`a/b/C` for `La/b/C;`).
    ///
    /// Empty for primitives and arrays; callers are expected to have taken
    /// the base type first.
    pub fn binary_name(&self) -> &str {
        if self.is_class() && self.0.len() >= 2 && self.0.ends_with(';') {
            &self.0[1..self.0.len() - 1]
        } else {
            ""
        }
    }

    /// The package descriptor of a class type: `a/b` for `La/b/C;`, empty
    /// for the default package and for non-class types.
    pub fn package(&self) -> &str {
        let name = self.binary_name();
        match name.rfind(PACKAGE_SEPARATOR) {
            Some(idx) => &name[..idx],
            None => "",
        }
    }

    /// The simple name of a class type: `Outer$Inner` for `La/b/Outer$Inner;`.
    pub fn simple_name(&self) -> &str {
        let name = self.binary_name();
        match name.rfind(PACKAGE_SEPARATOR) {
            Some(idx) => &name[idx + 1..],
            None => name,
        }
    }

    /// The same simple name relocated into `package` (binary form, empty for
    /// the default package).
    pub fn with_package(&self, package: &str) -> TypeRef {
        if package.is_empty() {
            TypeRef::class(self.simple_name())
        } else {
            TypeRef::class(&format!("{package}{PACKAGE_SEPARATOR}{}", self.simple_name()))
        }
    }

    /// Descriptor grammar check: one-letter primitive, `L...;` class with a
    /// non-empty binary name, or `[`-prefixed array of a well-formed base.
    pub fn is_well_formed(&self) -> bool {
        let base = self.base_type();
        if base.is_array() {
            return false;
        }
        if base.is_class() {
            if !base.0.ends_with(';') {
                return false;
            }
            let name = base.binary_name();
            return !name.is_empty()
                && !name.starts_with(PACKAGE_SEPARATOR)
                && !name.ends_with(PACKAGE_SEPARATOR)
                && !name.contains("//")
                && name.chars().all(|c| !matches!(c, ';' | '[' | '.' | '(' | ')'));
        }
        matches!(base.0.as_str(), "V" | "Z" | "B" | "S" | "C" | "I" | "J" | "F" | "D")
            // Void arrays are not a thing.
            && !(self.is_array() && base.0 == "V")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0)
    }
}

/// A method prototype: return type plus parameter types.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Proto {
    pub return_type: TypeRef,
    pub parameters: Vec<TypeRef>,
}

impl Proto {
    pub fn new(return_type: TypeRef, parameters: Vec<TypeRef>) -> Proto {
        Proto { return_type, parameters }
    }

    /// `()V`-style shorthand used in logs and mapping output.
    pub fn shorty(&self) -> String {
        let mut out = String::from("(");
        for param in &self.parameters {
            out.push_str(param.descriptor());
        }
        out.push(')');
        out.push_str(self.return_type.descriptor());
        out
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shorty())
    }
}

impl fmt::Debug for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proto({})", self.shorty())
    }
}

/// A field signature: holder type, name and field type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub holder: TypeRef,
    pub name: String,
    pub field_type: TypeRef,
}

impl FieldRef {
    pub fn new(holder: TypeRef, name: impl Into<String>, field_type: TypeRef) -> FieldRef {
        FieldRef { holder, name: name.into(), field_type }
    }

    /// The same signature on a different holder.
    pub fn with_holder(&self, holder: TypeRef) -> FieldRef {
        FieldRef { holder, name: self.name.clone(), field_type: self.field_type.clone() }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.holder, self.name, self.field_type)
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldRef({self})")
    }
}

/// A method signature: holder type, name and prototype.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef {
    pub holder: TypeRef,
    pub name: String,
    pub proto: Proto,
}

impl MethodRef {
    pub fn new(holder: TypeRef, name: impl Into<String>, proto: Proto) -> MethodRef {
        MethodRef { holder, name: name.into(), proto }
    }

    pub fn with_holder(&self, holder: TypeRef) -> MethodRef {
        MethodRef { holder, name: self.name.clone(), proto: self.proto.clone() }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}{}", self.holder, self.name, self.proto)
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_descriptor_round_trip() {
        let ty = TypeRef::class("a/b/Outer$Inner");
        assert_eq!(ty.descriptor(), "La/b/Outer$Inner;");
        assert_eq!(ty.binary_name(), "a/b/Outer$Inner");
        assert_eq!(ty.package(), "a/b");
        assert_eq!(ty.simple_name(), "Outer$Inner");
        assert!(ty.is_well_formed());
    }

    #[test]
    fn array_base_and_rewrap() {
        let base = TypeRef::class("a/C");
        let arr = TypeRef::array_of(&base, 2);
        assert_eq!(arr.descriptor(), "[[La/C;");
        assert_eq!(arr.dimensions(), 2);
        assert_eq!(arr.base_type(), base);
        let moved = arr.replace_base(&TypeRef::class("z/C"));
        assert_eq!(moved.descriptor(), "[[Lz/C;");
    }

    #[test]
    fn default_package_relocation() {
        let ty = TypeRef::class("Top");
        assert_eq!(ty.package(), "");
        assert_eq!(ty.with_package("z").descriptor(), "Lz/Top;");
        assert_eq!(TypeRef::class("z/Top").with_package("").descriptor(), "LTop;");
    }

    #[test]
    fn identities_serialize_as_plain_descriptors() {
        let method = MethodRef::new(
            TypeRef::class("a/X"),
            "find",
            Proto::new(TypeRef::class("a/Y"), vec![TypeRef::primitive('I')]),
        );
        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["holder"], "La/X;");
        assert_eq!(json["proto"]["return_type"], "La/Y;");
    }

    #[test]
    fn malformed_descriptors_rejected() {
        assert!(!TypeRef::from_descriptor("L;").is_well_formed());
        assert!(!TypeRef::from_descriptor("La/b/C").is_well_formed());
        assert!(!TypeRef::from_descriptor("[V").is_well_formed());
        assert!(!TypeRef::from_descriptor("Q").is_well_formed());
        assert!(TypeRef::primitive('I').is_well_formed());
    }
}
