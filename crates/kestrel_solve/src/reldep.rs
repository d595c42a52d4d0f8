//! Typed `name [op evr]` relations.

use bitflags::bitflags;

use crate::id::StringId;

bitflags! {
    /// Comparison half of a versioned relation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DepFlags: u32 {
        /// The relation accepts versions below the stated EVR.
        const LT = 1 << 0;
        /// The relation accepts the stated EVR itself.
        const EQ = 1 << 1;
        /// The relation accepts versions above the stated EVR.
        const GT = 1 << 2;
        /// A parenthesised rich dependency, interned verbatim and opaque to
        /// resolution.
        const RICH = 1 << 3;
    }
}

impl DepFlags {
    /// Renders the comparison operator.
    pub fn as_operator(self) -> &'static str {
        match self & (DepFlags::LT | DepFlags::EQ | DepFlags::GT) {
            f if f == DepFlags::LT => "<",
            f if f == DepFlags::LT | DepFlags::EQ => "<=",
            f if f == DepFlags::EQ => "=",
            f if f == DepFlags::GT | DepFlags::EQ => ">=",
            f if f == DepFlags::GT => ">",
            _ => "",
        }
    }

    /// Parses a rendered comparison operator.
    pub fn from_operator(op: &str) -> Option<DepFlags> {
        match op {
            "<" => Some(DepFlags::LT),
            "<=" => Some(DepFlags::LT | DepFlags::EQ),
            "=" | "==" => Some(DepFlags::EQ),
            ">=" => Some(DepFlags::GT | DepFlags::EQ),
            ">" => Some(DepFlags::GT),
            _ => None,
        }
    }
}

/// An interned dependency relation. `flags` empty means a bare name (or file
/// path) without a version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reldep {
    /// The capability name, file path, or the whole rich-dependency string.
    pub name: StringId,
    /// Comparison flags, empty for an unversioned relation.
    pub flags: DepFlags,
    /// The interned EVR string the relation compares against.
    pub evr: StringId,
}

impl Reldep {
    /// Whether the relation carries a version constraint.
    pub fn is_versioned(&self) -> bool {
        self.flags.intersects(DepFlags::LT | DepFlags::EQ | DepFlags::GT)
    }

    /// Whether this is an opaque rich dependency.
    pub fn is_rich(&self) -> bool {
        self.flags.contains(DepFlags::RICH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_round_trip() {
        for op in ["<", "<=", "=", ">=", ">"] {
            assert_eq!(DepFlags::from_operator(op).unwrap().as_operator(), op);
        }
        assert_eq!(DepFlags::from_operator("=="), Some(DepFlags::EQ));
        assert_eq!(DepFlags::from_operator("~="), None);
    }
}
