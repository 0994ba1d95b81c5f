//! # Field Model
//!
//! Every VRML field slot is described by a declaration (kind, access, name)
//! and addressed by a small integer id that is stable for the node's life.
//!
//! The per-type wrapper classes of classic EAI bindings collapse here into a
//! closed enum: [`FieldKind`] is the type table, [`FieldValue`] the tagged
//! value union and [`FieldElement`] the single-element view used by indexed
//! operations.

mod value;

pub use value::{FieldElement, FieldValue, SfImage};

use std::fmt;

/// Identifier of one field slot on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Returns the id as a slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of VRML97 field types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    /// Single boolean.
    SfBool = 0,
    /// Single RGB colour.
    SfColor = 1,
    /// Single float.
    SfFloat = 2,
    /// Single image (width, height, components, packed pixels).
    SfImage = 3,
    /// Single 32-bit integer.
    SfInt32 = 4,
    /// Single node reference (may be empty).
    SfNode = 5,
    /// Single axis-angle rotation.
    SfRotation = 6,
    /// Single string.
    SfString = 7,
    /// Single time value in seconds.
    SfTime = 8,
    /// Single 2D vector.
    SfVec2f = 9,
    /// Single 3D vector.
    SfVec3f = 10,
    /// Array of RGB colours.
    MfColor = 11,
    /// Array of floats.
    MfFloat = 12,
    /// Array of 32-bit integers.
    MfInt32 = 13,
    /// Array of node references.
    MfNode = 14,
    /// Array of rotations.
    MfRotation = 15,
    /// Array of strings.
    MfString = 16,
    /// Array of time values.
    MfTime = 17,
    /// Array of 2D vectors.
    MfVec2f = 18,
    /// Array of 3D vectors.
    MfVec3f = 19,
}

impl FieldKind {
    /// Every field kind, in type-code order.
    pub const ALL: [Self; 20] = [
        Self::SfBool,
        Self::SfColor,
        Self::SfFloat,
        Self::SfImage,
        Self::SfInt32,
        Self::SfNode,
        Self::SfRotation,
        Self::SfString,
        Self::SfTime,
        Self::SfVec2f,
        Self::SfVec3f,
        Self::MfColor,
        Self::MfFloat,
        Self::MfInt32,
        Self::MfNode,
        Self::MfRotation,
        Self::MfString,
        Self::MfTime,
        Self::MfVec2f,
        Self::MfVec3f,
    ];

    /// Returns true for MF (multi-value) kinds.
    #[inline]
    #[must_use]
    pub const fn is_multi(self) -> bool {
        (self as u8) >= (Self::MfColor as u8)
    }

    /// Number of scalar components in one element of this kind.
    ///
    /// Colours and 3D vectors are 3, rotations 4, 2D vectors 2, everything
    /// else 1.
    #[must_use]
    pub const fn element_width(self) -> usize {
        match self {
            Self::SfColor | Self::SfVec3f | Self::MfColor | Self::MfVec3f => 3,
            Self::SfRotation | Self::MfRotation => 4,
            Self::SfVec2f | Self::MfVec2f => 2,
            _ => 1,
        }
    }

    /// The VRML spelling of the type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SfBool => "SFBool",
            Self::SfColor => "SFColor",
            Self::SfFloat => "SFFloat",
            Self::SfImage => "SFImage",
            Self::SfInt32 => "SFInt32",
            Self::SfNode => "SFNode",
            Self::SfRotation => "SFRotation",
            Self::SfString => "SFString",
            Self::SfTime => "SFTime",
            Self::SfVec2f => "SFVec2f",
            Self::SfVec3f => "SFVec3f",
            Self::MfColor => "MFColor",
            Self::MfFloat => "MFFloat",
            Self::MfInt32 => "MFInt32",
            Self::MfNode => "MFNode",
            Self::MfRotation => "MFRotation",
            Self::MfString => "MFString",
            Self::MfTime => "MFTime",
            Self::MfVec2f => "MFVec2f",
            Self::MfVec3f => "MFVec3f",
        }
    }

    /// The default (empty) value of this kind.
    #[must_use]
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::SfBool => FieldValue::SfBool(false),
            Self::SfColor => FieldValue::SfColor([0.0; 3]),
            Self::SfFloat => FieldValue::SfFloat(0.0),
            Self::SfImage => FieldValue::SfImage(SfImage::default()),
            Self::SfInt32 => FieldValue::SfInt32(0),
            Self::SfNode => FieldValue::SfNode(None),
            Self::SfRotation => FieldValue::SfRotation([0.0, 0.0, 1.0, 0.0]),
            Self::SfString => FieldValue::SfString(String::new()),
            Self::SfTime => FieldValue::SfTime(-1.0),
            Self::SfVec2f => FieldValue::SfVec2f([0.0; 2]),
            Self::SfVec3f => FieldValue::SfVec3f([0.0; 3]),
            Self::MfColor => FieldValue::MfColor(Vec::new()),
            Self::MfFloat => FieldValue::MfFloat(Vec::new()),
            Self::MfInt32 => FieldValue::MfInt32(Vec::new()),
            Self::MfNode => FieldValue::MfNode(Vec::new()),
            Self::MfRotation => FieldValue::MfRotation(Vec::new()),
            Self::MfString => FieldValue::MfString(Vec::new()),
            Self::MfTime => FieldValue::MfTime(Vec::new()),
            Self::MfVec2f => FieldValue::MfVec2f(Vec::new()),
            Self::MfVec3f => FieldValue::MfVec3f(Vec::new()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a field may be accessed from outside the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AccessType {
    /// Write-only event sink.
    EventIn = 0,
    /// Read/notify-only event source.
    EventOut = 1,
    /// Readable, writable and notifying.
    ExposedField = 2,
    /// Initialization-only field, not reachable through EAI.
    Field = 3,
}

impl AccessType {
    /// Whether eventIns may be created for this access kind.
    #[inline]
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::EventIn | Self::ExposedField)
    }

    /// Whether eventOuts may be created for this access kind.
    #[inline]
    #[must_use]
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::EventOut | Self::ExposedField)
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EventIn => "eventIn",
            Self::EventOut => "eventOut",
            Self::ExposedField => "exposedField",
            Self::Field => "field",
        })
    }
}

/// Declaration of one field slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDeclaration {
    /// Field name as written in the scene.
    pub name: String,
    /// Declared value kind.
    pub kind: FieldKind,
    /// Declared access kind.
    pub access: AccessType,
}

impl FieldDeclaration {
    /// Creates a declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind, access: AccessType) -> Self {
        Self {
            name: name.into(),
            kind,
            access,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_is_closed() {
        for (code, kind) in FieldKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, code);
            assert_eq!(kind.default_value().kind(), *kind);
        }
    }

    #[test]
    fn test_multi_kinds() {
        assert!(!FieldKind::SfVec3f.is_multi());
        assert!(FieldKind::MfColor.is_multi());
        assert!(FieldKind::MfVec3f.is_multi());
        assert_eq!(FieldKind::MfRotation.element_width(), 4);
        assert_eq!(FieldKind::MfString.element_width(), 1);
    }

    #[test]
    fn test_access_rules() {
        assert!(AccessType::ExposedField.is_readable());
        assert!(AccessType::ExposedField.is_writable());
        assert!(!AccessType::EventIn.is_readable());
        assert!(!AccessType::EventOut.is_writable());
        assert!(!AccessType::Field.is_readable());
        assert!(!AccessType::Field.is_writable());
    }
}
