//! # Field Values
//!
//! Tagged union over every field kind, plus single-element access for the
//! multi-value kinds.
//!
//! ## Storage Reuse
//!
//! Values are copied on the hot path (snapshot buffers, queued input
//! events). [`FieldValue::assign_from`] copies into the existing backing
//! storage when both sides have the same kind, so a recycled buffer does not
//! reallocate when the element count is unchanged.

use crate::error::{FieldError, FieldResult};
use crate::field::FieldKind;
use crate::node::NodeHandle;

/// An SFImage value: dimensions plus one packed integer per pixel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SfImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Components per pixel (1-4).
    pub components: u32,
    /// Packed pixel values, `width * height` entries.
    pub pixels: Vec<i32>,
}

/// A complete field value of any kind.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// SFBool value.
    SfBool(bool),
    /// SFColor value.
    SfColor([f32; 3]),
    /// SFFloat value.
    SfFloat(f32),
    /// SFImage value.
    SfImage(SfImage),
    /// SFInt32 value.
    SfInt32(i32),
    /// SFNode value; `None` is the NULL node.
    SfNode(Option<NodeHandle>),
    /// SFRotation value (axis x, y, z, angle).
    SfRotation([f32; 4]),
    /// SFString value.
    SfString(String),
    /// SFTime value.
    SfTime(f64),
    /// SFVec2f value.
    SfVec2f([f32; 2]),
    /// SFVec3f value.
    SfVec3f([f32; 3]),
    /// MFColor value.
    MfColor(Vec<[f32; 3]>),
    /// MFFloat value.
    MfFloat(Vec<f32>),
    /// MFInt32 value.
    MfInt32(Vec<i32>),
    /// MFNode value.
    MfNode(Vec<NodeHandle>),
    /// MFRotation value.
    MfRotation(Vec<[f32; 4]>),
    /// MFString value.
    MfString(Vec<String>),
    /// MFTime value.
    MfTime(Vec<f64>),
    /// MFVec2f value.
    MfVec2f(Vec<[f32; 2]>),
    /// MFVec3f value.
    MfVec3f(Vec<[f32; 3]>),
}

/// One element of a multi-value field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldElement {
    /// Boolean element.
    Bool(bool),
    /// RGB colour element.
    Color([f32; 3]),
    /// Float element.
    Float(f32),
    /// Integer element.
    Int32(i32),
    /// Node element.
    Node(NodeHandle),
    /// Rotation element.
    Rotation([f32; 4]),
    /// String element.
    String(String),
    /// Time element.
    Time(f64),
    /// 2D vector element.
    Vec2f([f32; 2]),
    /// 3D vector element.
    Vec3f([f32; 3]),
}

impl FieldElement {
    /// The single-value kind matching this element.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::SfBool,
            Self::Color(_) => FieldKind::SfColor,
            Self::Float(_) => FieldKind::SfFloat,
            Self::Int32(_) => FieldKind::SfInt32,
            Self::Node(_) => FieldKind::SfNode,
            Self::Rotation(_) => FieldKind::SfRotation,
            Self::String(_) => FieldKind::SfString,
            Self::Time(_) => FieldKind::SfTime,
            Self::Vec2f(_) => FieldKind::SfVec2f,
            Self::Vec3f(_) => FieldKind::SfVec3f,
        }
    }
}

/// Runs `$body` against the vector of a multi-value variant.
///
/// Inside the body `$wrap` turns one stored item into a [`FieldElement`] and
/// `$unwrap` takes a [`FieldElement`] apart again (returning it unchanged on
/// a type mismatch). Single-value variants evaluate `$single`.
macro_rules! mf_dispatch {
    ($value:expr, |$vec:ident, $wrap:ident, $unwrap:ident| $body:expr, $single:expr) => {
        match $value {
            FieldValue::MfColor($vec) => mf_dispatch!(@arm Color, $wrap, $unwrap, $body),
            FieldValue::MfFloat($vec) => mf_dispatch!(@arm Float, $wrap, $unwrap, $body),
            FieldValue::MfInt32($vec) => mf_dispatch!(@arm Int32, $wrap, $unwrap, $body),
            FieldValue::MfNode($vec) => mf_dispatch!(@arm Node, $wrap, $unwrap, $body),
            FieldValue::MfRotation($vec) => mf_dispatch!(@arm Rotation, $wrap, $unwrap, $body),
            FieldValue::MfString($vec) => mf_dispatch!(@arm String, $wrap, $unwrap, $body),
            FieldValue::MfTime($vec) => mf_dispatch!(@arm Time, $wrap, $unwrap, $body),
            FieldValue::MfVec2f($vec) => mf_dispatch!(@arm Vec2f, $wrap, $unwrap, $body),
            FieldValue::MfVec3f($vec) => mf_dispatch!(@arm Vec3f, $wrap, $unwrap, $body),
            _ => $single,
        }
    };
    (@arm $elem:ident, $wrap:ident, $unwrap:ident, $body:expr) => {{
        #[allow(unused_variables)]
        let $wrap = FieldElement::$elem;
        #[allow(unused_variables)]
        let $unwrap = |element: FieldElement| match element {
            FieldElement::$elem(inner) => Ok(inner),
            other => Err(other),
        };
        $body
    }};
}

impl FieldValue {
    /// The kind tag of this value.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::SfBool(_) => FieldKind::SfBool,
            Self::SfColor(_) => FieldKind::SfColor,
            Self::SfFloat(_) => FieldKind::SfFloat,
            Self::SfImage(_) => FieldKind::SfImage,
            Self::SfInt32(_) => FieldKind::SfInt32,
            Self::SfNode(_) => FieldKind::SfNode,
            Self::SfRotation(_) => FieldKind::SfRotation,
            Self::SfString(_) => FieldKind::SfString,
            Self::SfTime(_) => FieldKind::SfTime,
            Self::SfVec2f(_) => FieldKind::SfVec2f,
            Self::SfVec3f(_) => FieldKind::SfVec3f,
            Self::MfColor(_) => FieldKind::MfColor,
            Self::MfFloat(_) => FieldKind::MfFloat,
            Self::MfInt32(_) => FieldKind::MfInt32,
            Self::MfNode(_) => FieldKind::MfNode,
            Self::MfRotation(_) => FieldKind::MfRotation,
            Self::MfString(_) => FieldKind::MfString,
            Self::MfTime(_) => FieldKind::MfTime,
            Self::MfVec2f(_) => FieldKind::MfVec2f,
            Self::MfVec3f(_) => FieldKind::MfVec3f,
        }
    }

    /// Number of elements. Single-value kinds always report 1.
    #[must_use]
    pub fn len(&self) -> usize {
        mf_dispatch!(self, |vec, wrap, unwrap| vec.len(), 1)
    }

    /// Returns true for an empty multi-value field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads one element of a multi-value field.
    ///
    /// # Errors
    ///
    /// `NotMultiValued` for SF kinds, `IndexOutOfBounds` past the end.
    pub fn get1(&self, index: usize) -> FieldResult<FieldElement> {
        let kind = self.kind();
        mf_dispatch!(
            self,
            |vec, wrap, unwrap| vec
                .get(index)
                .cloned()
                .map(wrap)
                .ok_or(FieldError::IndexOutOfBounds {
                    index,
                    size: vec.len(),
                }),
            Err(FieldError::NotMultiValued(kind))
        )
    }

    /// Overwrites one element of a multi-value field.
    ///
    /// # Errors
    ///
    /// `NotMultiValued`, `IndexOutOfBounds` or `ElementMismatch`. The value
    /// is untouched on error.
    pub fn set1(&mut self, index: usize, element: FieldElement) -> FieldResult<()> {
        let kind = self.kind();
        mf_dispatch!(
            self,
            |vec, wrap, unwrap| {
                let size = vec.len();
                let slot = vec
                    .get_mut(index)
                    .ok_or(FieldError::IndexOutOfBounds { index, size })?;
                *slot = unwrap(element).map_err(|other| FieldError::ElementMismatch {
                    expected: kind,
                    found: other.kind().name(),
                })?;
                Ok(())
            },
            Err(FieldError::NotMultiValued(kind))
        )
    }

    /// Inserts an element before `index` (`index == len` appends).
    ///
    /// # Errors
    ///
    /// `NotMultiValued`, `IndexOutOfBounds` or `ElementMismatch`.
    pub fn insert(&mut self, index: usize, element: FieldElement) -> FieldResult<()> {
        let kind = self.kind();
        mf_dispatch!(
            self,
            |vec, wrap, unwrap| {
                if index > vec.len() {
                    return Err(FieldError::IndexOutOfBounds {
                        index,
                        size: vec.len(),
                    });
                }
                let inner = unwrap(element).map_err(|other| FieldError::ElementMismatch {
                    expected: kind,
                    found: other.kind().name(),
                })?;
                vec.insert(index, inner);
                Ok(())
            },
            Err(FieldError::NotMultiValued(kind))
        )
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// `NotMultiValued` or `ElementMismatch`.
    pub fn push(&mut self, element: FieldElement) -> FieldResult<()> {
        let index = self.len();
        if !self.kind().is_multi() {
            return Err(FieldError::NotMultiValued(self.kind()));
        }
        self.insert(index, element)
    }

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// `NotMultiValued` or `IndexOutOfBounds`.
    pub fn remove(&mut self, index: usize) -> FieldResult<FieldElement> {
        let kind = self.kind();
        mf_dispatch!(
            self,
            |vec, wrap, unwrap| {
                if index >= vec.len() {
                    return Err(FieldError::IndexOutOfBounds {
                        index,
                        size: vec.len(),
                    });
                }
                Ok(wrap(vec.remove(index)))
            },
            Err(FieldError::NotMultiValued(kind))
        )
    }

    /// Copies `source` into `self`, reusing existing storage when the kinds
    /// match.
    pub fn assign_from(&mut self, source: &Self) {
        match (&mut *self, source) {
            (Self::SfString(dst), Self::SfString(src)) => dst.clone_from(src),
            (Self::SfImage(dst), Self::SfImage(src)) => {
                dst.width = src.width;
                dst.height = src.height;
                dst.components = src.components;
                dst.pixels.clone_from(&src.pixels);
            }
            (Self::MfColor(dst), Self::MfColor(src)) => dst.clone_from(src),
            (Self::MfFloat(dst), Self::MfFloat(src)) => dst.clone_from(src),
            (Self::MfInt32(dst), Self::MfInt32(src)) => dst.clone_from(src),
            (Self::MfNode(dst), Self::MfNode(src)) => dst.clone_from(src),
            (Self::MfRotation(dst), Self::MfRotation(src)) => dst.clone_from(src),
            (Self::MfString(dst), Self::MfString(src)) => dst.clone_from(src),
            (Self::MfTime(dst), Self::MfTime(src)) => dst.clone_from(src),
            (Self::MfVec2f(dst), Self::MfVec2f(src)) => dst.clone_from(src),
            (Self::MfVec3f(dst), Self::MfVec3f(src)) => dst.clone_from(src),
            (dst, src) => *dst = src.clone(),
        }
    }

    /// Drops node references and array contents.
    ///
    /// Numeric array storage up to `max_retained` elements keeps its
    /// capacity for the next load; anything larger is released.
    pub fn release(&mut self, max_retained: usize) {
        match self {
            Self::SfNode(node) => *node = None,
            Self::MfNode(nodes) => *nodes = Vec::new(),
            Self::SfString(text) => text.clear(),
            Self::SfImage(image) => trim(&mut image.pixels, max_retained),
            Self::MfColor(vec) => trim(vec, max_retained),
            Self::MfFloat(vec) => trim(vec, max_retained),
            Self::MfInt32(vec) => trim(vec, max_retained),
            Self::MfRotation(vec) => trim(vec, max_retained),
            Self::MfString(vec) => trim(vec, max_retained),
            Self::MfTime(vec) => trim(vec, max_retained),
            Self::MfVec2f(vec) => trim(vec, max_retained),
            Self::MfVec3f(vec) => trim(vec, max_retained),
            _ => {}
        }
    }

    /// Capacity of the backing array, 0 for single-value kinds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            Self::SfImage(image) => image.pixels.capacity(),
            other => mf_dispatch!(other, |vec, wrap, unwrap| vec.capacity(), 0),
        }
    }
}

fn trim<T>(vec: &mut Vec<T>, max_retained: usize) {
    vec.clear();
    if vec.capacity() > max_retained {
        vec.shrink_to(max_retained);
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::SfBool(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::SfFloat(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::SfInt32(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::SfTime(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::SfString(value.to_owned())
    }
}

impl From<Vec<f32>> for FieldValue {
    fn from(value: Vec<f32>) -> Self {
        Self::MfFloat(value)
    }
}

impl From<Vec<i32>> for FieldValue {
    fn from(value: Vec<i32>) -> Self {
        Self::MfInt32(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::MfString(value)
    }
}

impl From<bool> for FieldElement {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for FieldElement {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for FieldElement {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<f64> for FieldElement {
    fn from(value: f64) -> Self {
        Self::Time(value)
    }
}

impl From<&str> for FieldElement {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<NodeHandle> for FieldElement {
    fn from(value: NodeHandle) -> Self {
        Self::Node(value)
    }
}
