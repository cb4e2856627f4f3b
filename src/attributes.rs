// glspace/src/attributes.rs
//
//! Framebuffer attributes, templates and concrete attribute sets.
//!
//! A `Template` holds an optional value per attribute: a minimum (or, for boolean attributes, an
//! exact) request, or "don't care". A `ConfigAttributes` holds a definite value per attribute, as
//! reported by the platform for one real configuration.

use crate::info::{ContextAttributes, ContextAttributeFlags, GLVersion};

use bitflags::bitflags;
use std::fmt::{self, Display, Formatter};

/// The buffer level of every configuration. Overlay and underlay levels are unsupported.
pub const LEVEL: i32 = 0;

/// The color mode of every configuration.
pub const COLOR_MODE: ColorMode = ColorMode::Component;

/// How color values are stored in the color buffer.
///
/// Palette-indexed buffers are unsupported, so there is only one mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// Red, green, blue and alpha components.
    Component,
}

/// How a requested attribute value is compared against a candidate configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// "More is better": the candidate must provide at least the requested value.
    Ranked,
    /// The candidate must provide exactly the requested value.
    Exact,
}

pub(crate) trait AttributeValue: Copy {
    fn into_raw(self) -> u32;
    fn from_raw(raw: u32) -> Self;
}

impl AttributeValue for u32 {
    #[inline]
    fn into_raw(self) -> u32 {
        self
    }
    #[inline]
    fn from_raw(raw: u32) -> u32 {
        raw
    }
}

impl AttributeValue for bool {
    #[inline]
    fn into_raw(self) -> u32 {
        self as u32
    }
    #[inline]
    fn from_raw(raw: u32) -> bool {
        raw != 0
    }
}

macro_rules! declare_attributes {
    ($(
        $(#[$doc:meta])*
        $variant:ident, $field:ident: $ty:ty, $kind:ident, $flag:ident = $bit:expr;
    )*) => {
        /// A framebuffer attribute identifier.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Attribute {
            $($(#[$doc])* $variant,)*
        }

        impl Attribute {
            /// Every recognized attribute, in declaration order.
            pub const ALL: &'static [Attribute] = &[$(Attribute::$variant,)*];

            /// The lowercase name of this attribute, e.g. `depth_size`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Attribute::$variant => stringify!($field),)*
                }
            }

            /// How requests for this attribute are matched.
            pub fn kind(self) -> AttributeKind {
                match self {
                    $(Attribute::$variant => AttributeKind::$kind,)*
                }
            }

            /// The single-bit mask for this attribute.
            pub fn mask(self) -> AttributeMask {
                match self {
                    $(Attribute::$variant => AttributeMask::$flag,)*
                }
            }
        }

        bitflags! {
            /// A set of attributes, e.g. the attributes a template requests.
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
            pub struct AttributeMask: u32 {
                $(const $flag = 1 << $bit;)*
            }
        }

        /// A partially-specified set of desired framebuffer attributes.
        ///
        /// Every field is either a request or `None` ("don't care"). Ranked attributes are
        /// minimums; `stereo` and `double_buffer` must match exactly. A template is only ever
        /// matched against a catalog; contexts are created from the resulting `Config`.
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct Template {
            $($(#[$doc])* pub $field: Option<$ty>,)*
            /// Context-creation attributes copied onto every config resolved from this template.
            pub context: ContextAttributes,
        }

        /// A fully-specified set of framebuffer attributes reported by a platform for one real
        /// configuration.
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct ConfigAttributes {
            $($(#[$doc])* pub $field: $ty,)*
        }

        impl Template {
            /// Returns the requested value of an attribute, with booleans as `0` or `1`.
            pub fn get(&self, attribute: Attribute) -> Option<u32> {
                match attribute {
                    $(Attribute::$variant => self.$field.map(<$ty as AttributeValue>::into_raw),)*
                }
            }

            /// Requests a value for an attribute, or clears the request with `None`.
            ///
            /// For boolean attributes any nonzero value means `true`.
            pub fn set(&mut self, attribute: Attribute, value: Option<u32>) {
                match attribute {
                    $(Attribute::$variant => {
                        self.$field = value.map(<$ty as AttributeValue>::from_raw)
                    })*
                }
            }
        }

        impl ConfigAttributes {
            /// Returns the value of an attribute, with booleans as `0` or `1`.
            pub fn get(&self, attribute: Attribute) -> u32 {
                match attribute {
                    $(Attribute::$variant => <$ty as AttributeValue>::into_raw(self.$field),)*
                }
            }

            /// Sets the value of an attribute. For boolean attributes any nonzero value means
            /// `true`.
            pub fn set(&mut self, attribute: Attribute, value: u32) {
                match attribute {
                    $(Attribute::$variant => {
                        self.$field = <$ty as AttributeValue>::from_raw(value)
                    })*
                }
            }
        }
    };
}

declare_attributes! {
    /// Total bits in the color buffer.
    BufferSize, buffer_size: u32, Ranked, BUFFER_SIZE = 0;
    /// Bits of red in the color buffer.
    RedSize, red_size: u32, Ranked, RED_SIZE = 1;
    /// Bits of green in the color buffer.
    GreenSize, green_size: u32, Ranked, GREEN_SIZE = 2;
    /// Bits of blue in the color buffer.
    BlueSize, blue_size: u32, Ranked, BLUE_SIZE = 3;
    /// Bits of alpha in the color buffer.
    AlphaSize, alpha_size: u32, Ranked, ALPHA_SIZE = 4;
    /// Number of multisample buffers.
    SampleBuffers, sample_buffers: u32, Ranked, SAMPLE_BUFFERS = 5;
    /// Number of samples per pixel in the multisample buffer.
    Samples, samples: u32, Ranked, SAMPLES = 6;
    /// Whether left and right stereo buffers are present.
    Stereo, stereo: bool, Exact, STEREO = 7;
    /// Whether front and back buffers are present.
    DoubleBuffer, double_buffer: bool, Exact, DOUBLE_BUFFER = 8;
    /// Bits in the depth buffer.
    DepthSize, depth_size: u32, Ranked, DEPTH_SIZE = 9;
    /// Bits in the stencil buffer.
    StencilSize, stencil_size: u32, Ranked, STENCIL_SIZE = 10;
    /// Bits of red in the accumulation buffer.
    AccumRedSize, accum_red_size: u32, Ranked, ACCUM_RED_SIZE = 11;
    /// Bits of green in the accumulation buffer.
    AccumGreenSize, accum_green_size: u32, Ranked, ACCUM_GREEN_SIZE = 12;
    /// Bits of blue in the accumulation buffer.
    AccumBlueSize, accum_blue_size: u32, Ranked, ACCUM_BLUE_SIZE = 13;
    /// Bits of alpha in the accumulation buffer.
    AccumAlphaSize, accum_alpha_size: u32, Ranked, ACCUM_ALPHA_SIZE = 14;
    /// Number of auxiliary color buffers.
    AuxBuffers, aux_buffers: u32, Ranked, AUX_BUFFERS = 15;
}

impl Attribute {
    /// Returns true for the buffers beyond the color buffer: depth, stencil, accumulation,
    /// auxiliary and multisample buffers.
    pub fn is_ancillary(self) -> bool {
        !matches!(
            self,
            Attribute::BufferSize
                | Attribute::RedSize
                | Attribute::GreenSize
                | Attribute::BlueSize
                | Attribute::AlphaSize
                | Attribute::Stereo
                | Attribute::DoubleBuffer
        )
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Template {
    /// Creates a template with every attribute unset.
    ///
    /// An empty template matches every configuration.
    #[inline]
    pub fn new() -> Template {
        Template::default()
    }

    /// The template used when a window is created without one: a double-buffered
    /// configuration with at least 24 bits of depth.
    pub fn window_default() -> Template {
        Template {
            double_buffer: Some(true),
            depth_size: Some(24),
            ..Template::default()
        }
    }

    /// Returns a copy of this template with the given attribute requested.
    #[inline]
    pub fn with(mut self, attribute: Attribute, value: u32) -> Template {
        self.set(attribute, Some(value));
        self
    }

    /// Returns a copy of this template requesting the given GL version.
    #[inline]
    pub fn with_context_version(mut self, version: GLVersion) -> Template {
        self.context.version = Some(version);
        self
    }

    /// Returns a copy of this template requesting the given context-creation flags.
    #[inline]
    pub fn with_context_flags(mut self, flags: ContextAttributeFlags) -> Template {
        self.context.flags = flags;
        self
    }

    /// The set of attributes this template requests.
    pub fn requested(&self) -> AttributeMask {
        self.requests()
            .fold(AttributeMask::empty(), |mask, (attribute, _)| mask | attribute.mask())
    }

    /// Returns true if no attribute is requested.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requested().is_empty()
    }

    /// Iterates over the requested attributes and their values.
    pub fn requests(&self) -> impl Iterator<Item = (Attribute, u32)> + '_ {
        Attribute::ALL
            .iter()
            .filter_map(move |&attribute| self.get(attribute).map(|value| (attribute, value)))
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Template(")?;
        for (index, (attribute, value)) in self.requests().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", attribute, value)?;
        }
        f.write_str(")")
    }
}

impl ConfigAttributes {
    /// Iterates over every attribute and its value.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, u32)> + '_ {
        Attribute::ALL.iter().map(move |&attribute| (attribute, self.get(attribute)))
    }

    /// Returns a template requesting exactly these values.
    ///
    /// The resulting template matches this configuration and any configuration at least as
    /// capable.
    pub fn to_template(&self) -> Template {
        self.iter()
            .fold(Template::new(), |template, (attribute, value)| template.with(attribute, value))
    }
}

impl Display for ConfigAttributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, (attribute, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", attribute, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_get_set() {
        let mut template = Template::new();
        assert!(template.is_empty());

        template.set(Attribute::DepthSize, Some(24));
        template.set(Attribute::Stereo, Some(1));
        assert_eq!(template.depth_size, Some(24));
        assert_eq!(template.stereo, Some(true));
        assert_eq!(template.get(Attribute::Stereo), Some(1));
        assert_eq!(template.requested(), AttributeMask::DEPTH_SIZE | AttributeMask::STEREO);

        template.set(Attribute::DepthSize, None);
        assert_eq!(template.requested(), AttributeMask::STEREO);
    }

    #[test]
    fn test_window_default() {
        let template = Template::window_default();
        let requests: Vec<_> = template.requests().collect();
        assert_eq!(requests, vec![(Attribute::DoubleBuffer, 1), (Attribute::DepthSize, 24)]);
        assert!(template.context.is_legacy());
    }

    #[test]
    fn test_attribute_kinds() {
        for &attribute in Attribute::ALL {
            let expected = match attribute {
                Attribute::Stereo | Attribute::DoubleBuffer => AttributeKind::Exact,
                _ => AttributeKind::Ranked,
            };
            assert_eq!(attribute.kind(), expected, "{}", attribute);
        }
        assert_eq!(AttributeMask::all().bits().count_ones() as usize, Attribute::ALL.len());
    }

    #[test]
    fn test_config_attributes_to_template() {
        let attributes = ConfigAttributes {
            buffer_size: 32,
            red_size: 8,
            double_buffer: true,
            depth_size: 16,
            ..ConfigAttributes::default()
        };
        let template = attributes.to_template();
        assert_eq!(template.requested(), AttributeMask::all());
        assert_eq!(template.double_buffer, Some(true));
        assert_eq!(template.stereo, Some(false));
        assert_eq!(template.depth_size, Some(16));
        assert_eq!(
            attributes.to_string().split(' ').next(),
            Some("buffer_size=32"),
        );
    }
}
