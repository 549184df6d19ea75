//! Enum types for the opsdesk system.
//!
//! Each enum has:
//! - Custom Serialize (as the wire string)
//! - Custom Deserialize (known variants + catch-all variant carrying the original tag)
//! - `as_str()`, `is_default()`, `Display` impl

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Macro: defines an enum with known string variants + a catch-all fallback.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, custom_variant = $custom_variant:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            $custom_variant(String),
        }

        impl $name {
            /// Returns the string representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $str, )+
                    Self::$custom_variant(s) => s.as_str(),
                }
            }

            /// Returns `true` if this is the default variant.
            pub fn is_default(&self) -> bool {
                *self == Self::$default
            }

            /// Returns `true` if this is a built-in (non-fallback) variant.
            pub fn is_builtin(&self) -> bool {
                !matches!(self, Self::$custom_variant(_))
            }

            /// Returns `true` if this is a known variant or any non-empty fallback string.
            pub fn is_valid(&self) -> bool {
                match self {
                    Self::$custom_variant(s) => !s.is_empty(),
                    _ => true,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s.as_str()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $( $str => Self::$variant, )+
                    other => Self::$custom_variant(other.to_owned()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                // Check known variants first to avoid allocation in common case.
                match s.as_str() {
                    $( $str => Self::$variant, )+
                    _ => Self::$custom_variant(s),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// ComponentType
// ---------------------------------------------------------------------------

define_enum! {
    /// Type tag of a form component node.
    ///
    /// The set is closed: any tag the interpreter does not know lands in
    /// [`ComponentType::Unsupported`] with the original string, so a form with
    /// an unfamiliar node still loads and renders a placeholder for it.
    ComponentType, default = Textfield, custom_variant = Unsupported,
    variants: [
        (Text, "text"),
        (Textfield, "textfield"),
        (Textarea, "textarea"),
        (Checkbox, "checkbox"),
        (Number, "number"),
        (Datetime, "datetime"),
        (Expression, "expression"),
        (Checklist, "checklist"),
        (Radio, "radio"),
        (Select, "select"),
        (Taglist, "taglist"),
        (Filepicker, "filepicker"),
        (Group, "group"),
    ]
}

impl ComponentType {
    /// Returns `true` for components whose value is picked from an option list.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            Self::Checklist | Self::Radio | Self::Select | Self::Taglist
        )
    }

    /// Returns `true` for choice components that hold several selected values.
    pub fn is_multi_choice(&self) -> bool {
        matches!(self, Self::Checklist | Self::Taglist)
    }

    /// Returns `true` for nodes that never bind a value (pure presentation).
    pub fn is_presentational(&self) -> bool {
        matches!(self, Self::Text)
    }
}

// ---------------------------------------------------------------------------
// DateSubtype
// ---------------------------------------------------------------------------

define_enum! {
    /// Subtype of a `datetime` component.
    DateSubtype, default = Date, custom_variant = Other,
    variants: [
        (Date, "date"),
        (Datetime, "datetime"),
        (Time, "time"),
    ]
}

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

define_enum! {
    /// Kind of a locally stored task.
    TaskKind, default = Any, custom_variant = Custom,
    variants: [
        (Any, "any"),
        (Freight, "freight"),
        (UploadReport, "subirReporteMovimientos"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_known_tags() {
        assert_eq!(ComponentType::from("select"), ComponentType::Select);
        assert_eq!(ComponentType::from("group"), ComponentType::Group);
        assert!(ComponentType::Select.is_choice());
        assert!(!ComponentType::Textfield.is_choice());
        assert!(ComponentType::Taglist.is_multi_choice());
    }

    #[test]
    fn component_type_unknown_tag_is_kept() {
        let t = ComponentType::from("totally-unknown");
        assert_eq!(t, ComponentType::Unsupported("totally-unknown".into()));
        assert_eq!(t.as_str(), "totally-unknown");
        assert!(!t.is_builtin());
    }

    #[test]
    fn component_type_serde_roundtrip() {
        let t: ComponentType = serde_json::from_str("\"dynamiclist\"").unwrap();
        assert_eq!(t, ComponentType::Unsupported("dynamiclist".into()));
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"dynamiclist\"");
    }

    #[test]
    fn date_subtype_default() {
        assert_eq!(DateSubtype::default(), DateSubtype::Date);
        assert_eq!(DateSubtype::from("time"), DateSubtype::Time);
    }

    #[test]
    fn task_kind_validity() {
        assert!(TaskKind::from("freight").is_builtin());
        assert!(TaskKind::Custom("nomina".into()).is_valid());
        assert!(!TaskKind::Custom(String::new()).is_valid());
        assert_eq!(TaskKind::UploadReport.to_string(), "subirReporteMovimientos");
    }
}
