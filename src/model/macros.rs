/// Declares a value object with optional fields and consuming setters.
///
/// `resource Name = "Kind" { .. }` also adds the flattened [`ObjectMeta`]
/// (kind, id, href) and implements [`Resource`]. `value Name { .. }` declares a
/// plain nested value without identity.
///
/// [`ObjectMeta`]: crate::model::ObjectMeta
/// [`Resource`]: crate::model::Resource
macro_rules! model {
    (
        $(#[$attr:meta])*
        resource $name:ident = $kind:literal {
            $( $(#[$field_attr:meta])* $field:ident : $ty:ty, )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub meta: $crate::model::ObjectMeta,
            $(
                $(#[$field_attr])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    meta: $crate::model::ObjectMeta::with_kind($kind),
                    ..Default::default()
                }
            }

            pub fn id(mut self, value: impl Into<String>) -> Self {
                self.meta.id = Some(value.into());
                self
            }

            pub fn href(mut self, value: impl Into<String>) -> Self {
                self.meta.href = Some(value.into());
                self
            }

            /// Marks the object as a link (`true`) or a complete object (`false`).
            pub fn link(mut self, value: bool) -> Self {
                let kind = if value {
                    <Self as $crate::model::Resource>::LINK_KIND
                } else {
                    <Self as $crate::model::Resource>::KIND
                };
                self.meta.kind = Some(kind.to_string());
                self
            }

            $(
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.$field = Some(value.into());
                    self
                }
            )*
        }

        impl $crate::model::Resource for $name {
            const KIND: &'static str = $kind;
            const LINK_KIND: &'static str = concat!($kind, "Link");

            fn meta(&self) -> &$crate::model::ObjectMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut $crate::model::ObjectMeta {
                &mut self.meta
            }
        }
    };

    (
        $(#[$attr:meta])*
        value $name:ident {
            $( $(#[$field_attr:meta])* $field:ident : $ty:ty, )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $name {
            $(
                $(#[$field_attr])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.$field = Some(value.into());
                    self
                }
            )*
        }
    };
}
