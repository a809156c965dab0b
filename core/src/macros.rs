/// Implements a basic `Debug` trait for types using their type name.
///
/// Used for types whose fields hold closures or other unprintable values.
#[macro_export]
macro_rules! impl_debug {
    ($ty:ty) => {
        impl core::fmt::Debug for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(core::any::type_name::<Self>())
            }
        }
    };
}

/// Builds a prop map for [`ComponentType::create`](crate::ComponentType::create).
///
/// # Usage
///
/// ```
/// use estuary_core::props;
///
/// let props = props! { "title" => "hello", "count" => 3 };
/// assert_eq!(props.len(), 2);
/// ```
#[macro_export]
macro_rules! props {
    () => {
        ::std::collections::BTreeMap::new()
    };
    ($($key:literal => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::new();
        $(map.insert($key.to_owned(), $crate::Value::from($value));)+
        map
    }};
}
