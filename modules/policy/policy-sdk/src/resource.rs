//! Resource naming used for policy resolution.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

/// Something a policy authorizes against.
///
/// The resource type name drives policy resolution: a resource named `Post`
/// resolves to the `PostPolicy` definition unless the registry says
/// otherwise. The name defaults to the short Rust type name; collection and
/// query objects report the record type they wrap through
/// [`Resource::model_name`].
///
/// `Display` is used in failure messages (`"guest is not authorized to
/// update Post#42"`).
pub trait Resource: AsAny + Send + Sync + fmt::Display {
    /// Queryable model name for collection-like resources.
    fn model_name(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Short (unqualified) type name of this resource.
    fn type_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(short_type_name::<Self>())
    }
}

/// Upcast to `Any` so policies can downcast a `&dyn Resource`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Unqualified type name without module path or generic arguments.
///
/// `app::models::Post` → `Post`, `app::Page<app::Post>` → `Page`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Resource type name used to look up a policy.
///
/// The model name wins over the runtime type name.
#[must_use]
pub fn resource_type_name(resource: &dyn Resource) -> String {
    resource
        .model_name()
        .unwrap_or_else(|| resource.type_name())
        .into_owned()
}

/// A resource type itself rather than an instance of it.
///
/// Used for checks that have no instance yet, such as `create` or `index`.
pub struct ResourceClass<T>(PhantomData<fn() -> T>);

impl<T> ResourceClass<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ResourceClass<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ResourceClass<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceClass<T> {}

impl<T> fmt::Debug for ResourceClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceClass")
            .field(&short_type_name::<T>())
            .finish()
    }
}

impl<T> fmt::Display for ResourceClass<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(short_type_name::<T>())
    }
}

impl<T: 'static> Resource for ResourceClass<T> {
    fn type_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(short_type_name::<T>())
    }
}

/// A collection of records of one type, resolved by the record type name.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Collection<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> fmt::Display for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", short_type_name::<T>(), self.items.len())
    }
}

impl<T: Send + Sync + 'static> Resource for Collection<T> {
    fn model_name(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(short_type_name::<T>()))
    }
}
