//! Property descriptors.
//!
//! A [`Property`] names one field of a domain type and carries the accessor
//! closures the mapper needs to read it into a [`Value`] and to write a decoded
//! value back. Descriptors are declared explicitly next to the table definition;
//! there is no runtime reflection.
//!
//! ```ignore
//! let col = Property::new("col", |p: &Parent| &p.col, |p: &mut Parent, v| p.col = v);
//! let pk = Property::optional("pk", |p: &Parent| &p.pk, |p: &mut Parent, v| p.pk = v);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::serializer::TypeSerializer;
use crate::value::Value;

type ReadFn = dyn Fn(&dyn Any, &TypeSerializer) -> Result<Value> + Send + Sync;
type WriteFn = dyn Fn(&mut dyn Any, Option<Box<dyn Any>>) -> Result<()> + Send + Sync;

/// Type-erased property of some owner type.
#[derive(Clone)]
pub struct PropertyDef {
    name: &'static str,
    owner: TypeId,
    owner_name: &'static str,
    domain: TypeId,
    domain_name: &'static str,
    nullable: bool,
    reader: Arc<ReadFn>,
    writer: Arc<WriteFn>,
}

impl PropertyDef {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn owner(&self) -> TypeId {
        self.owner
    }

    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Identity of the field's value type (`D` for both `D` and `Option<D>` fields).
    pub fn domain(&self) -> TypeId {
        self.domain
    }

    pub fn domain_name(&self) -> &'static str {
        self.domain_name
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Read the property of `owner` and encode it. Unset optional fields read as NULL.
    pub fn read(&self, owner: &dyn Any, serializer: &TypeSerializer) -> Result<Value> {
        (self.reader)(owner, serializer)
    }

    /// Store a decoded value into `owner`. `None` clears an optional field.
    pub fn write(&self, owner: &mut dyn Any, value: Option<Box<dyn Any>>) -> Result<()> {
        (self.writer)(owner, value)
    }
}

impl fmt::Debug for PropertyDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDef")
            .field("name", &self.name)
            .field("owner", &self.owner_name)
            .field("domain", &self.domain_name)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

/// Typed handle on a property of `T`.
pub struct Property<T> {
    def: PropertyDef,
    _owner: PhantomData<fn(T)>,
}

impl<T: Any> Property<T> {
    /// A required field of type `D`.
    pub fn new<D, G, S>(name: &'static str, get: G, set: S) -> Self
    where
        D: Any,
        G: Fn(&T) -> &D + Send + Sync + 'static,
        S: Fn(&mut T, D) + Send + Sync + 'static,
    {
        let reader = move |owner: &dyn Any, serializer: &TypeSerializer| -> Result<Value> {
            let owner = owner.downcast_ref::<T>().ok_or_else(|| wrong_owner::<T>(name))?;
            serializer.encode(name, get(owner))
        };
        let writer = move |owner: &mut dyn Any, value: Option<Box<dyn Any>>| -> Result<()> {
            let owner = owner.downcast_mut::<T>().ok_or_else(|| wrong_owner::<T>(name))?;
            let Some(value) = value else {
                return Err(Error::serializer(format!(
                    "property '{}.{name}' is not nullable",
                    std::any::type_name::<T>()
                )));
            };
            set(owner, downcast_value::<T, D>(name, value)?);
            Ok(())
        };
        Self::from_parts::<D>(name, false, Arc::new(reader), Arc::new(writer))
    }

    /// An `Option<D>` field. Unset reads as NULL and NULL decodes to `None`.
    pub fn optional<D, G, S>(name: &'static str, get: G, set: S) -> Self
    where
        D: Any,
        G: Fn(&T) -> &Option<D> + Send + Sync + 'static,
        S: Fn(&mut T, Option<D>) + Send + Sync + 'static,
    {
        let reader = move |owner: &dyn Any, serializer: &TypeSerializer| -> Result<Value> {
            let owner = owner.downcast_ref::<T>().ok_or_else(|| wrong_owner::<T>(name))?;
            match get(owner) {
                Some(value) => serializer.encode(name, value),
                None => Ok(Value::Null),
            }
        };
        let writer = move |owner: &mut dyn Any, value: Option<Box<dyn Any>>| -> Result<()> {
            let owner = owner.downcast_mut::<T>().ok_or_else(|| wrong_owner::<T>(name))?;
            let value = value.map(|v| downcast_value::<T, D>(name, v)).transpose()?;
            set(owner, value);
            Ok(())
        };
        Self::from_parts::<D>(name, true, Arc::new(reader), Arc::new(writer))
    }

    fn from_parts<D: Any>(
        name: &'static str,
        nullable: bool,
        reader: Arc<ReadFn>,
        writer: Arc<WriteFn>,
    ) -> Self {
        Self {
            def: PropertyDef {
                name,
                owner: TypeId::of::<T>(),
                owner_name: std::any::type_name::<T>(),
                domain: TypeId::of::<D>(),
                domain_name: std::any::type_name::<D>(),
                nullable,
                reader,
                writer,
            },
            _owner: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn def(&self) -> &PropertyDef {
        &self.def
    }

    pub fn into_def(self) -> PropertyDef {
        self.def
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            def: self.def.clone(),
            _owner: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.def.fmt(f)
    }
}

fn wrong_owner<T>(name: &str) -> Error {
    Error::lookup(format!(
        "property '{name}' belongs to {}, got a value of another type",
        std::any::type_name::<T>()
    ))
}

fn downcast_value<T, D: Any>(name: &str, value: Box<dyn Any>) -> Result<D> {
    value.downcast::<D>().map(|v| *v).map_err(|_| {
        Error::serializer(format!(
            "decoded value for '{}.{name}' is not a {}",
            std::any::type_name::<T>(),
            std::any::type_name::<D>()
        ))
    })
}

/// Declare a [`Property`] for a named struct field.
///
/// `property!(Parent, col)` for a required field, `property!(Parent, pk?)` for an
/// `Option` field.
#[macro_export]
macro_rules! property {
    ($owner:ty, $field:ident ?) => {
        $crate::field::Property::<$owner>::optional(
            stringify!($field),
            |o: &$owner| &o.$field,
            |o: &mut $owner, v| o.$field = v,
        )
    };
    ($owner:ty, $field:ident) => {
        $crate::field::Property::<$owner>::new(
            stringify!($field),
            |o: &$owner| &o.$field,
            |o: &mut $owner, v| o.$field = v,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::basic;

    #[derive(Debug, Default)]
    struct Parent {
        pk: Option<i32>,
        col: String,
    }

    #[test]
    fn test_required_property_roundtrip() {
        let col = Property::new("col", |p: &Parent| &p.col, |p: &mut Parent, v| p.col = v);
        let ser = basic::string(100);
        let mut parent = Parent {
            pk: None,
            col: "abc".into(),
        };
        assert_eq!(col.def().read(&parent, &ser).unwrap(), Value::Text("abc".into()));
        assert!(!col.def().nullable());

        col.def()
            .write(&mut parent, Some(Box::new("xyz".to_string())))
            .unwrap();
        assert_eq!(parent.col, "xyz");
        assert!(col.def().write(&mut parent, None).is_err());
    }

    #[test]
    fn test_optional_property_reads_null() {
        let pk = crate::property!(Parent, pk?);
        let ser = basic::i32();
        let mut parent = Parent::default();
        assert_eq!(pk.def().read(&parent, &ser).unwrap(), Value::Null);
        assert_eq!(pk.def().domain(), TypeId::of::<i32>());

        pk.def().write(&mut parent, Some(Box::new(9_i32))).unwrap();
        assert_eq!(parent.pk, Some(9));
        pk.def().write(&mut parent, None).unwrap();
        assert_eq!(parent.pk, None);
    }

    #[test]
    fn test_wrong_owner_is_lookup_error() {
        let col = crate::property!(Parent, col);
        let err = col.def().read(&5_u8, &basic::string(100)).unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        let pk = crate::property!(Parent, pk?);
        let mut parent = Parent::default();
        let err = pk.def().write(&mut parent, Some(Box::new("x"))).unwrap_err();
        assert!(matches!(err, Error::Serializer { .. }));
    }
}
