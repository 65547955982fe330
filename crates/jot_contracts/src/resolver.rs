use core::fmt;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::contract::{
    ArrayContract, Contract, ContractKind, MapContract, ObjectContract, OptContract, Property,
    SharedContract,
};
use crate::naming::{IdentityNaming, NamingStrategy};
use crate::shape::{ObjectShape, Shape};

// -----------------------------------------------------------------------------
// ContractResolver

/// Produces [`Contract`]s from shapes.
///
/// Resolution is memoized per resolver instance: the same resolver returns
/// the identical `Arc` for repeat resolves of one type, while two resolvers
/// (say, with different naming strategies) hold fully independent
/// contracts.
pub trait ContractResolver: Send + Sync {
    fn resolve(&self, shape: &'static Shape) -> Result<Arc<Contract>, ResolveError>;
}

// -----------------------------------------------------------------------------
// DefaultContractResolver

/// The standard resolver: a naming strategy plus a concurrent cache.
///
/// The cache publishes at most one contract per type. Two threads may race
/// to build the same contract; the loser's copy is dropped, which is
/// harmless because contracts are pure functions of shape and strategy.
pub struct DefaultContractResolver {
    naming: Arc<dyn NamingStrategy>,
    cache: DashMap<TypeId, Arc<Contract>>,
}

impl Default for DefaultContractResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultContractResolver {
    /// A resolver that keeps declared names as wire names.
    pub fn new() -> Self {
        Self::with_naming(Arc::new(IdentityNaming))
    }

    pub fn with_naming(naming: Arc<dyn NamingStrategy>) -> Self {
        Self {
            naming,
            cache: DashMap::new(),
        }
    }

    fn build(&self, shape: &'static Shape) -> Result<Contract, ResolveError> {
        let kind = match shape {
            Shape::Object(object) => ContractKind::Object(self.build_object(object)?),
            Shape::Array(array) => ContractKind::Array(ArrayContract {
                item: array.item_fn(),
            }),
            Shape::Map(map) => ContractKind::Map(MapContract {
                value: map.value_fn(),
            }),
            Shape::Opt(opt) => ContractKind::Opt(OptContract {
                inner: opt.inner_fn(),
            }),
            Shape::Scalar(scalar) => ContractKind::Primitive(scalar.kind()),
            Shape::Shared(shared) => ContractKind::Shared(SharedContract {
                inner: shared.inner_fn(),
                tracked: shared.tracked(),
            }),
            Shape::Dynamic(_) => ContractKind::Dynamic,
        };
        Ok(Contract::new(shape, kind))
    }

    fn build_object(&self, shape: &'static ObjectShape) -> Result<ObjectContract, ResolveError> {
        let type_path = shape.ty().path();

        let mut properties: Vec<Property> = Vec::with_capacity(shape.fields().len());
        for field in shape.fields() {
            let attrs = field.attrs();
            let name = match attrs.rename {
                Some(rename) => rename.to_owned(),
                None => self.naming.apply(field.name()),
            };
            properties.push(Property {
                declared: field.name(),
                name,
                required: attrs.required,
                ignored: attrs.ignore,
                order: attrs.order,
                shape: field.shape_fn(),
                null_handling: attrs.null_handling,
                loop_handling: attrs.loop_handling,
                preserve_refs: attrs.preserve_refs,
                type_names: attrs.type_names,
                extension: attrs.extension,
                converter: attrs.converter.map(|make| make()),
            });
        }

        // Members without an explicit order come first, in declaration
        // order; the sort is stable.
        properties.sort_by_key(|p| p.order.unwrap_or(-1));

        let mut by_name = HashMap::with_capacity(properties.len());
        let mut extension_slot = None;
        for (index, property) in properties.iter().enumerate() {
            if by_name.insert(property.name.clone(), index).is_some() {
                return Err(ResolveError::DuplicateProperty {
                    type_path,
                    name: property.name.clone(),
                });
            }
            if property.extension {
                if extension_slot.is_some() {
                    return Err(ResolveError::MultipleExtensionSlots { type_path });
                }
                extension_slot = Some(index);
            }
        }

        Ok(ObjectContract {
            shape,
            properties: properties.into_boxed_slice(),
            by_name,
            extension_slot,
        })
    }
}

impl ContractResolver for DefaultContractResolver {
    fn resolve(&self, shape: &'static Shape) -> Result<Arc<Contract>, ResolveError> {
        let id = shape.ty().id();
        if let Some(contract) = self.cache.get(&id) {
            return Ok(Arc::clone(&contract));
        }
        let contract = Arc::new(self.build(shape)?);
        let published = self.cache.entry(id).or_insert(contract);
        Ok(Arc::clone(&published))
    }
}

// -----------------------------------------------------------------------------
// ResolveError

/// A shape that cannot be turned into a coherent contract.
///
/// Surfaced on the first resolve of the offending type, not at derive time,
/// because wire names depend on the resolver's naming strategy.
#[derive(Debug)]
pub enum ResolveError {
    /// Two members mapped to the same wire name.
    DuplicateProperty {
        type_path: &'static str,
        name: String,
    },
    /// More than one member claimed `#[json(extension)]`.
    MultipleExtensionSlots { type_path: &'static str },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::DuplicateProperty { type_path, name } => {
                write!(f, "`{type_path}` maps two members to the wire name `{name}`")
            }
            ResolveError::MultipleExtensionSlots { type_path } => {
                write!(f, "`{type_path}` declares more than one extension-data member")
            }
        }
    }
}

impl core::error::Error for ResolveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::CamelCaseNaming;
    use crate::shape::{Construct, FieldAttrs, FieldShape, Shaped};
    use std::sync::OnceLock;

    fn person_shape() -> &'static Shape {
        static SHAPE: OnceLock<Shape> = OnceLock::new();
        SHAPE.get_or_init(|| {
            struct Person;
            impl crate::shape::Named for Person {
                fn type_path() -> &'static str {
                    "tests::Person"
                }
                fn type_name() -> &'static str {
                    "Person"
                }
            }
            Shape::Object(ObjectShape::new::<Person>(
                vec![
                    FieldShape::new("first_name", <String as Shaped>::shape),
                    FieldShape::new("age", <u32 as Shaped>::shape).with_attrs(FieldAttrs {
                        order: Some(1),
                        ..Default::default()
                    }),
                    FieldShape::new("id", <u64 as Shaped>::shape).with_attrs(FieldAttrs {
                        rename: Some("Id"),
                        required: true,
                        ..Default::default()
                    }),
                ],
                Construct::NonInstantiable,
            ))
        })
    }

    #[test]
    fn repeat_resolves_share_one_contract() {
        let resolver = DefaultContractResolver::new();
        let a = resolver.resolve(person_shape()).unwrap();
        let b = resolver.resolve(person_shape()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_resolvers_hold_distinct_contracts() {
        let a = DefaultContractResolver::new()
            .resolve(person_shape())
            .unwrap();
        let b = DefaultContractResolver::new()
            .resolve(person_shape())
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn naming_strategy_applies_but_rename_wins() {
        let resolver =
            DefaultContractResolver::with_naming(Arc::new(CamelCaseNaming));
        let contract = resolver.resolve(person_shape()).unwrap();
        let object = contract.as_object().unwrap();
        assert!(object.property("firstName").is_some());
        assert!(object.property("Id").is_some());
        assert!(object.property("first_name").is_none());
    }

    #[test]
    fn explicit_order_sorts_after_unordered() {
        let resolver = DefaultContractResolver::new();
        let contract = resolver.resolve(person_shape()).unwrap();
        let object = contract.as_object().unwrap();
        let names: Vec<_> = object.properties().iter().map(Property::name).collect();
        assert_eq!(names, vec!["first_name", "Id", "age"]);
    }

    #[test]
    fn required_flag_survives_resolution() {
        let resolver = DefaultContractResolver::new();
        let contract = resolver.resolve(person_shape()).unwrap();
        let object = contract.as_object().unwrap();
        assert!(object.property("Id").unwrap().required());
        assert!(!object.property("age").unwrap().required());
    }
}
