//! End-to-end checks of `#[derive(Mapped)]` output.

use std::sync::Arc;

use jot_contracts::contract::NullHandling;
use jot_contracts::naming::CamelCaseNaming;
use jot_contracts::ops::{ObjectNode, OpsError, ScalarNode};
use jot_contracts::resolver::{ContractResolver, DefaultContractResolver};
use jot_contracts::shape::{Construct, MemberBag, Named, Shape, Shaped};
use jot_contracts::{Mapped, Node};
use jot_tokens::Scalar;

#[derive(Debug, PartialEq, Mapped)]
#[json(null = "ignore")]
struct Player {
    #[json(rename = "ID", required)]
    id: u64,
    name: String,
    #[json(ignore)]
    cached: usize,
    tags: Vec<String>,
    nick: Option<String>,
}

#[derive(Debug, PartialEq, Default, Mapped)]
#[json(default)]
struct Settings {
    volume: u32,
    muted: bool,
}

#[derive(Debug, PartialEq, Mapped)]
enum Color {
    Red,
    #[json(rename = "BLUE")]
    Blue,
}

#[test]
fn struct_shape_describes_fields_and_attrs() {
    let Shape::Object(object) = <Player as Shaped>::shape() else {
        panic!("expected an object shape");
    };
    assert_eq!(object.ty().name(), "Player");
    assert_eq!(object.attrs().null_handling, Some(NullHandling::Ignore));

    let names: Vec<_> = object.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["id", "name", "cached", "tags", "nick"]);

    let id = &object.fields()[0];
    assert_eq!(id.attrs().rename, Some("ID"));
    assert!(id.attrs().required);
    assert!(object.fields()[2].attrs().ignore);
}

#[test]
fn from_bag_builds_an_instance() {
    let Shape::Object(object) = <Player as Shaped>::shape() else {
        panic!("expected an object shape");
    };
    let Construct::FromBag(build) = object.construct() else {
        panic!("expected a member-bag constructor");
    };

    let mut bag = MemberBag::new();
    bag.insert("id", Box::new(7u64));
    bag.insert("name", Box::new("ada".to_owned()));
    bag.insert("tags", Box::new(vec!["admin".to_owned()]));

    let node = build(&mut bag).unwrap();
    let player = node.into_any().downcast::<Player>().unwrap();
    assert_eq!(
        *player,
        Player {
            id: 7,
            name: "ada".to_owned(),
            cached: 0,
            tags: vec!["admin".to_owned()],
            nick: None,
        }
    );
}

#[test]
fn from_bag_reports_the_missing_member() {
    let Shape::Object(object) = <Player as Shaped>::shape() else {
        panic!("expected an object shape");
    };
    let Construct::FromBag(build) = object.construct() else {
        panic!("expected a member-bag constructor");
    };

    let mut bag = MemberBag::new();
    bag.insert("id", Box::new(7u64));
    let err = build(&mut bag).unwrap_err();
    assert!(err.to_string().contains("name"));
}

#[test]
fn object_node_ops_reach_every_field() {
    let mut player = Player {
        id: 1,
        name: "ada".to_owned(),
        cached: 9,
        tags: vec![],
        nick: None,
    };

    let id = player.field("id").unwrap();
    assert_eq!(id.downcast_ref::<u64>(), Some(&1));
    assert_eq!(player.field_name_at(1), Some("name"));
    assert_eq!(player.field_len(), 5);
    assert!(player.field("unknown").is_none());

    player.set_field("id", Box::new(2u64)).unwrap();
    assert_eq!(player.id, 2);

    let err = player.set_field("id", Box::new(false)).unwrap_err();
    assert!(matches!(err, OpsError::TypeMismatch { .. }));
    let err = player.set_field("nope", Box::new(0u64)).unwrap_err();
    assert!(matches!(err, OpsError::UnknownMember(_)));
}

#[test]
fn container_default_yields_an_empty_constructor() {
    let Shape::Object(object) = <Settings as Shaped>::shape() else {
        panic!("expected an object shape");
    };
    let Construct::Empty(make) = object.construct() else {
        panic!("expected a create-then-populate constructor");
    };
    let node = make();
    let settings = node.into_any().downcast::<Settings>().unwrap();
    assert_eq!(*settings, Settings::default());
}

#[test]
fn resolver_applies_naming_over_derived_shapes() {
    let resolver = DefaultContractResolver::with_naming(Arc::new(CamelCaseNaming));
    let contract = resolver.resolve(<Player as Shaped>::shape()).unwrap();
    let object = contract.as_object().unwrap();
    // Renames beat the strategy; everything else is camel-cased.
    assert!(object.property("ID").is_some());
    assert!(object.property("nick").is_some());
    assert!(object.property("id").is_none());
}

#[test]
fn unit_enum_round_trips_variant_names() {
    assert_eq!(Color::type_name(), "Color");
    assert_eq!(Color::Red.get(), Scalar::Str("Red".to_owned()));
    assert_eq!(Color::Blue.get(), Scalar::Str("BLUE".to_owned()));

    let mut color = Color::Red;
    color.set(Scalar::Str("BLUE".to_owned())).unwrap();
    assert_eq!(color, Color::Blue);

    let err = color.set(Scalar::Str("GREEN".to_owned())).unwrap_err();
    assert!(matches!(err, OpsError::UnknownVariant { .. }));
    let err = color.set(Scalar::Int(3)).unwrap_err();
    assert!(matches!(err, OpsError::TypeMismatch { .. }));
}

#[test]
fn unit_enum_shape_coerces_from_strings() {
    let Shape::Scalar(scalar) = <Color as Shaped>::shape() else {
        panic!("expected a scalar shape");
    };
    let node = scalar.from_scalar(Scalar::Str("Red".to_owned())).unwrap();
    assert_eq!(node.downcast_ref::<Color>(), Some(&Color::Red));
    assert!(scalar.from_scalar(Scalar::Str("GREEN".to_owned())).is_err());
    assert!(scalar.from_scalar(Scalar::Bool(true)).is_err());
}
