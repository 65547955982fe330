//! End-to-end serialize/deserialize checks over derived types.

use std::any::TypeId;
use std::rc::Rc;
use std::sync::Arc;

use jot_contracts::contract::{LoopHandling, NullHandling, TypeNameHandling};
use jot_contracts::convert::{ConvertError, Converter};
use jot_contracts::naming::CamelCaseNaming;
use jot_contracts::resolver::DefaultContractResolver;
use jot_contracts::shape::{Shape, Shaped};
use jot_contracts::{Mapped, Node, Number, Registry, Shared, Value};
use jot_engine::{
    ErrorContext, ErrorHook, FaultKind, MetadataHandling, MissingMemberHandling, RegistryBinder,
    Serializer, Settings,
};
use jot_tokens::{Formatting, Scalar, Token, TokenSink, TokenSource};
use serde_json::json;

// -----------------------------------------------------------------------------
// Fixtures

#[derive(Mapped, Debug, PartialEq)]
struct Doc {
    a: i64,
    b: Vec<i64>,
}

#[derive(Mapped, Debug, PartialEq)]
struct Profile {
    first_name: String,
    last_name: String,
}

#[derive(Mapped, Debug, Default, PartialEq)]
struct Contact {
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Mapped, Debug, Default, PartialEq)]
#[json(default)]
struct Flags {
    verbose: bool,
}

#[derive(Mapped, Debug, PartialEq)]
struct Pair {
    a: f64,
    b: i64,
}

#[derive(Mapped, Debug, PartialEq)]
struct Author {
    name: String,
}

#[derive(Mapped, Debug)]
struct Post {
    author: Rc<Author>,
    reviewer: Rc<Author>,
}

#[derive(Mapped, Debug, Default)]
struct TreeNode {
    children: Vec<Shared<TreeNode>>,
}

#[derive(Mapped, Debug, Default, PartialEq)]
#[json(default)]
struct Animal {
    name: String,
}

#[derive(Mapped, Debug, Default, PartialEq)]
#[json(default)]
struct Dog {
    name: String,
    breed: String,
}

#[derive(Mapped, Debug, Default)]
#[json(default)]
struct Envelope {
    kind: String,
    #[json(extension)]
    rest: Value,
}

/// A hook that accepts every fault, letting operations run to completion.
fn recovering() -> ErrorHook {
    Arc::new(|cx: &mut ErrorContext<'_>| cx.handle())
}

fn animal_binder() -> Arc<RegistryBinder> {
    let mut registry = Registry::empty();
    registry.register::<Animal>();
    registry.register::<Dog>();
    Arc::new(RegistryBinder::with_registry(Arc::new(registry)))
}

// -----------------------------------------------------------------------------
// Round trips

#[test]
fn struct_round_trips_compact() {
    let doc = Doc {
        a: 1,
        b: vec![1, 2, 3],
    };
    let mut serializer = Serializer::new();
    let text = serializer.serialize_to_string(&doc).unwrap();
    assert_eq!(text, r#"{"a":1,"b":[1,2,3]}"#);

    let back: Doc = serializer.deserialize_from_str(&text).unwrap();
    assert_eq!(back, doc);
    assert!(serializer.faults().is_empty());
}

#[test]
fn output_is_plain_json() {
    let doc = Doc {
        a: 1,
        b: vec![1, 2, 3],
    };
    let text = Serializer::new().serialize_to_string(&doc).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, json!({"a": 1, "b": [1, 2, 3]}));
}

#[test]
fn indented_output_round_trips() {
    let doc = Doc {
        a: 7,
        b: vec![4, 5],
    };
    let mut serializer =
        Serializer::with_settings(Settings::new().with_formatting(Formatting::Indented));
    let text = serializer.serialize_to_string(&doc).unwrap();
    assert!(text.contains('\n'));

    let back: Doc = serializer.deserialize_from_str(&text).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn naming_strategy_renames_the_wire() {
    let profile = Profile {
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
    };
    let settings = Settings::new().with_resolver(Arc::new(DefaultContractResolver::with_naming(
        Arc::new(CamelCaseNaming),
    )));
    let mut serializer = Serializer::with_settings(settings);
    let text = serializer.serialize_to_string(&profile).unwrap();
    assert_eq!(text, r#"{"firstName":"Ada","lastName":"Lovelace"}"#);

    let back: Profile = serializer.deserialize_from_str(&text).unwrap();
    assert_eq!(back, profile);
}

#[test]
fn reader_extensions_feed_the_engine() {
    let text = "/* header */ {a: 1, // unquoted key\n 'b': [1, 2, 3]}";
    let back: Doc = Serializer::new().deserialize_from_str(text).unwrap();
    assert_eq!(
        back,
        Doc {
            a: 1,
            b: vec![1, 2, 3],
        }
    );
}

// -----------------------------------------------------------------------------
// Null handling

#[test]
fn nulls_are_written_by_default_and_omittable() {
    let contact = Contact::default();
    let mut serializer = Serializer::new();
    assert_eq!(
        serializer.serialize_to_string(&contact).unwrap(),
        r#"{"email":null,"phone":null}"#
    );

    let mut quiet =
        Serializer::with_settings(Settings::new().with_null_handling(NullHandling::Ignore));
    assert_eq!(quiet.serialize_to_string(&contact).unwrap(), "{}");

    let back: Contact = quiet.deserialize_from_str("{}").unwrap();
    assert_eq!(back, contact);
}

// -----------------------------------------------------------------------------
// Missing and required members

#[test]
fn unknown_members_are_skipped_by_default() {
    let back: Flags = Serializer::new()
        .deserialize_from_str(r#"{"Missing":1,"verbose":true}"#)
        .unwrap();
    assert_eq!(back, Flags { verbose: true });
}

#[test]
fn unknown_members_fail_under_the_error_policy() {
    let mut serializer = Serializer::with_settings(
        Settings::new().with_missing_members(MissingMemberHandling::Error),
    );
    let fault = serializer
        .deserialize_from_str::<Flags>(r#"{"Missing":1,"verbose":true}"#)
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::MissingMember);
    assert_eq!(fault.path(), "Missing");
    assert_eq!(fault.member(), Some("Missing"));
}

#[test]
fn handled_unknown_members_are_recorded_and_skipped() {
    let settings = Settings::new()
        .with_missing_members(MissingMemberHandling::Error)
        .with_error_hook(recovering());
    let mut serializer = Serializer::with_settings(settings);
    let back: Flags = serializer
        .deserialize_from_str(r#"{"Missing":1,"verbose":true}"#)
        .unwrap();
    assert_eq!(back, Flags { verbose: true });
    assert_eq!(serializer.faults().len(), 1);
    assert_eq!(serializer.faults()[0].kind(), FaultKind::MissingMember);
}

#[test]
fn constructor_reports_absent_members() {
    let fault = Serializer::new()
        .deserialize_from_str::<Doc>("{}")
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::RequiredMember);
}

// -----------------------------------------------------------------------------
// Recovery

#[test]
fn bad_items_abort_without_a_hook() {
    let fault = Serializer::new()
        .deserialize_from_str::<Vec<i64>>(r#"[1,"x",3]"#)
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::Format);
}

#[test]
fn bad_items_are_dropped_with_a_hook() {
    let mut serializer =
        Serializer::with_settings(Settings::new().with_error_hook(recovering()));
    let back: Vec<i64> = serializer.deserialize_from_str(r#"[1,"x",3]"#).unwrap();
    assert_eq!(back, vec![1, 3]);
    assert_eq!(serializer.faults().len(), 1);
    assert_eq!(serializer.faults()[0].kind(), FaultKind::Format);
}

#[test]
fn recovered_member_faults_leave_well_formed_output() {
    let pair = Pair { a: f64::NAN, b: 1 };
    let mut serializer =
        Serializer::with_settings(Settings::new().with_error_hook(recovering()));
    let text = serializer.serialize_to_string(&pair).unwrap();
    // The dropped member leaves no dangling property name behind.
    assert_eq!(text, r#"{"b":1}"#);
    assert_eq!(serializer.faults().len(), 1);
    assert_eq!(serializer.faults()[0].kind(), FaultKind::UnsupportedValue);
    assert_eq!(serializer.faults()[0].member(), Some("a"));
}

#[test]
fn recovered_item_faults_drop_only_the_item() {
    let mut serializer =
        Serializer::with_settings(Settings::new().with_error_hook(recovering()));
    let text = serializer
        .serialize_to_string(&vec![1.0f64, f64::NAN, 3.0])
        .unwrap();
    assert_eq!(text, "[1.0,3.0]");
    assert_eq!(serializer.faults().len(), 1);
    assert_eq!(serializer.faults()[0].path(), "[1]");
}

#[test]
fn depth_limit_guards_both_directions() {
    let settings = Settings::new().with_max_depth(2);

    let fault = Serializer::with_settings(settings.clone())
        .deserialize_from_str::<Value>("[[[[1]]]]")
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::DepthExceeded);

    let nested = Value::Array(vec![Value::Array(vec![Value::Array(vec![Value::Array(
        vec![Value::Number(Number::Int(1))],
    )])])]);
    let fault = Serializer::with_settings(settings)
        .serialize_to_string(&nested)
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::DepthExceeded);
}

// -----------------------------------------------------------------------------
// Reference preservation

#[test]
fn shared_targets_write_one_id_and_one_ref() {
    let ada = Rc::new(Author {
        name: "ada".to_owned(),
    });
    let post = Post {
        author: Rc::clone(&ada),
        reviewer: ada,
    };
    let mut serializer =
        Serializer::with_settings(Settings::new().with_preserve_references(true));
    let text = serializer.serialize_to_string(&post).unwrap();
    assert_eq!(
        text,
        r#"{"author":{"$id":"1","name":"ada"},"reviewer":{"$ref":"1"}}"#
    );

    let back: Post = serializer.deserialize_from_str(&text).unwrap();
    assert!(Rc::ptr_eq(&back.author, &back.reviewer));
    assert_eq!(back.author.name, "ada");
}

#[test]
fn without_preservation_targets_are_duplicated() {
    let ada = Rc::new(Author {
        name: "ada".to_owned(),
    });
    let post = Post {
        author: Rc::clone(&ada),
        reviewer: ada,
    };
    let text = Serializer::new().serialize_to_string(&post).unwrap();
    assert_eq!(
        text,
        r#"{"author":{"name":"ada"},"reviewer":{"name":"ada"}}"#
    );
}

// -----------------------------------------------------------------------------
// Cycles

#[test]
fn cyclic_graphs_fail_under_the_default_policy() {
    let root: Shared<TreeNode> = Shared::new(TreeNode::default());
    root.borrow_mut().children.push(root.clone());

    let fault = Serializer::new().serialize_to_string(&root).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::SelfReferenceLoop);
    assert!(fault.path().contains("children"));
}

#[test]
fn cyclic_edges_are_omitted_under_ignore() {
    let root: Shared<TreeNode> = Shared::new(TreeNode::default());
    root.borrow_mut().children.push(root.clone());

    let mut serializer =
        Serializer::with_settings(Settings::new().with_loop_handling(LoopHandling::Ignore));
    let text = serializer.serialize_to_string(&root).unwrap();
    assert_eq!(text, r#"{"children":[]}"#);
}

#[test]
fn serialize_policy_recurses_until_the_depth_limit() {
    let root: Shared<TreeNode> = Shared::new(TreeNode::default());
    root.borrow_mut().children.push(root.clone());

    let mut serializer = Serializer::with_settings(
        Settings::new()
            .with_loop_handling(LoopHandling::Serialize)
            .with_max_depth(8),
    );
    // The cycle is re-entered on every visit; only the depth limit stops it.
    let fault = serializer.serialize_to_string(&root).unwrap_err();
    assert_eq!(fault.kind(), FaultKind::DepthExceeded);
}

#[test]
fn cyclic_graphs_read_back_through_shared_handles() {
    let mut serializer = Serializer::new();
    let root: Shared<TreeNode> = serializer
        .deserialize_from_str(r#"{"$id":"1","children":[{"$ref":"1"}]}"#)
        .unwrap();
    let child = root.borrow().children[0].clone();
    assert!(Shared::ptr_eq(&root, &child));
}

#[test]
fn preserved_cycles_round_trip() {
    let root: Shared<TreeNode> = Shared::new(TreeNode::default());
    root.borrow_mut().children.push(root.clone());

    let mut serializer =
        Serializer::with_settings(Settings::new().with_preserve_references(true));
    let text = serializer.serialize_to_string(&root).unwrap();
    // The cycle collapses to a `$ref` before the loop policy is consulted.
    assert_eq!(text, r#"{"$id":"1","children":[{"$ref":"1"}]}"#);

    let back: Shared<TreeNode> = serializer.deserialize_from_str(&text).unwrap();
    let child = back.borrow().children[0].clone();
    assert!(Shared::ptr_eq(&back, &child));
}

// -----------------------------------------------------------------------------
// Type names

#[test]
fn type_names_resolve_by_short_name() {
    let settings = Settings::new().with_binder(animal_binder());
    let mut serializer = Serializer::with_settings(settings);
    let node = serializer
        .deserialize_as_from_str(
            <Animal as Shaped>::shape(),
            r#"{"$type":"Dog","name":"rex","breed":"lab"}"#,
        )
        .unwrap();
    let dog = node.downcast_ref::<Dog>().unwrap();
    assert_eq!(dog.breed, "lab");
}

#[test]
fn written_type_names_bind_back() {
    let settings = Settings::new()
        .with_binder(animal_binder())
        .with_type_names(TypeNameHandling::Objects);
    let mut serializer = Serializer::with_settings(settings);
    let dog = Dog {
        name: "rex".to_owned(),
        breed: "lab".to_owned(),
    };
    let text = serializer.serialize_to_string(&dog).unwrap();
    assert!(text.contains(r#""$type":"#));

    // The full path written above resolves on the way back in.
    let node = serializer
        .deserialize_as_from_str(<Animal as Shaped>::shape(), &text)
        .unwrap();
    assert_eq!(node.downcast_ref::<Dog>(), Some(&dog));
}

#[test]
fn unresolved_type_names_fall_back_when_handled() {
    let settings = Settings::new()
        .with_binder(animal_binder())
        .with_error_hook(recovering());
    let mut serializer = Serializer::with_settings(settings);
    let node = serializer
        .deserialize_as_from_str(<Animal as Shaped>::shape(), r#"{"$type":"Ghost","name":"casper"}"#)
        .unwrap();
    let animal = node.downcast_ref::<Animal>().unwrap();
    assert_eq!(animal.name, "casper");
    assert_eq!(serializer.faults()[0].kind(), FaultKind::TypeResolution);
}

#[test]
fn scalar_type_names_use_the_value_wrapper() {
    let mut serializer =
        Serializer::with_settings(Settings::new().with_type_names(TypeNameHandling::All));
    let text = serializer.serialize_to_string(&5i64).unwrap();
    assert_eq!(text, r#"{"$type":"i64","$value":5}"#);

    let back: i64 = Serializer::new().deserialize_from_str(&text).unwrap();
    assert_eq!(back, 5);
}

#[test]
fn root_type_names_wrap_arrays_in_values() {
    let mut serializer =
        Serializer::with_settings(Settings::new().with_type_names(TypeNameHandling::Root));
    let text = serializer.serialize_to_string(&vec![1i64, 2]).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(parsed["$type"].is_string());
    assert_eq!(parsed["$values"], json!([1, 2]));

    // `Vec<i64>` is not registered, so binding the name back needs the hook.
    let mut reader =
        Serializer::with_settings(Settings::new().with_error_hook(recovering()));
    let back: Vec<i64> = reader.deserialize_from_str(&text).unwrap();
    assert_eq!(back, vec![1, 2]);
}

// -----------------------------------------------------------------------------
// Metadata handling

#[test]
fn trailing_metadata_needs_read_ahead() {
    let text = r#"{"name":"rex","breed":"lab","$type":"Dog"}"#;

    let mut head_only = Serializer::with_settings(Settings::new().with_binder(animal_binder()));
    let node = head_only
        .deserialize_as_from_str(<Animal as Shaped>::shape(), text)
        .unwrap();
    assert!(node.downcast_ref::<Animal>().is_some());

    let mut buffered = Serializer::with_settings(
        Settings::new()
            .with_binder(animal_binder())
            .with_metadata(MetadataHandling::ReadAhead),
    );
    let node = buffered
        .deserialize_as_from_str(<Animal as Shaped>::shape(), text)
        .unwrap();
    assert!(node.downcast_ref::<Dog>().is_some());
}

#[test]
fn metadata_can_be_refused_outright() {
    let mut serializer =
        Serializer::with_settings(Settings::new().with_metadata(MetadataHandling::Error));
    let fault = serializer
        .deserialize_from_str::<Flags>(r#"{"$id":"1","verbose":true}"#)
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::Format);
}

#[test]
fn ignored_metadata_reads_as_plain_members() {
    let mut serializer =
        Serializer::with_settings(Settings::new().with_metadata(MetadataHandling::Ignore));
    let back: Flags = serializer
        .deserialize_from_str(r#"{"$id":"1","verbose":true}"#)
        .unwrap();
    assert_eq!(back, Flags { verbose: true });
}

// -----------------------------------------------------------------------------
// Extension data

#[test]
fn extension_members_round_trip() {
    let text = r#"{"kind":"event","seq":4,"tags":["a"]}"#;
    let mut serializer = Serializer::new();
    let back: Envelope = serializer.deserialize_from_str(text).unwrap();
    assert_eq!(back.kind, "event");
    assert_eq!(back.rest.get("seq").and_then(Value::as_i64), Some(4));

    assert_eq!(serializer.serialize_to_string(&back).unwrap(), text);
}

// -----------------------------------------------------------------------------
// Populate

#[test]
fn populate_merges_into_an_existing_value() {
    let mut doc = Doc { a: 5, b: vec![9] };
    let mut serializer = Serializer::new();
    serializer.populate_from_str(&mut doc, r#"{"a":7}"#).unwrap();
    assert_eq!(doc, Doc { a: 7, b: vec![9] });

    serializer
        .populate_from_str(&mut doc, r#"{"b":[1,2]}"#)
        .unwrap();
    assert_eq!(doc, Doc { a: 7, b: vec![1, 2] });
}

// -----------------------------------------------------------------------------
// Converters

/// Writes booleans as `1`/`0`.
struct BitBool;

impl Converter for BitBool {
    fn handles(&self, shape: &'static Shape) -> bool {
        shape.ty().id() == TypeId::of::<bool>()
    }

    fn write(&self, node: &dyn Node, sink: &mut dyn TokenSink) -> Result<(), ConvertError> {
        let on = node.downcast_ref::<bool>().copied().unwrap_or(false);
        sink.write(Token::Scalar(Scalar::Int(i64::from(on))))?;
        Ok(())
    }

    fn read(
        &self,
        source: &mut dyn TokenSource,
        _shape: &'static Shape,
    ) -> Result<Box<dyn Node>, ConvertError> {
        match source.next_token()? {
            Some(Token::Scalar(Scalar::Int(n))) => Ok(Box::new(n != 0)),
            Some(Token::Scalar(Scalar::UInt(n))) => Ok(Box::new(n != 0)),
            _ => Err(ConvertError::new("expected `0` or `1`")),
        }
    }
}

#[test]
fn converters_own_the_wire_format() {
    let settings = Settings::new().with_converter(Arc::new(BitBool));
    let mut serializer = Serializer::with_settings(settings);

    let text = serializer.serialize_to_string(&vec![true, false]).unwrap();
    assert_eq!(text, "[1,0]");

    let back: Vec<bool> = serializer.deserialize_from_str(&text).unwrap();
    assert_eq!(back, vec![true, false]);
}
