//! The write half of the engine: a recursive token walk over `NodeRef`.

use std::sync::Arc;

use jot_contracts::contract::{
    Contract, LoopHandling, NullHandling, ObjectContract, TypeNameHandling,
};
use jot_contracts::convert::Converter;
use jot_contracts::node::{Node, NodeRef};
use jot_contracts::ops::{ArrayNode, DynamicNode, MapNode, ObjectNode};
use jot_contracts::shape::{ContainerAttrs, Shape};
use jot_contracts::value::Value;
use jot_tokens::{NonFinitePolicy, PathStack, Scalar, Token, TokenBuffer, TokenSink, WriterError};

use crate::error::{Fault, FaultKind};
use crate::identity::WriteTracker;
use crate::recover::Recovery;
use crate::settings::Settings;
use crate::trace::TraceLevel;

// -----------------------------------------------------------------------------
// Effective policy

/// The policies in force at one point of the walk, after overlaying the
/// container's and the property's overrides on the settings. Most specific
/// wins; items inherit from their property.
#[derive(Clone, Copy)]
pub(crate) struct Effective {
    pub null: NullHandling,
    pub loops: LoopHandling,
    pub preserve: bool,
    pub type_names: TypeNameHandling,
}

impl Effective {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            null: settings.null_handling(),
            loops: settings.loop_handling(),
            preserve: settings.preserve_references(),
            type_names: settings.type_names(),
        }
    }

    pub fn overlay_container(mut self, attrs: &ContainerAttrs) -> Self {
        if let Some(null) = attrs.null_handling {
            self.null = null;
        }
        if let Some(loops) = attrs.loop_handling {
            self.loops = loops;
        }
        if let Some(preserve) = attrs.preserve_refs {
            self.preserve = preserve;
        }
        if let Some(type_names) = attrs.type_names {
            self.type_names = type_names;
        }
        self
    }

    pub fn overlay_property(mut self, property: &jot_contracts::Property) -> Self {
        if let Some(null) = property.null_handling() {
            self.null = null;
        }
        if let Some(loops) = property.loop_handling() {
            self.loops = loops;
        }
        if let Some(preserve) = property.preserve_refs() {
            self.preserve = preserve;
        }
        if let Some(type_names) = property.type_names() {
            self.type_names = type_names;
        }
        self
    }
}

/// What to do with one edge of the graph before any token is written.
enum Edge {
    /// Write the value; `Some(id)` means lead with `$id`.
    Write(Option<u32>),
    /// Write `{"$ref": id}` instead of the value.
    Ref(u32),
    /// Omit the edge entirely (cyclic, policy `Ignore`).
    Skip,
}

// -----------------------------------------------------------------------------
// Staged

/// Buffers one member or item so a fault the hook recovers mid-value leaves
/// the real sink untouched; the tokens reach the sink only on success.
///
/// Keeps its own path frames under the enclosing container's path, so
/// faults raised inside a staged value still name their position.
struct Staged {
    base: String,
    tokens: TokenBuffer,
    path: PathStack,
    primed: bool,
}

impl Staged {
    /// Stages an object member. `base` is the enclosing object's path.
    fn member(base: &str) -> Self {
        let mut path = PathStack::new();
        path.push_object();
        Self {
            base: base.to_owned(),
            tokens: TokenBuffer::new(),
            path,
            primed: false,
        }
    }

    /// Stages an array item that will land at `index` in the output. The
    /// seeded frame already points at that index, so the value's first
    /// token must not advance it again.
    fn item(base: &str, index: usize) -> Self {
        let mut path = PathStack::new();
        path.push_array();
        for _ in 0..=index {
            path.advance_item();
        }
        Self {
            base: base.to_owned(),
            tokens: TokenBuffer::new(),
            path,
            primed: true,
        }
    }

    fn advance(&mut self) {
        if std::mem::take(&mut self.primed) {
            return;
        }
        self.path.advance_item();
    }

    fn flush(self, sink: &mut dyn TokenSink) -> Result<(), Fault> {
        for token in self.tokens.iter() {
            sink.write(token.clone())?;
        }
        Ok(())
    }
}

impl TokenSink for Staged {
    fn write(&mut self, token: Token) -> Result<(), WriterError> {
        match &token {
            Token::ObjectStart => {
                self.advance();
                self.path.push_object();
            }
            Token::ArrayStart => {
                self.advance();
                self.path.push_array();
            }
            Token::ConstructorStart(name) => {
                self.advance();
                self.path.push_constructor(name);
            }
            Token::ObjectEnd | Token::ArrayEnd | Token::ConstructorEnd => self.path.pop(),
            Token::Property(name) => self.path.set_property(name),
            Token::Scalar(_) => self.advance(),
            Token::Comment(_) => {}
        }
        self.tokens.write(token)
    }

    fn path(&self) -> String {
        let local = self.path.render();
        if local.is_empty() {
            self.base.clone()
        } else if self.base.is_empty() || local.starts_with('[') {
            format!("{}{local}", self.base)
        } else {
            format!("{}.{local}", self.base)
        }
    }
}

// -----------------------------------------------------------------------------
// Writer context

pub(crate) struct WriteCx<'a> {
    settings: &'a Settings,
    tracker: WriteTracker,
    recovery: Recovery,
}

/// Serializes one root node. Returns the handled-fault list on success.
pub(crate) fn write_root(
    settings: &Settings,
    node: &dyn Node,
    sink: &mut dyn TokenSink,
) -> Result<Vec<Fault>, Fault> {
    let mut cx = WriteCx {
        settings,
        tracker: WriteTracker::new(),
        recovery: Recovery::new(),
    };
    let eff = Effective::from_settings(settings);
    let result = match cx.plan_edge(node, eff, sink)? {
        Edge::Write(id) => cx.write_value(node, Some(node.shape()), sink, eff, None, 0, true, id),
        Edge::Ref(id) => cx.write_ref(id, sink),
        Edge::Skip => sink.write(Token::Scalar(Scalar::Null)).map_err(Fault::from),
    };
    match result {
        Ok(()) => Ok(cx.recovery.into_faults()),
        Err(fault) => match cx.recovery.offer(settings, fault) {
            Ok(()) => Ok(cx.recovery.into_faults()),
            Err(fault) => Err(fault),
        },
    }
}

impl WriteCx<'_> {
    fn resolve(&self, shape: &'static Shape, sink: &dyn TokenSink) -> Result<Arc<Contract>, Fault> {
        self.settings.resolver().resolve(shape).map_err(|err| {
            Fault::new(FaultKind::UnsupportedValue, sink.path(), err.to_string())
        })
    }

    /// Decides, before any token goes out, whether this edge is written,
    /// replaced by a `$ref`, or omitted. Only tracked shared handles ever
    /// deviate from `Write`.
    fn plan_edge(
        &mut self,
        node: &dyn Node,
        eff: Effective,
        sink: &dyn TokenSink,
    ) -> Result<Edge, Fault> {
        let NodeRef::Shared(handle) = node.node_ref() else {
            return Ok(Edge::Write(None));
        };
        if !handle.tracked() {
            return Ok(Edge::Write(None));
        }
        let address = handle.target_address();
        // Preservation wins over loop detection: an ancestor was planned on
        // the way down, so it already has an id and collapses to a `$ref`.
        if eff.preserve {
            let (id, first) = self.tracker.id_for(address);
            return if first {
                Ok(Edge::Write(Some(id)))
            } else {
                Ok(Edge::Ref(id))
            };
        }
        if self.tracker.on_stack(address) {
            return match eff.loops {
                LoopHandling::Error => Err(Fault::new(
                    FaultKind::SelfReferenceLoop,
                    sink.path(),
                    format!("`{}` is its own ancestor", node.type_path()),
                )),
                LoopHandling::Ignore => {
                    self.settings.trace().event(
                        TraceLevel::Warning,
                        &sink.path(),
                        "cyclic edge omitted",
                    );
                    Ok(Edge::Skip)
                }
                LoopHandling::Serialize => Ok(Edge::Write(None)),
            };
        }
        Ok(Edge::Write(None))
    }

    fn write_ref(&self, id: u32, sink: &mut dyn TokenSink) -> Result<(), Fault> {
        sink.write(Token::ObjectStart)?;
        sink.write(Token::Property("$ref".into()))?;
        sink.write(Token::Scalar(Scalar::Str(id.to_string())))?;
        sink.write(Token::ObjectEnd)?;
        Ok(())
    }

    /// Writes one value. `declared` is the slot's static shape, used by
    /// `TypeNameHandling::Auto`; `id` is a `$id` to lead with.
    fn write_value(
        &mut self,
        node: &dyn Node,
        declared: Option<&'static Shape>,
        sink: &mut dyn TokenSink,
        eff: Effective,
        converter: Option<&Arc<dyn Converter>>,
        depth: usize,
        root: bool,
        id: Option<u32>,
    ) -> Result<(), Fault> {
        if depth > self.settings.max_depth() {
            return Err(Fault::new(
                FaultKind::DepthExceeded,
                sink.path(),
                format!("nesting exceeds the configured limit of {}", self.settings.max_depth()),
            ));
        }

        if let Some(claimed) = self.claim_converter(node, converter) {
            return claimed
                .write(node, sink)
                .map_err(|err| Fault::new(FaultKind::Format, sink.path(), err.to_string()));
        }

        match node.node_ref() {
            NodeRef::Shared(handle) => {
                let tracked = handle.tracked();
                let address = handle.target_address();
                if tracked {
                    self.tracker.enter(address);
                }
                let mut out = Ok(());
                handle.with_target(&mut |target| {
                    out = self.write_value(target, declared, sink, eff, None, depth, root, id);
                });
                if tracked {
                    self.tracker.exit(address);
                }
                out
            }
            NodeRef::Opt(inner) => match inner {
                Some(inner) => {
                    self.write_value(inner, declared, sink, eff, None, depth, root, id)
                }
                None => sink.write(Token::Scalar(Scalar::Null)).map_err(Fault::from),
            },
            NodeRef::Object(object) => {
                let contract = self.resolve(node.shape(), sink)?;
                let Some(object_contract) = contract.as_object() else {
                    return Err(Fault::new(
                        FaultKind::UnsupportedValue,
                        sink.path(),
                        format!("`{}` has no object contract", node.type_path()),
                    ));
                };
                let type_name = self.type_token(node.shape(), declared, eff, root, true, sink)?;
                self.write_object(object, object_contract, sink, eff, depth, id, type_name)
            }
            NodeRef::Array(array) => {
                let contract = self.resolve(node.shape(), sink)?;
                let item = match contract.kind() {
                    jot_contracts::ContractKind::Array(c) => Some(c.item()),
                    _ => None,
                };
                let type_name = self.type_token(node.shape(), declared, eff, root, false, sink)?;
                let wrapped = id.is_some() || type_name.is_some();
                if wrapped {
                    sink.write(Token::ObjectStart)?;
                    self.write_metadata(sink, id, type_name)?;
                    sink.write(Token::Property("$values".into()))?;
                }
                self.write_array(array, item, sink, eff, depth)?;
                if wrapped {
                    sink.write(Token::ObjectEnd)?;
                }
                Ok(())
            }
            NodeRef::Map(map) => {
                let contract = self.resolve(node.shape(), sink)?;
                let value_shape = match contract.kind() {
                    jot_contracts::ContractKind::Map(c) => Some(c.value()),
                    _ => None,
                };
                let type_name = self.type_token(node.shape(), declared, eff, root, true, sink)?;
                self.write_map(map, value_shape, sink, eff, depth, id, type_name)
            }
            NodeRef::Scalar(scalar) => {
                self.check_scalar(&scalar, sink)?;
                let type_name = self.type_token(node.shape(), declared, eff, root, false, sink)?;
                if id.is_some() || type_name.is_some() {
                    sink.write(Token::ObjectStart)?;
                    self.write_metadata(sink, id, type_name)?;
                    sink.write(Token::Property("$value".into()))?;
                    sink.write(Token::Scalar(scalar))?;
                    sink.write(Token::ObjectEnd)?;
                    Ok(())
                } else {
                    sink.write(Token::Scalar(scalar)).map_err(Fault::from)
                }
            }
            NodeRef::Dynamic(dynamic) => {
                if let Some(value) = node.downcast_ref::<Value>() {
                    self.write_untyped(value, sink, depth)
                } else {
                    self.write_dynamic(dynamic, sink, depth)
                }
            }
        }
    }

    /// Rejects non-finite floats up front when the settings would refuse
    /// them anyway, so the fault surfaces before any token is committed.
    fn check_scalar(&self, scalar: &Scalar, sink: &dyn TokenSink) -> Result<(), Fault> {
        if let Scalar::Float(v) = scalar {
            if !v.is_finite() && self.settings.non_finite() == NonFinitePolicy::Error {
                return Err(Fault::new(
                    FaultKind::UnsupportedValue,
                    sink.path(),
                    format!("non-finite number `{v}` cannot be written as JSON"),
                ));
            }
        }
        Ok(())
    }

    fn claim_converter<'c>(
        &'c self,
        node: &dyn Node,
        member: Option<&'c Arc<dyn Converter>>,
    ) -> Option<&'c Arc<dyn Converter>> {
        let shape = node.shape();
        self.settings
            .converters()
            .iter()
            .find(|c| c.handles(shape))
            .or(member)
    }

    /// The `$type` string to embed, or `None`.
    fn type_token(
        &mut self,
        actual: &'static Shape,
        declared: Option<&'static Shape>,
        eff: Effective,
        root: bool,
        is_object: bool,
        sink: &dyn TokenSink,
    ) -> Result<Option<String>, Fault> {
        let wanted = match eff.type_names {
            TypeNameHandling::None => false,
            TypeNameHandling::Objects => is_object,
            TypeNameHandling::Auto => {
                declared.is_none_or(|d| unwrapped(d).ty().id() != actual.ty().id())
            }
            TypeNameHandling::All => true,
            TypeNameHandling::Root => root,
        };
        if !wanted {
            return Ok(None);
        }
        match self.settings.binder().name_for(&actual.ty()) {
            Some(name) => Ok(Some(name)),
            None => Err(Fault::new(
                FaultKind::TypeResolution,
                sink.path(),
                format!("no wire name for `{}`", actual.ty().path()),
            )),
        }
    }

    fn write_metadata(
        &self,
        sink: &mut dyn TokenSink,
        id: Option<u32>,
        type_name: Option<String>,
    ) -> Result<(), Fault> {
        if let Some(id) = id {
            sink.write(Token::Property("$id".into()))?;
            sink.write(Token::Scalar(Scalar::Str(id.to_string())))?;
        }
        if let Some(name) = type_name {
            sink.write(Token::Property("$type".into()))?;
            sink.write(Token::Scalar(Scalar::Str(name)))?;
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        object: &dyn ObjectNode,
        contract: &ObjectContract,
        sink: &mut dyn TokenSink,
        eff: Effective,
        depth: usize,
        id: Option<u32>,
        type_name: Option<String>,
    ) -> Result<(), Fault> {
        let container_eff = eff.overlay_container(contract.object_shape().attrs());
        sink.write(Token::ObjectStart)?;
        let base = sink.path();
        self.write_metadata(sink, id, type_name)?;

        for property in contract.properties() {
            if property.ignored() {
                continue;
            }
            let Some(value) = object.field(property.declared()) else {
                continue;
            };
            let member_eff = container_eff.overlay_property(property);

            if property.extension() {
                self.write_extension(value, sink, &base, depth)?;
                continue;
            }

            if is_null(value) && member_eff.null == NullHandling::Ignore {
                continue;
            }

            let result = self.write_member(
                property.name(),
                value,
                Some(property.shape()),
                property.converter(),
                sink,
                &base,
                member_eff,
                depth,
            );
            if let Err(fault) = result {
                let fault = fault.with_member(property.name().to_owned());
                self.recovery.offer(self.settings, fault)?;
            }
        }

        sink.write(Token::ObjectEnd)?;
        Ok(())
    }

    /// Plans the edge, then writes `name: value` or nothing. The value is
    /// staged so a recovered fault never leaves a dangling property name.
    fn write_member(
        &mut self,
        name: &str,
        value: &dyn Node,
        declared: Option<&'static Shape>,
        converter: Option<&Arc<dyn Converter>>,
        sink: &mut dyn TokenSink,
        base: &str,
        eff: Effective,
        depth: usize,
    ) -> Result<(), Fault> {
        match self.plan_edge(value, eff, sink)? {
            Edge::Skip => Ok(()),
            Edge::Ref(id) => {
                sink.write(Token::Property(name.to_owned()))?;
                self.write_ref(id, sink)
            }
            Edge::Write(id) => {
                let mut staged = Staged::member(base);
                staged.write(Token::Property(name.to_owned()))?;
                self.write_value(value, declared, &mut staged, eff, converter, depth + 1, false, id)?;
                staged.flush(sink)
            }
        }
    }

    /// Splats an extension-data `Value::Object` into the enclosing object.
    fn write_extension(
        &mut self,
        value: &dyn Node,
        sink: &mut dyn TokenSink,
        base: &str,
        depth: usize,
    ) -> Result<(), Fault> {
        let Some(value) = value.downcast_ref::<Value>() else {
            return Ok(());
        };
        let Value::Object(members) = value else {
            return Ok(());
        };
        for (name, member) in members {
            let mut staged = Staged::member(base);
            staged.write(Token::Property(name.clone()))?;
            self.write_untyped(member, &mut staged, depth + 1)?;
            staged.flush(sink)?;
        }
        Ok(())
    }

    fn write_array(
        &mut self,
        array: &dyn ArrayNode,
        item_shape: Option<&'static Shape>,
        sink: &mut dyn TokenSink,
        eff: Effective,
        depth: usize,
    ) -> Result<(), Fault> {
        sink.write(Token::ArrayStart)?;
        let base = sink.path();
        // Tracks the position items land at in the output, so a staged
        // fault's path matches what the reader of the output would see.
        let mut written = 0usize;
        for index in 0..array.len() {
            let Some(item) = array.get(index) else {
                continue;
            };
            let result = match self.plan_edge(item, eff, sink)? {
                Edge::Skip => Ok(()),
                Edge::Ref(id) => self.write_ref(id, sink).map(|()| written += 1),
                Edge::Write(id) => {
                    let mut staged = Staged::item(&base, written);
                    match self.write_value(
                        item, item_shape, &mut staged, eff, None, depth + 1, false, id,
                    ) {
                        Ok(()) => {
                            staged.flush(sink)?;
                            written += 1;
                            Ok(())
                        }
                        Err(fault) => Err(fault),
                    }
                }
            };
            if let Err(fault) = result {
                self.recovery.offer(self.settings, fault)?;
            }
        }
        sink.write(Token::ArrayEnd)?;
        Ok(())
    }

    fn write_map(
        &mut self,
        map: &dyn MapNode,
        value_shape: Option<&'static Shape>,
        sink: &mut dyn TokenSink,
        eff: Effective,
        depth: usize,
        id: Option<u32>,
        type_name: Option<String>,
    ) -> Result<(), Fault> {
        sink.write(Token::ObjectStart)?;
        let base = sink.path();
        self.write_metadata(sink, id, type_name)?;
        for key in map.keys() {
            let Some(value) = map.get_entry(&key) else {
                continue;
            };
            if is_null(value) && eff.null == NullHandling::Ignore {
                continue;
            }
            let result = self.write_member(&key, value, value_shape, None, sink, &base, eff, depth);
            if let Err(fault) = result {
                let fault = fault.with_member(key.clone());
                self.recovery.offer(self.settings, fault)?;
            }
        }
        sink.write(Token::ObjectEnd)?;
        Ok(())
    }

    fn write_dynamic(
        &mut self,
        dynamic: &dyn DynamicNode,
        sink: &mut dyn TokenSink,
        depth: usize,
    ) -> Result<(), Fault> {
        sink.write(Token::ObjectStart)?;
        for name in dynamic.member_names() {
            let Some(value) = dynamic.get_member(&name) else {
                continue;
            };
            sink.write(Token::Property(name))?;
            self.write_untyped(&value, sink, depth + 1)?;
        }
        sink.write(Token::ObjectEnd)?;
        Ok(())
    }

    fn write_untyped(
        &mut self,
        value: &Value,
        sink: &mut dyn TokenSink,
        depth: usize,
    ) -> Result<(), Fault> {
        if depth > self.settings.max_depth() {
            return Err(Fault::new(
                FaultKind::DepthExceeded,
                sink.path(),
                format!("nesting exceeds the configured limit of {}", self.settings.max_depth()),
            ));
        }
        match value {
            Value::Array(items) => {
                sink.write(Token::ArrayStart)?;
                for item in items {
                    self.write_untyped(item, sink, depth + 1)?;
                }
                sink.write(Token::ArrayEnd)?;
                Ok(())
            }
            Value::Object(members) => {
                sink.write(Token::ObjectStart)?;
                for (name, member) in members {
                    sink.write(Token::Property(name.clone()))?;
                    self.write_untyped(member, sink, depth + 1)?;
                }
                sink.write(Token::ObjectEnd)?;
                Ok(())
            }
            other => {
                let scalar = other.as_scalar().unwrap_or(Scalar::Null);
                self.check_scalar(&scalar, sink)?;
                sink.write(Token::Scalar(scalar)).map_err(Fault::from)
            }
        }
    }
}

/// Strips `Opt` and `Shared` wrappers so `Auto` compares payload types.
fn unwrapped(shape: &'static Shape) -> &'static Shape {
    match shape {
        Shape::Opt(opt) => unwrapped(opt.inner()),
        Shape::Shared(shared) => unwrapped(shared.inner()),
        _ => shape,
    }
}

/// Whether a node renders as `null`.
fn is_null(node: &dyn Node) -> bool {
    match node.node_ref() {
        NodeRef::Opt(inner) => inner.is_none(),
        NodeRef::Scalar(scalar) => scalar.is_null_like(),
        NodeRef::Dynamic(_) => matches!(node.downcast_ref::<Value>(), Some(Value::Null)),
        _ => false,
    }
}
