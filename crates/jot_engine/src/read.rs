//! The read half of the engine: shape-directed token consumption.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use jot_contracts::contract::{Contract, ObjectContract};
use jot_contracts::convert::Converter;
use jot_contracts::node::{Node, NodeMut, NodeRef};
use jot_contracts::ops::{DynamicNode, ObjectNode, OpsError};
use jot_contracts::shape::{Construct, ConstructError, MemberBag, Shape};
use jot_contracts::value::Value;
use jot_tokens::{
    JsonDate, Location, ReaderError, Scalar, Token, TokenBuffer, TokenSource,
};

use crate::error::{Fault, FaultKind};
use crate::identity::ReadTracker;
use crate::recover::Recovery;
use crate::settings::{MetadataHandling, MissingMemberHandling, Settings};
use crate::trace::TraceLevel;

// -----------------------------------------------------------------------------
// Cursor

/// A token source with pushback and depth tracking.
///
/// Pushback lets the shared-handle and metadata layers peek several tokens
/// ahead and hand them back; depth tracking is what makes member-level
/// recovery possible (skip forward until the failed value's containers are
/// closed again).
pub(crate) struct Cursor<'a> {
    source: &'a mut dyn TokenSource,
    pending: VecDeque<Token>,
    depth: isize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a mut dyn TokenSource) -> Self {
        Self {
            source,
            pending: VecDeque::new(),
            depth: 0,
        }
    }

    fn pull(&mut self) -> Result<Option<Token>, ReaderError> {
        let token = match self.pending.pop_front() {
            Some(token) => Some(token),
            None => self.source.next_token()?,
        };
        if let Some(token) = &token {
            if token.opens_container() {
                self.depth += 1;
            } else if token.closes_container() {
                self.depth -= 1;
            }
        }
        Ok(token)
    }

    fn next(&mut self) -> Result<Option<Token>, Fault> {
        self.pull().map_err(Fault::from)
    }

    /// The next non-comment token.
    fn next_significant(&mut self) -> Result<Option<Token>, Fault> {
        loop {
            match self.next()? {
                Some(Token::Comment(_)) => continue,
                other => return Ok(other),
            }
        }
    }

    fn expect(&mut self) -> Result<Token, Fault> {
        self.next_significant()?.ok_or_else(|| {
            Fault::new(FaultKind::Structural, self.path(), "unexpected end of input")
        })
    }

    fn unread(&mut self, token: Token) {
        if token.opens_container() {
            self.depth -= 1;
        } else if token.closes_container() {
            self.depth += 1;
        }
        self.pending.push_front(token);
    }

    fn depth(&self) -> isize {
        self.depth
    }

    fn path(&self) -> String {
        self.source.path()
    }

    /// Consumes tokens until nesting is back at `depth`.
    fn recover_to(&mut self, depth: isize) -> Result<(), Fault> {
        while self.depth > depth {
            self.expect()?;
        }
        Ok(())
    }

    /// Consumes one complete value.
    fn skip_value(&mut self) -> Result<(), Fault> {
        let mut depth = 0isize;
        loop {
            let token = self.expect()?;
            if token.opens_container() {
                depth += 1;
            } else if token.closes_container() {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if depth == 0 && !matches!(token, Token::Comment(_)) {
                return Ok(());
            }
        }
    }
}

impl TokenSource for Cursor<'_> {
    fn next_token(&mut self) -> Result<Option<Token>, ReaderError> {
        self.pull()
    }

    fn path(&self) -> String {
        self.source.path()
    }

    fn location(&self) -> Option<Location> {
        self.source.location()
    }
}

// -----------------------------------------------------------------------------
// Metadata

const META_ID: &str = "$id";
const META_REF: &str = "$ref";
const META_TYPE: &str = "$type";
const META_VALUE: &str = "$value";
const META_VALUES: &str = "$values";

fn is_metadata(name: &str) -> bool {
    matches!(name, META_ID | META_REF | META_TYPE | META_VALUE | META_VALUES)
}

/// Leading metadata members collected off the front of an object.
#[derive(Default)]
struct Metadata {
    id: Option<String>,
    reference: Option<String>,
    type_name: Option<String>,
}

// -----------------------------------------------------------------------------
// Reader context

pub(crate) struct ReadCx<'a> {
    settings: &'a Settings,
    tracker: ReadTracker,
    recovery: Recovery,
}

/// Deserializes one value of `shape`. Returns the node and the
/// handled-fault list.
pub(crate) fn read_root(
    settings: &Settings,
    shape: &'static Shape,
    source: &mut dyn TokenSource,
) -> Result<(Box<dyn Node>, Vec<Fault>), Fault> {
    let mut cx = ReadCx {
        settings,
        tracker: ReadTracker::new(),
        recovery: Recovery::new(),
    };
    let mut cursor = Cursor::new(source);
    let node = cx.read_value(&mut cursor, shape, None, 0)?;
    Ok((node, cx.recovery.into_faults()))
}

/// Reads one value into an existing node, honoring its current contents.
pub(crate) fn populate_root(
    settings: &Settings,
    node: &mut dyn Node,
    source: &mut dyn TokenSource,
) -> Result<Vec<Fault>, Fault> {
    let mut cx = ReadCx {
        settings,
        tracker: ReadTracker::new(),
        recovery: Recovery::new(),
    };
    let mut cursor = Cursor::new(source);
    cx.populate_node(&mut cursor, node, 0)?;
    Ok(cx.recovery.into_faults())
}

impl ReadCx<'_> {
    fn metadata_honored(&self) -> bool {
        matches!(
            self.settings.metadata(),
            MetadataHandling::Default | MetadataHandling::ReadAhead
        )
    }

    fn resolve(&self, shape: &'static Shape, path: String) -> Result<Arc<Contract>, Fault> {
        self.settings
            .resolver()
            .resolve(shape)
            .map_err(|err| Fault::new(FaultKind::UnsupportedValue, path, err.to_string()))
    }

    fn depth_fault(&self, cursor: &Cursor<'_>) -> Fault {
        Fault::new(
            FaultKind::DepthExceeded,
            cursor.path(),
            format!("nesting exceeds the configured limit of {}", self.settings.max_depth()),
        )
    }

    fn claim_converter<'c>(
        &'c self,
        shape: &'static Shape,
        member: Option<&'c Arc<dyn Converter>>,
    ) -> Option<&'c Arc<dyn Converter>> {
        self.settings
            .converters()
            .iter()
            .find(|c| c.handles(shape))
            .or(member)
    }

    // -------------------------------------------------------------------------
    // Values

    fn read_value(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
        converter: Option<&Arc<dyn Converter>>,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        if depth > self.settings.max_depth() {
            return Err(self.depth_fault(cursor));
        }

        if let Some(claimed) = self.claim_converter(shape, converter) {
            return claimed
                .read(cursor, shape)
                .map_err(|err| Fault::new(FaultKind::Format, cursor.path(), err.to_string()));
        }

        match shape {
            Shape::Scalar(_) => self.read_scalar(cursor, shape),
            Shape::Opt(opt) => {
                let token = cursor.expect()?;
                if let Token::Scalar(scalar) = &token {
                    if scalar.is_null_like() {
                        return Ok(opt.none());
                    }
                }
                cursor.unread(token);
                let inner = self.read_value(cursor, opt.inner(), None, depth)?;
                opt.wrap(inner)
                    .map_err(|err| construct_fault(cursor.path(), err))
            }
            Shape::Array(_) => self.read_array(cursor, shape, depth),
            Shape::Map(_) => self.read_map(cursor, shape, depth),
            Shape::Object(_) => self.read_object(cursor, shape, depth),
            Shape::Shared(_) => self.read_shared(cursor, shape, depth),
            Shape::Dynamic(dynamic) => {
                let value = self.read_untyped(cursor, depth)?;
                let mut node = dynamic.make();
                if let Some(slot) = node.downcast_mut::<Value>() {
                    *slot = value;
                } else if let NodeMut::Dynamic(target) = node.node_mut() {
                    if let Value::Object(members) = value {
                        for (name, member) in members {
                            target.set_member(&name, member);
                        }
                    }
                }
                Ok(node)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Scalars

    fn read_scalar(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
    ) -> Result<Box<dyn Node>, Fault> {
        let token = cursor.expect()?;
        match token {
            Token::Scalar(scalar) => self.coerce_scalar(cursor, shape, scalar),
            Token::ObjectStart => {
                // `{"$type": ..., "$value": ...}` wrapper.
                let mut shape_used = shape;
                loop {
                    let token = cursor.expect()?;
                    let Token::Property(name) = token else {
                        return Err(Fault::new(
                            FaultKind::Format,
                            cursor.path(),
                            "expected a `$value` wrapper member",
                        ));
                    };
                    match name.as_str() {
                        META_TYPE if self.metadata_honored() => {
                            if let Some(bound) = self.bind_type(cursor)? {
                                shape_used = bound;
                            }
                        }
                        META_ID if self.metadata_honored() => {
                            let _ = self.expect_string(cursor, META_ID)?;
                        }
                        META_VALUE => {
                            let token = cursor.expect()?;
                            let Token::Scalar(scalar) = token else {
                                return Err(Fault::new(
                                    FaultKind::Format,
                                    cursor.path(),
                                    "`$value` must carry a scalar",
                                ));
                            };
                            let node = self.coerce_scalar(cursor, shape_used, scalar)?;
                            let end = cursor.expect()?;
                            if end != Token::ObjectEnd {
                                return Err(Fault::new(
                                    FaultKind::Format,
                                    cursor.path(),
                                    "`$value` wrapper has trailing members",
                                ));
                            }
                            return Ok(node);
                        }
                        other => {
                            return Err(Fault::new(
                                FaultKind::Format,
                                cursor.path(),
                                format!("unexpected member `{other}` in a scalar slot"),
                            ));
                        }
                    }
                }
            }
            Token::ConstructorStart(name) => self.read_constructor_scalar(cursor, shape, &name),
            other => Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                format!("expected a scalar, got {}", token_label(&other)),
            )),
        }
    }

    fn coerce_scalar(
        &self,
        cursor: &Cursor<'_>,
        shape: &'static Shape,
        scalar: Scalar,
    ) -> Result<Box<dyn Node>, Fault> {
        let Some(scalar_shape) = shape.as_scalar() else {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                format!("`{}` is not a scalar type", shape.ty().path()),
            ));
        };
        scalar_shape
            .from_scalar(scalar)
            .map_err(|err| construct_fault(cursor.path(), err))
    }

    /// `new Date(ms)` in a scalar slot.
    fn read_constructor_scalar(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
        name: &str,
    ) -> Result<Box<dyn Node>, Fault> {
        let mut args = Vec::new();
        loop {
            match cursor.expect()? {
                Token::ConstructorEnd => break,
                Token::Scalar(scalar) => args.push(scalar),
                other => {
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        format!("unexpected {} in constructor arguments", token_label(&other)),
                    ));
                }
            }
        }
        if name != "Date" {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                format!("unsupported constructor `new {name}(...)`"),
            ));
        }
        let date = constructor_date(&args).ok_or_else(|| {
            Fault::new(
                FaultKind::Format,
                cursor.path(),
                "`new Date(...)` needs one integer argument",
            )
        })?;
        self.coerce_scalar(cursor, shape, Scalar::Date(date))
    }

    // -------------------------------------------------------------------------
    // Collections

    fn read_array(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        let Shape::Array(array_shape) = shape else {
            unreachable!("read_array is only called for array shapes");
        };
        let mut node = array_shape.make();
        self.fill_array(cursor, &mut *node, array_shape.item(), depth)?;
        Ok(node)
    }

    /// Reads `[...]`, or the `{"$values": [...]}` wrapper, into `node`.
    fn fill_array(
        &mut self,
        cursor: &mut Cursor<'_>,
        node: &mut dyn Node,
        item_shape: &'static Shape,
        depth: usize,
    ) -> Result<(), Fault> {
        let token = cursor.expect()?;
        match token {
            Token::ArrayStart => {}
            Token::ObjectStart if self.metadata_honored() => {
                // Metadata-wrapped array: consume leading metadata, then
                // expect `$values`.
                loop {
                    let token = cursor.expect()?;
                    let Token::Property(name) = token else {
                        return Err(Fault::new(
                            FaultKind::Format,
                            cursor.path(),
                            "expected a `$values` wrapper member",
                        ));
                    };
                    match name.as_str() {
                        META_ID => {
                            let _ = self.expect_string(cursor, META_ID)?;
                        }
                        META_TYPE => {
                            let _ = self.bind_type(cursor)?;
                        }
                        META_VALUES => break,
                        other => {
                            return Err(Fault::new(
                                FaultKind::Format,
                                cursor.path(),
                                format!("unexpected member `{other}` in an array wrapper"),
                            ));
                        }
                    }
                }
                self.fill_array(cursor, node, item_shape, depth)?;
                let end = cursor.expect()?;
                if end != Token::ObjectEnd {
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        "array wrapper has trailing members",
                    ));
                }
                return Ok(());
            }
            other => {
                return Err(Fault::new(
                    FaultKind::Format,
                    cursor.path(),
                    format!("expected an array, got {}", token_label(&other)),
                ));
            }
        }

        let NodeMut::Array(target) = node.node_mut() else {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                "array shape over a non-array node",
            ));
        };
        loop {
            let token = cursor.expect()?;
            if token == Token::ArrayEnd {
                return Ok(());
            }
            cursor.unread(token);

            let depth_before = cursor.depth();
            let result = self
                .read_value(cursor, item_shape, None, depth + 1)
                .and_then(|item| {
                    target
                        .push(item)
                        .map_err(|err| Fault::new(FaultKind::Format, cursor.path(), err.to_string()))
                });
            if let Err(fault) = result {
                self.recovery.offer(self.settings, fault)?;
                cursor.recover_to(depth_before)?;
            }
        }
    }

    fn read_map(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        let Shape::Map(map_shape) = shape else {
            unreachable!("read_map is only called for map shapes");
        };
        let token = cursor.expect()?;
        if token != Token::ObjectStart {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                format!("expected an object, got {}", token_label(&token)),
            ));
        }
        let mut node = map_shape.make();
        self.fill_map(cursor, &mut *node, map_shape.value(), depth)?;
        Ok(node)
    }

    /// Reads members into a map node; `ObjectStart` is already consumed.
    fn fill_map(
        &mut self,
        cursor: &mut Cursor<'_>,
        node: &mut dyn Node,
        value_shape: &'static Shape,
        depth: usize,
    ) -> Result<(), Fault> {
        let NodeMut::Map(target) = node.node_mut() else {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                "map shape over a non-map node",
            ));
        };
        loop {
            let token = cursor.expect()?;
            match token {
                Token::ObjectEnd => return Ok(()),
                Token::Property(key) => {
                    if is_metadata(&key) && self.metadata_honored() {
                        self.settings.trace().event(
                            TraceLevel::Info,
                            &cursor.path(),
                            "metadata member skipped in a map",
                        );
                        cursor.skip_value()?;
                        continue;
                    }
                    if is_metadata(&key) && self.settings.metadata() == MetadataHandling::Error {
                        return Err(metadata_refused(cursor, &key));
                    }
                    let depth_before = cursor.depth();
                    let result = self
                        .read_value(cursor, value_shape, None, depth + 1)
                        .and_then(|value| {
                            target.insert_entry(key.clone(), value).map_err(|err| {
                                Fault::new(FaultKind::Format, cursor.path(), err.to_string())
                                    .with_member(key.clone())
                            })
                        });
                    if let Err(fault) = result {
                        self.recovery.offer(self.settings, fault)?;
                        cursor.recover_to(depth_before)?;
                    }
                }
                other => {
                    return Err(Fault::new(
                        FaultKind::Structural,
                        cursor.path(),
                        format!("expected a member name, got {}", token_label(&other)),
                    ));
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Objects

    fn read_object(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        if self.settings.metadata() == MetadataHandling::ReadAhead {
            self.reorder_metadata(cursor)?;
        }
        let token = cursor.expect()?;
        if token != Token::ObjectStart {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                format!("expected an object, got {}", token_label(&token)),
            ));
        }

        let meta = self.leading_metadata(cursor)?;
        if meta.reference.is_some() {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                "back-reference into a slot that cannot share",
            ));
        }
        if let Some(id) = &meta.id {
            self.settings.trace().event(
                TraceLevel::Info,
                &cursor.path(),
                &format!("`$id` {id} on an unshared object is not tracked"),
            );
        }

        let mut shape_used = shape;
        if let Some(name) = &meta.type_name {
            match self.settings.binder().resolve(name) {
                Some(registration) if registration.shape().as_object().is_some() => {
                    shape_used = registration.shape();
                }
                Some(_) | None => {
                    let fault = Fault::new(
                        FaultKind::TypeResolution,
                        cursor.path(),
                        format!("`$type` `{name}` does not bind to an object type"),
                    );
                    // Handled means: fall back to the declared shape.
                    self.recovery.offer(self.settings, fault)?;
                }
            }
        }

        let contract = self.resolve(shape_used, cursor.path())?;
        let Some(object) = contract.as_object() else {
            return Err(Fault::new(
                FaultKind::UnsupportedValue,
                cursor.path(),
                format!("`{}` has no object contract", shape_used.ty().path()),
            ));
        };
        self.build_object(cursor, object, depth)
    }

    /// Consumes leading metadata members; stops before the first plain one.
    fn leading_metadata(&mut self, cursor: &mut Cursor<'_>) -> Result<Metadata, Fault> {
        let mut meta = Metadata::default();
        loop {
            let token = cursor.expect()?;
            let Token::Property(name) = &token else {
                cursor.unread(token);
                return Ok(meta);
            };
            if !is_metadata(name) {
                cursor.unread(token);
                return Ok(meta);
            }
            match self.settings.metadata() {
                MetadataHandling::Ignore => {
                    cursor.unread(token);
                    return Ok(meta);
                }
                MetadataHandling::Error => {
                    let name = name.clone();
                    return Err(metadata_refused(cursor, &name));
                }
                MetadataHandling::Default | MetadataHandling::ReadAhead => {}
            }
            match name.as_str() {
                META_ID => meta.id = Some(self.expect_string(cursor, META_ID)?),
                META_REF => meta.reference = Some(self.expect_string(cursor, META_REF)?),
                META_TYPE => meta.type_name = Some(self.expect_string(cursor, META_TYPE)?),
                _ => {
                    let name = name.clone();
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        format!("unexpected metadata member `{name}`"),
                    ));
                }
            }
        }
    }

    fn expect_string(&mut self, cursor: &mut Cursor<'_>, what: &str) -> Result<String, Fault> {
        let token = cursor.expect()?;
        match token {
            Token::Scalar(Scalar::Str(text)) => Ok(text),
            Token::Scalar(Scalar::Int(n)) => Ok(n.to_string()),
            Token::Scalar(Scalar::UInt(n)) => Ok(n.to_string()),
            other => Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                format!("`{what}` must be a string, got {}", token_label(&other)),
            )),
        }
    }

    /// Resolves an inline `$type` member, returning the bound shape.
    fn bind_type(&mut self, cursor: &mut Cursor<'_>) -> Result<Option<&'static Shape>, Fault> {
        let name = self.expect_string(cursor, META_TYPE)?;
        match self.settings.binder().resolve(&name) {
            Some(registration) => Ok(Some(registration.shape())),
            None => {
                let fault = Fault::new(
                    FaultKind::TypeResolution,
                    cursor.path(),
                    format!("`$type` `{name}` does not bind to a registered type"),
                );
                self.recovery.offer(self.settings, fault)?;
                Ok(None)
            }
        }
    }

    /// Builds an object instance; `ObjectStart` and leading metadata are
    /// already consumed.
    fn build_object(
        &mut self,
        cursor: &mut Cursor<'_>,
        contract: &ObjectContract,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        match contract.construct() {
            Construct::FromBag(build) => {
                let mut bag = MemberBag::new();
                self.read_members(cursor, contract, depth, &mut Target::Bag(&mut bag))?;
                build(&mut bag).map_err(|err| construct_fault(cursor.path(), err))
            }
            Construct::Factory(make) | Construct::Empty(make) => {
                let mut node = make();
                self.populate_object(cursor, contract, &mut *node, depth)?;
                Ok(node)
            }
            Construct::NonInstantiable => Err(Fault::new(
                FaultKind::UnsupportedValue,
                cursor.path(),
                format!("`{}` cannot be instantiated", contract.object_shape().ty().path()),
            )),
        }
    }

    fn populate_object(
        &mut self,
        cursor: &mut Cursor<'_>,
        contract: &ObjectContract,
        node: &mut dyn Node,
        depth: usize,
    ) -> Result<(), Fault> {
        let NodeMut::Object(target) = node.node_mut() else {
            return Err(Fault::new(
                FaultKind::Format,
                cursor.path(),
                "object contract over a non-object node",
            ));
        };
        self.read_members(cursor, contract, depth, &mut Target::Node(target))
    }

    /// Reads members through `ObjectEnd` into the target, applying
    /// missing-member policy, extension data and the required check.
    fn read_members(
        &mut self,
        cursor: &mut Cursor<'_>,
        contract: &ObjectContract,
        depth: usize,
        target: &mut Target<'_>,
    ) -> Result<(), Fault> {
        let mut seen: HashSet<&'static str> = HashSet::new();
        let mut extension: Option<Value> = None;

        loop {
            let token = cursor.expect()?;
            match token {
                Token::ObjectEnd => break,
                Token::Property(name) => {
                    if is_metadata(&name) && self.settings.metadata() != MetadataHandling::Ignore {
                        if self.settings.metadata() == MetadataHandling::Error {
                            return Err(metadata_refused(cursor, &name));
                        }
                        // Late metadata under the leading-position policy.
                        self.settings.trace().event(
                            TraceLevel::Info,
                            &cursor.path(),
                            &format!("metadata member `{name}` past the object head is skipped"),
                        );
                        cursor.skip_value()?;
                        continue;
                    }
                    match contract.property(&name) {
                        Some(property) if property.ignored() => {
                            cursor.skip_value()?;
                        }
                        Some(property) => {
                            seen.insert(property.declared());
                            let depth_before = cursor.depth();
                            let result = self
                                .read_value(
                                    cursor,
                                    property.shape(),
                                    property.converter(),
                                    depth + 1,
                                )
                                .and_then(|value| {
                                    target.store(property.declared(), value).map_err(|err| {
                                        Fault::new(
                                            FaultKind::Format,
                                            cursor.path(),
                                            err.to_string(),
                                        )
                                    })
                                });
                            if let Err(fault) = result {
                                let fault = fault.with_member(name.clone());
                                self.recovery.offer(self.settings, fault)?;
                                cursor.recover_to(depth_before)?;
                            }
                        }
                        None if contract.extension_slot().is_some() => {
                            let value = self.read_untyped(cursor, depth + 1)?;
                            extension
                                .get_or_insert_with(|| Value::Object(Vec::new()))
                                .set_member(&name, value);
                        }
                        None => match self.settings.missing_members() {
                            MissingMemberHandling::Ignore => cursor.skip_value()?,
                            MissingMemberHandling::Error => {
                                let fault = Fault::new(
                                    FaultKind::MissingMember,
                                    name.clone(),
                                    format!(
                                        "`{}` has no member for `{name}`",
                                        contract.object_shape().ty().path()
                                    ),
                                )
                                .with_member(name.clone());
                                self.recovery.offer(self.settings, fault)?;
                                cursor.skip_value()?;
                            }
                        },
                    }
                }
                other => {
                    return Err(Fault::new(
                        FaultKind::Structural,
                        cursor.path(),
                        format!("expected a member name, got {}", token_label(&other)),
                    ));
                }
            }
        }

        for property in contract.properties() {
            if property.required() && !property.ignored() && !seen.contains(property.declared()) {
                let fault = Fault::new(
                    FaultKind::RequiredMember,
                    cursor.path(),
                    format!("required member `{}` is missing", property.name()),
                )
                .with_member(property.name().to_owned());
                self.recovery.offer(self.settings, fault)?;
            }
        }

        if let (Some(value), Some(slot)) = (extension, contract.extension_slot()) {
            target.store(slot.declared(), Box::new(value)).map_err(|err| {
                Fault::new(FaultKind::Format, cursor.path(), err.to_string())
            })?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Shared handles

    fn read_shared(
        &mut self,
        cursor: &mut Cursor<'_>,
        shape: &'static Shape,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        let Shape::Shared(shared_shape) = shape else {
            unreachable!("read_shared is only called for shared shapes");
        };
        let wrap = |inner: Box<dyn Node>, path: String| {
            shared_shape
                .wrap(inner)
                .map_err(|err| construct_fault(path, err))
        };

        if !shared_shape.tracked() || !self.metadata_honored() {
            let inner = self.read_value(cursor, shared_shape.inner(), None, depth)?;
            return wrap(inner, cursor.path());
        }

        if self.settings.metadata() == MetadataHandling::ReadAhead {
            self.reorder_metadata(cursor)?;
        }

        let token = cursor.expect()?;
        if token != Token::ObjectStart {
            // Arrays and scalars behind a handle carry no metadata.
            cursor.unread(token);
            let inner = self.read_value(cursor, shared_shape.inner(), None, depth)?;
            return wrap(inner, cursor.path());
        }

        let head = cursor.expect()?;
        match &head {
            Token::Property(name) if name == META_REF => {
                let id = self.expect_string(cursor, META_REF)?;
                let end = cursor.expect()?;
                if end != Token::ObjectEnd {
                    return Err(Fault::new(
                        FaultKind::Reference,
                        cursor.path(),
                        "a `$ref` object can have no other members",
                    ));
                }
                self.resolve_reference(cursor, shape, &id)
            }
            Token::Property(name) if name == META_ID => {
                let id = self.expect_string(cursor, META_ID)?;
                if let Some(cell) = shared_shape.make_cell() {
                    self.read_into_cell(cursor, shared_shape.inner(), cell, &id, depth)
                } else {
                    // No pre-registrable target: build first, register after.
                    cursor.unread(Token::ObjectStart);
                    let inner = self.read_value(cursor, shared_shape.inner(), None, depth)?;
                    let handle = wrap(inner, cursor.path())?;
                    self.register_handle(cursor, &*handle, &id)?;
                    Ok(handle)
                }
            }
            _ => {
                cursor.unread(head);
                cursor.unread(Token::ObjectStart);
                let inner = self.read_value(cursor, shared_shape.inner(), None, depth)?;
                wrap(inner, cursor.path())
            }
        }
    }

    /// Registers a blank cell under its `$id`, then populates its target
    /// from the remaining members. Descendant `$ref`s back into this cell
    /// resolve mid-population.
    fn read_into_cell(
        &mut self,
        cursor: &mut Cursor<'_>,
        inner_shape: &'static Shape,
        mut cell: Box<dyn Node>,
        id: &str,
        depth: usize,
    ) -> Result<Box<dyn Node>, Fault> {
        self.register_handle(cursor, &*cell, id)?;

        let contract = self.resolve(inner_shape, cursor.path())?;
        let Some(object) = contract.as_object() else {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                format!(
                    "`$id` on `{}` needs an object target",
                    inner_shape.ty().path()
                ),
            ));
        };

        let NodeMut::Shared(handle) = cell.node_mut() else {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                "shared shape over a non-shared node",
            ));
        };
        let mut outcome = Ok(());
        handle
            .with_target_mut(&mut |target| {
                outcome = self.populate_object(cursor, object, target, depth);
            })
            .map_err(|err| Fault::new(FaultKind::Reference, cursor.path(), err.to_string()))?;
        outcome?;
        Ok(cell)
    }

    fn register_handle(
        &mut self,
        cursor: &Cursor<'_>,
        handle: &dyn Node,
        id: &str,
    ) -> Result<(), Fault> {
        let clone = match handle.node_ref() {
            NodeRef::Shared(shared) => shared.clone_handle(),
            _ => None,
        };
        let Some(clone) = clone else {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                "handle kind cannot be registered under a `$id`",
            ));
        };
        if !self.tracker.register(id.to_owned(), clone) {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                format!("duplicate `$id` `{id}`"),
            ));
        }
        Ok(())
    }

    fn resolve_reference(
        &mut self,
        cursor: &Cursor<'_>,
        shape: &'static Shape,
        id: &str,
    ) -> Result<Box<dyn Node>, Fault> {
        let Some(registered) = self.tracker.get(id) else {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                format!("`$ref` `{id}` does not name a known `$id`"),
            ));
        };
        if registered.shape().ty().id() != shape.ty().id() {
            return Err(Fault::new(
                FaultKind::Reference,
                cursor.path(),
                format!(
                    "`$ref` `{id}` is a `{}`, not a `{}`",
                    registered.type_path(),
                    shape.ty().path()
                ),
            ));
        }
        let clone = match registered.node_ref() {
            NodeRef::Shared(shared) => shared.clone_handle(),
            _ => None,
        };
        clone.ok_or_else(|| {
            Fault::new(
                FaultKind::Reference,
                cursor.path(),
                format!("`$ref` `{id}` cannot be cloned"),
            )
        })
    }

    // -------------------------------------------------------------------------
    // Read-ahead

    /// Buffers the next value and, when it is an object, moves its
    /// top-level metadata members to the front.
    fn reorder_metadata(&mut self, cursor: &mut Cursor<'_>) -> Result<(), Fault> {
        let token = cursor.expect()?;
        if token != Token::ObjectStart {
            cursor.unread(token);
            return Ok(());
        }
        cursor.unread(Token::ObjectStart);

        let mut buffer = TokenBuffer::new();
        buffer.buffer_value(cursor).map_err(Fault::from)?;
        let tokens: Vec<Token> = buffer.iter().cloned().collect();

        let mut meta: Vec<Token> = Vec::new();
        let mut rest: Vec<Token> = Vec::new();
        let mut nesting = 0isize;
        let mut index = 0usize;
        // tokens[0] is ObjectStart, the last token its ObjectEnd.
        let body_end = tokens.len().saturating_sub(1);
        while index < body_end {
            let token = &tokens[index];
            if index == 0 {
                index += 1;
                continue;
            }
            if nesting == 0 {
                if let Token::Property(name) = token {
                    let sink = if is_metadata(name) { &mut meta } else { &mut rest };
                    sink.push(token.clone());
                    index += 1;
                    // Carry the member's complete value along.
                    let mut value_depth = 0isize;
                    while index < body_end {
                        let value_token = &tokens[index];
                        sink.push(value_token.clone());
                        if value_token.opens_container() {
                            value_depth += 1;
                        } else if value_token.closes_container() {
                            value_depth -= 1;
                        }
                        index += 1;
                        if value_depth == 0 && !matches!(value_token, Token::Comment(_)) {
                            break;
                        }
                    }
                    continue;
                }
            }
            if token.opens_container() {
                nesting += 1;
            } else if token.closes_container() {
                nesting -= 1;
            }
            rest.push(token.clone());
            index += 1;
        }

        cursor.unread(Token::ObjectEnd);
        for token in rest.into_iter().rev() {
            cursor.unread(token);
        }
        for token in meta.into_iter().rev() {
            cursor.unread(token);
        }
        cursor.unread(Token::ObjectStart);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Untyped values

    fn read_untyped(&mut self, cursor: &mut Cursor<'_>, depth: usize) -> Result<Value, Fault> {
        if depth > self.settings.max_depth() {
            return Err(self.depth_fault(cursor));
        }
        let token = cursor.expect()?;
        match token {
            Token::Scalar(scalar) => Ok(Value::from(scalar)),
            Token::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    let token = cursor.expect()?;
                    if token == Token::ArrayEnd {
                        return Ok(Value::Array(items));
                    }
                    cursor.unread(token);
                    items.push(self.read_untyped(cursor, depth + 1)?);
                }
            }
            Token::ObjectStart => {
                let mut members = Vec::new();
                loop {
                    let token = cursor.expect()?;
                    match token {
                        Token::ObjectEnd => return Ok(Value::Object(members)),
                        Token::Property(name) => {
                            let value = self.read_untyped(cursor, depth + 1)?;
                            members.push((name, value));
                        }
                        other => {
                            return Err(Fault::new(
                                FaultKind::Structural,
                                cursor.path(),
                                format!("expected a member name, got {}", token_label(&other)),
                            ));
                        }
                    }
                }
            }
            Token::ConstructorStart(name) => {
                let mut args = Vec::new();
                loop {
                    match cursor.expect()? {
                        Token::ConstructorEnd => break,
                        Token::Scalar(scalar) => args.push(scalar),
                        other => {
                            return Err(Fault::new(
                                FaultKind::Format,
                                cursor.path(),
                                format!(
                                    "unexpected {} in constructor arguments",
                                    token_label(&other)
                                ),
                            ));
                        }
                    }
                }
                if name == "Date" {
                    if let Some(date) = constructor_date(&args) {
                        return Ok(Value::String(date.format_iso()));
                    }
                }
                Err(Fault::new(
                    FaultKind::Format,
                    cursor.path(),
                    format!("unsupported constructor `new {name}(...)`"),
                ))
            }
            other => Err(Fault::new(
                FaultKind::Structural,
                cursor.path(),
                format!("unexpected {}", token_label(&other)),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Populate

    /// Reads one value into an existing node, keeping what the wire does
    /// not mention: arrays start over, objects and maps keep their other
    /// members.
    fn populate_node(
        &mut self,
        cursor: &mut Cursor<'_>,
        node: &mut dyn Node,
        depth: usize,
    ) -> Result<(), Fault> {
        if depth > self.settings.max_depth() {
            return Err(self.depth_fault(cursor));
        }
        let shape = node.shape();

        // Collections hand `node` back to the fill helpers, so they are
        // dispatched on the shape before the write view is taken.
        match shape {
            Shape::Array(array_shape) => {
                if let NodeMut::Array(target) = node.node_mut() {
                    target.clear();
                }
                return self.fill_array(cursor, node, array_shape.item(), depth);
            }
            Shape::Map(map_shape) => {
                let token = cursor.expect()?;
                if token != Token::ObjectStart {
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        format!("expected an object, got {}", token_label(&token)),
                    ));
                }
                return self.fill_map(cursor, node, map_shape.value(), depth);
            }
            _ => {}
        }

        match node.node_mut() {
            NodeMut::Object(target) => {
                let token = cursor.expect()?;
                if token != Token::ObjectStart {
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        format!("expected an object, got {}", token_label(&token)),
                    ));
                }
                let meta = self.leading_metadata(cursor)?;
                if meta.reference.is_some() {
                    return Err(Fault::new(
                        FaultKind::Reference,
                        cursor.path(),
                        "back-reference into a slot that cannot share",
                    ));
                }
                let contract = self.resolve(shape, cursor.path())?;
                let Some(object) = contract.as_object() else {
                    return Err(Fault::new(
                        FaultKind::UnsupportedValue,
                        cursor.path(),
                        format!("`{}` has no object contract", shape.ty().path()),
                    ));
                };
                self.read_members(cursor, object, depth, &mut Target::Node(target))
            }
            NodeMut::Array(_) | NodeMut::Map(_) => Err(Fault::new(
                FaultKind::UnsupportedValue,
                cursor.path(),
                format!("`{}` disagrees with its declared shape", shape.ty().path()),
            )),
            NodeMut::Scalar(target) => {
                let token = cursor.expect()?;
                let Token::Scalar(scalar) = token else {
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        format!("expected a scalar, got {}", token_label(&token)),
                    ));
                };
                target
                    .set(scalar)
                    .map_err(|err| Fault::new(FaultKind::Format, cursor.path(), err.to_string()))
            }
            NodeMut::Opt(target) => {
                let token = cursor.expect()?;
                if let Token::Scalar(scalar) = &token {
                    if scalar.is_null_like() {
                        target.set_none();
                        return Ok(());
                    }
                }
                cursor.unread(token);
                let Shape::Opt(opt) = shape else {
                    return Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        "option node without an option shape",
                    ));
                };
                let inner = self.read_value(cursor, opt.inner(), None, depth)?;
                target
                    .set_value(inner)
                    .map_err(|err| Fault::new(FaultKind::Format, cursor.path(), err.to_string()))
            }
            NodeMut::Shared(target) => {
                let mut outcome = Ok(());
                target
                    .with_target_mut(&mut |inner| {
                        outcome = self.populate_node(cursor, inner, depth);
                    })
                    .map_err(|err| {
                        Fault::new(FaultKind::Reference, cursor.path(), err.to_string())
                    })?;
                outcome
            }
            NodeMut::Dynamic(target) => {
                let value = self.read_untyped(cursor, depth)?;
                if let Value::Object(members) = value {
                    for (name, member) in members {
                        target.set_member(&name, member);
                    }
                    Ok(())
                } else {
                    Err(Fault::new(
                        FaultKind::Format,
                        cursor.path(),
                        "populate needs an object for a dynamic node",
                    ))
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Member targets

/// Where read members land: a bag for one-shot construction, or a live
/// instance populated in place.
enum Target<'t> {
    Bag(&'t mut MemberBag),
    Node(&'t mut dyn ObjectNode),
}

impl Target<'_> {
    fn store(
        &mut self,
        declared: &'static str,
        value: Box<dyn Node>,
    ) -> Result<(), OpsError> {
        match self {
            Target::Bag(bag) => {
                bag.insert(declared, value);
                Ok(())
            }
            Target::Node(node) => node.set_field(declared, value),
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn construct_fault(path: String, err: ConstructError) -> Fault {
    let kind = match &err {
        ConstructError::MissingMember(_) => FaultKind::RequiredMember,
        ConstructError::Mismatch { .. } | ConstructError::Failed(_) => FaultKind::Format,
        ConstructError::NotInstantiable(_) => FaultKind::UnsupportedValue,
    };
    Fault::new(kind, path, err.to_string())
}

fn metadata_refused(cursor: &Cursor<'_>, name: &str) -> Fault {
    Fault::new(
        FaultKind::Format,
        cursor.path(),
        format!("metadata member `{name}` is not allowed"),
    )
}

fn constructor_date(args: &[Scalar]) -> Option<JsonDate> {
    match args {
        [Scalar::Int(millis)] => Some(JsonDate::from_unix_millis(*millis)),
        [Scalar::UInt(millis)] => i64::try_from(*millis).ok().map(JsonDate::from_unix_millis),
        [Scalar::Date(date)] => Some(*date),
        _ => None,
    }
}

fn token_label(token: &Token) -> &'static str {
    match token {
        Token::ObjectStart => "an object start",
        Token::ObjectEnd => "an object end",
        Token::ArrayStart => "an array start",
        Token::ArrayEnd => "an array end",
        Token::Property(_) => "a member name",
        Token::ConstructorStart(_) => "a constructor",
        Token::ConstructorEnd => "a constructor end",
        Token::Comment(_) => "a comment",
        Token::Scalar(_) => "a scalar",
    }
}
