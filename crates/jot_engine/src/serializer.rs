//! The user-facing entry point.

use jot_contracts::node::Node;
use jot_contracts::shape::{Shape, Shaped};
use jot_tokens::{JsonReader, JsonWriter, TokenSink, TokenSource};

use crate::error::{Fault, FaultKind};
use crate::read;
use crate::settings::Settings;
use crate::write;

/// Drives serialization and deserialization under one [`Settings`].
///
/// Each operation either succeeds outright, succeeds with faults the
/// recovery hook handled along the way (kept in [`faults`](Self::faults)
/// until the next operation), or aborts with the first unhandled fault.
///
/// ```
/// use jot_engine::Serializer;
///
/// let mut serializer = Serializer::new();
/// let names: Vec<String> = vec!["ada".into(), "grace".into()];
/// let json = serializer.serialize_to_string(&names).unwrap();
/// assert_eq!(json, r#"["ada","grace"]"#);
///
/// let back: Vec<String> = serializer.deserialize_from_str(&json).unwrap();
/// assert_eq!(back, names);
/// ```
pub struct Serializer {
    settings: Settings,
    faults: Vec<Fault>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    /// A serializer with default settings.
    pub fn new() -> Self {
        Self::with_settings(Settings::new())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            faults: Vec::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Faults the recovery hook handled during the last operation.
    #[inline]
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn take_faults(&mut self) -> Vec<Fault> {
        std::mem::take(&mut self.faults)
    }

    // -------------------------------------------------------------------------
    // Write

    /// Writes `node` as tokens into any sink.
    pub fn serialize(&mut self, node: &dyn Node, sink: &mut dyn TokenSink) -> Result<(), Fault> {
        self.faults = write::write_root(&self.settings, node, sink)?;
        Ok(())
    }

    /// Writes `node` as JSON text into a byte sink, honoring the settings'
    /// formatting, escape, non-finite and date policies.
    pub fn serialize_to_writer<W: std::io::Write>(
        &mut self,
        node: &dyn Node,
        out: W,
    ) -> Result<(), Fault> {
        let mut writer = JsonWriter::new(out)
            .with_formatting(self.settings.formatting())
            .with_escape_policy(self.settings.escape_policy())
            .with_non_finite(self.settings.non_finite())
            .with_date_format(self.settings.date_format());
        self.faults = write::write_root(&self.settings, node, &mut writer)?;
        writer.finish().map_err(Fault::from)
    }

    pub fn serialize_to_string(&mut self, node: &dyn Node) -> Result<String, Fault> {
        let mut out = Vec::new();
        self.serialize_to_writer(node, &mut out)?;
        String::from_utf8(out)
            .map_err(|err| Fault::new(FaultKind::UnsupportedValue, "", err.to_string()))
    }

    // -------------------------------------------------------------------------
    // Read

    /// Reads one value of `T` from a token source.
    pub fn deserialize<T: Shaped + Node>(
        &mut self,
        source: &mut dyn TokenSource,
    ) -> Result<T, Fault> {
        let node = self.deserialize_as(<T as Shaped>::shape(), source)?;
        let path = node.type_path();
        match node.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(Fault::new(
                FaultKind::Format,
                "",
                format!("deserialized a `{path}`, not a `{}`", T::type_path()),
            )),
        }
    }

    pub fn deserialize_from_str<T: Shaped + Node>(&mut self, json: &str) -> Result<T, Fault> {
        let mut reader =
            JsonReader::new(json.as_bytes()).with_date_parsing(self.settings.date_parsing());
        self.deserialize(&mut reader)
    }

    /// Reads one value of an explicit shape. With `$type` metadata on the
    /// wire the result can be a registered type other than the declared
    /// one; the caller downcasts.
    pub fn deserialize_as(
        &mut self,
        shape: &'static Shape,
        source: &mut dyn TokenSource,
    ) -> Result<Box<dyn Node>, Fault> {
        let (node, faults) = read::read_root(&self.settings, shape, source)?;
        self.faults = faults;
        Ok(node)
    }

    pub fn deserialize_as_from_str(
        &mut self,
        shape: &'static Shape,
        json: &str,
    ) -> Result<Box<dyn Node>, Fault> {
        let mut reader =
            JsonReader::new(json.as_bytes()).with_date_parsing(self.settings.date_parsing());
        self.deserialize_as(shape, &mut reader)
    }

    /// Reads into an existing value instead of building a new one. Objects
    /// and maps keep members the wire does not mention; arrays start over.
    /// Required-member checks still apply to objects the wire touches.
    pub fn populate(
        &mut self,
        node: &mut dyn Node,
        source: &mut dyn TokenSource,
    ) -> Result<(), Fault> {
        self.faults = read::populate_root(&self.settings, node, source)?;
        Ok(())
    }

    pub fn populate_from_str(&mut self, node: &mut dyn Node, json: &str) -> Result<(), Fault> {
        let mut reader =
            JsonReader::new(json.as_bytes()).with_date_parsing(self.settings.date_parsing());
        self.populate(node, &mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        let mut serializer = Serializer::new();
        let json = serializer.serialize_to_string(&42i32).unwrap();
        assert_eq!(json, "42");
        let back: i32 = serializer.deserialize_from_str(&json).unwrap();
        assert_eq!(back, 42);
    }

    #[test]
    fn faults_reset_between_operations() {
        let mut serializer = Serializer::new();
        serializer.serialize_to_string(&1u8).unwrap();
        assert!(serializer.faults().is_empty());
    }
}
