//! Record package declarations consumed by the generator.
//!
//! A [`RecordPackage`] is produced by the schema layer and describes one
//! logical entity: its fields, indexes, serializers, triggers and the list
//! of storage backends it should be generated for. The generator treats
//! most of it as opaque data handed to templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Naming of a record package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDeclaration {
    /// Display name used in diagnostics and type names (e.g. `Account`)
    pub public_name: String,
    /// Internal module name, also the output directory (e.g. `account`)
    pub package_name: String,
    /// Storage-side object number (space / namespace id)
    #[serde(default)]
    pub object_name: String,
}

/// Storage server the generated code talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDeclaration {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub timeout: u64,
    /// Name of the runtime configuration entry, when the address is not fixed
    #[serde(default)]
    pub conf: String,
}

/// A single stored field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    /// Wire format of the field (`uint32`, `string`, `bool`, ...)
    pub format: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub mutators: Vec<String>,
    #[serde(default)]
    pub serializer: Vec<String>,
    /// Name of the linked object this field points at, if any
    #[serde(default)]
    pub object_link: String,
}

/// Procedure argument or result field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcFieldDeclaration {
    pub name: String,
    pub format: String,
    /// Position of the field in the procedure call
    #[serde(default)]
    pub order_index: usize,
    #[serde(default)]
    pub serializer: Vec<String>,
}

/// Link from this package to another record package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldObject {
    pub name: String,
    /// Field of the linked package used as the lookup key
    pub key: String,
    /// Name of the linked record package
    pub object_name: String,
    /// Local field holding the reference
    pub field: String,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDeclaration {
    pub name: String,
    /// Index number in the storage space
    pub num: u32,
    /// Generated selector method name
    pub selector: String,
    /// Positions into the package field list
    pub fields: Vec<usize>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    /// Name of the full index when this one is a prefix of it
    #[serde(default)]
    pub partial_of: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerDeclaration {
    pub name: String,
    /// Module path the serializer lives in
    pub pkg: String,
    /// Rust type produced by the serializer
    #[serde(rename = "type")]
    pub ty: String,
    pub marshal: String,
    pub unmarshal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutatorDeclaration {
    pub name: String,
    pub pkg: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub update: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDeclaration {
    pub name: String,
    pub pkg: String,
    pub func: String,
    #[serde(default)]
    pub params: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDeclaration {
    pub name: String,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// Module path being imported
    pub path: String,
    /// Local alias, empty when the import is not renamed
    #[serde(default)]
    pub alias: String,
}

/// One schema unit to be compiled into source files.
///
/// Name-keyed maps are ordered so that every render of the same package is
/// byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPackage {
    pub namespace: NamespaceDeclaration,
    #[serde(default)]
    pub server: ServerDeclaration,
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
    #[serde(default)]
    pub fields_map: BTreeMap<String, usize>,
    #[serde(default)]
    pub fields_object_map: BTreeMap<String, FieldObject>,
    #[serde(default)]
    pub proc_in_fields: Vec<ProcFieldDeclaration>,
    #[serde(default)]
    pub proc_out_fields: Vec<ProcFieldDeclaration>,
    #[serde(default)]
    pub indexes: Vec<IndexDeclaration>,
    #[serde(default)]
    pub serializer_map: BTreeMap<String, SerializerDeclaration>,
    #[serde(default)]
    pub mutator_map: BTreeMap<String, MutatorDeclaration>,
    #[serde(default)]
    pub trigger_map: BTreeMap<String, TriggerDeclaration>,
    #[serde(default)]
    pub flag_map: BTreeMap<String, FlagDeclaration>,
    #[serde(default)]
    pub imports: Vec<ImportDeclaration>,
    /// Requested backend identifiers, in declaration order
    #[serde(default)]
    pub backends: Vec<String>,
}

impl RecordPackage {
    pub fn new(public_name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            namespace: NamespaceDeclaration {
                public_name: public_name.into(),
                package_name: package_name.into(),
                object_name: String::new(),
            },
            ..Default::default()
        }
    }

    /// Append a field, keeping `fields_map` in step with `fields`.
    pub fn add_field(&mut self, field: FieldDeclaration) {
        self.fields_map.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
    }

    /// Rebuild `fields_map` from `fields`.
    ///
    /// Declarations loaded from disk may omit the map entirely.
    pub fn reindex_fields(&mut self) {
        self.fields_map = self
            .fields
            .iter()
            .enumerate()
            .map(|(pos, f)| (f.name.clone(), pos))
            .collect();
    }

    /// Procedure output fields sorted by their call position.
    pub fn proc_out_fields_ordered(&self) -> Vec<ProcFieldDeclaration> {
        let mut out = self.proc_out_fields.clone();
        out.sort_by_key(|f| f.order_index);
        out
    }

    pub fn display_name(&self) -> &str {
        &self.namespace.public_name
    }
}
