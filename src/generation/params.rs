//! Render parameters: per-call projections of a record package.
//!
//! The field names of these structs are what templates reference
//! (`{{ ar_pkg }}`, `{% for f in field_list %}`, ...), so they are part of
//! the template contract and must stay stable. Parameters borrow from the
//! package and are handed to the renderer by shared reference only.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::package::{
    FieldDeclaration, FieldObject, FlagDeclaration, ImportDeclaration, IndexDeclaration,
    MutatorDeclaration, NamespaceDeclaration, ProcFieldDeclaration, RecordPackage,
    SerializerDeclaration, ServerDeclaration, TriggerDeclaration,
};

/// Linked packages keyed by package name
pub type LinkedPackages = BTreeMap<String, RecordPackage>;

static NO_LINKS: LinkedPackages = BTreeMap::new();

/// Parameters of a per-backend package render
#[derive(Debug, Clone, Serialize)]
pub struct PackageParams<'a> {
    pub ar_pkg: &'a str,
    pub ar_pkg_title: &'a str,
    pub field_list: &'a [FieldDeclaration],
    pub field_map: &'a BTreeMap<String, usize>,
    pub field_object: &'a BTreeMap<String, FieldObject>,
    pub linked_object: &'a LinkedPackages,
    pub proc_in_field_list: &'a [ProcFieldDeclaration],
    pub proc_out_field_list: Vec<ProcFieldDeclaration>,
    pub server: &'a ServerDeclaration,
    pub container: &'a NamespaceDeclaration,
    pub indexes: &'a [IndexDeclaration],
    pub serializers: &'a BTreeMap<String, SerializerDeclaration>,
    pub mutators: &'a BTreeMap<String, MutatorDeclaration>,
    pub imports: &'a [ImportDeclaration],
    pub triggers: &'a BTreeMap<String, TriggerDeclaration>,
    pub flags: &'a BTreeMap<String, FlagDeclaration>,
    pub app_info: &'a str,
}

impl<'a> PackageParams<'a> {
    pub fn new(app_info: &'a str, pkg: &'a RecordPackage) -> Self {
        Self {
            ar_pkg: &pkg.namespace.package_name,
            ar_pkg_title: &pkg.namespace.public_name,
            field_list: &pkg.fields,
            field_map: &pkg.fields_map,
            field_object: &pkg.fields_object_map,
            linked_object: &NO_LINKS,
            proc_in_field_list: &pkg.proc_in_fields,
            proc_out_field_list: pkg.proc_out_fields_ordered(),
            server: &pkg.server,
            container: &pkg.namespace,
            indexes: &pkg.indexes,
            serializers: &pkg.serializer_map,
            mutators: &pkg.mutator_map,
            imports: &pkg.imports,
            triggers: &pkg.trigger_map,
            flags: &pkg.flag_map,
            app_info,
        }
    }

    /// Attach the packages that cross-package references resolve against.
    pub fn with_links(mut self, links: &'a LinkedPackages) -> Self {
        self.linked_object = links;
        self
    }
}

/// Parameters of the repository-level meta render
#[derive(Debug, Clone, Serialize)]
pub struct MetaParams<'a> {
    pub namespaces: Vec<&'a RecordPackage>,
    pub app_info: &'a str,
}

impl<'a> MetaParams<'a> {
    pub fn new(app_info: &'a str, namespaces: impl IntoIterator<Item = &'a RecordPackage>) -> Self {
        Self {
            namespaces: namespaces.into_iter().collect(),
            app_info,
        }
    }
}

/// Parameters of a fixture render
#[derive(Debug, Clone, Serialize)]
pub struct FixtureParams<'a> {
    pub fixture_pkg: &'a str,
    pub ar_pkg: &'a str,
    pub ar_pkg_title: &'a str,
    pub field_list: &'a [FieldDeclaration],
    pub field_map: &'a BTreeMap<String, usize>,
    pub field_object: &'a BTreeMap<String, FieldObject>,
    pub proc_in_field_list: &'a [ProcFieldDeclaration],
    pub proc_out_field_list: Vec<ProcFieldDeclaration>,
    pub container: &'a NamespaceDeclaration,
    pub indexes: &'a [IndexDeclaration],
    pub serializers: &'a BTreeMap<String, SerializerDeclaration>,
    pub imports: &'a [ImportDeclaration],
    pub app_info: &'a str,
}

impl<'a> FixtureParams<'a> {
    pub fn new(
        app_info: &'a str,
        pkg: &'a RecordPackage,
        ar_pkg: &'a str,
        fixture_pkg: &'a str,
    ) -> Self {
        Self {
            fixture_pkg,
            ar_pkg,
            ar_pkg_title: &pkg.namespace.public_name,
            field_list: &pkg.fields,
            field_map: &pkg.fields_map,
            field_object: &pkg.fields_object_map,
            proc_in_field_list: &pkg.proc_in_fields,
            proc_out_field_list: pkg.proc_out_fields_ordered(),
            container: &pkg.namespace,
            indexes: &pkg.indexes,
            serializers: &pkg.serializer_map,
            imports: &pkg.imports,
            app_info,
        }
    }
}
