//! Octopus (tarantool 1.5) generator family.
//!
//! Produces the record module of a package (`octopus`) and, when the
//! package declares triggers, a separate `triggers` module.

use std::collections::HashMap;

use tera::Value;

use super::{BackendGenerator, BackendKind, RenderedUnit};
use crate::core::error::Diagnostic;
use crate::generation::functions::{FunctionSet, str_arg};
use crate::generation::params::PackageParams;
use crate::generation::renderer::TemplateRenderer;

pub const OCTOPUS_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/octopus/octopus.rs.tera"
));

pub const TRIGGERS_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/octopus/triggers.rs.tera"
));

/// Wire representation of a declared field format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFormat {
    /// Rust type of the struct field
    pub rust_type: &'static str,
    /// Suffix of the codec pack/unpack helpers
    pub codec: &'static str,
    /// Fixed size on the wire, 0 when variable
    pub size: u32,
}

const fn wire(rust_type: &'static str, codec: &'static str, size: u32) -> FieldFormat {
    FieldFormat {
        rust_type,
        codec,
        size,
    }
}

/// Look up a declared field format.
pub fn field_format(name: &str) -> Option<FieldFormat> {
    let f = match name {
        "bool" => wire("bool", "bool", 1),
        "uint8" => wire("u8", "u8", 1),
        "uint16" => wire("u16", "u16", 2),
        "uint32" | "uint" => wire("u32", "u32", 4),
        "uint64" => wire("u64", "u64", 8),
        "int8" => wire("i8", "i8", 1),
        "int16" => wire("i16", "i16", 2),
        "int32" | "int" => wire("i32", "i32", 4),
        "int64" => wire("i64", "i64", 8),
        "float32" => wire("f32", "f32", 4),
        "float64" => wire("f64", "f64", 8),
        "string" => wire("String", "str", 0),
        "bytes" | "[]byte" => wire("Vec<u8>", "bytes", 0),
        _ => return None,
    };
    Some(f)
}

fn lookup(name: &str) -> tera::Result<FieldFormat> {
    field_format(name)
        .ok_or_else(|| tera::Error::msg(format!("unsupported octopus field format `{name}`")))
}

fn format_value(value: &Value, helper: &str) -> tera::Result<FieldFormat> {
    let name = value
        .as_str()
        .ok_or_else(|| tera::Error::msg(format!("`{helper}` expects a format name")))?;
    lookup(name)
}

/// Helpers octopus templates rely on
pub fn template_functions() -> FunctionSet {
    FunctionSet::new()
        .filter("rust_type", |value: &Value, _: &HashMap<String, Value>| {
            Ok(Value::from(format_value(value, "rust_type")?.rust_type))
        })
        .filter("field_size", |value: &Value, _: &HashMap<String, Value>| {
            Ok(Value::from(format_value(value, "field_size")?.size))
        })
        .function("octopus_pack", |args| {
            let f = lookup(str_arg(args, "format", "octopus_pack")?)?;
            Ok(Value::String(format!("pack_{}", f.codec)))
        })
        .function("octopus_unpack", |args| {
            let f = lookup(str_arg(args, "format", "octopus_unpack")?)?;
            Ok(Value::String(format!("unpack_{}", f.codec)))
        })
}

pub struct OctopusGenerator;

impl BackendGenerator for OctopusGenerator {
    fn kind(&self) -> BackendKind {
        BackendKind::Octopus
    }

    fn generate(
        &self,
        renderer: &TemplateRenderer<'_>,
        params: &PackageParams<'_>,
    ) -> Result<Vec<RenderedUnit>, Diagnostic> {
        let backend = self.kind().as_str();
        let mut units = vec![RenderedUnit::new(
            "octopus",
            renderer.render(backend, OCTOPUS_TEMPLATE, params)?,
        )];

        if !params.triggers.is_empty() {
            units.push(RenderedUnit::new(
                "triggers",
                renderer.render(backend, TRIGGERS_TEMPLATE, params)?,
            ));
        }

        Ok(units)
    }
}
