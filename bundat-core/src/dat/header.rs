//! Column descriptions applied to a dat file's fixed rows.

use crate::dat::width::Width;
use crate::error::{BundatError, Result};
use serde::{Deserialize, Serialize};

/// Type of one column. In JSON: `"bool"`, `{"integer":{"unsigned":true,"size":4}}`,
/// `{"array":"str"}` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Integer { unsigned: bool, size: u8 },
    Decimal { size: u8 },
    Str,
    SelfKey,
    ForeignKey,
    Array(Box<FieldKind>),
}

impl FieldKind {
    /// Bytes one value occupies, in a row or as an array element.
    pub fn stride(&self, width: Width) -> usize {
        let w = width.bytes();
        match self {
            FieldKind::Bool => 1,
            FieldKind::Integer { size, .. } | FieldKind::Decimal { size } => *size as usize,
            FieldKind::Str | FieldKind::SelfKey => w,
            FieldKind::ForeignKey | FieldKind::Array(_) => 2 * w,
        }
    }

    /// Rejects sizes the codec cannot read and nested arrays.
    pub fn check(&self) -> Result<()> {
        match self {
            FieldKind::Integer { size, .. } if !matches!(*size, 1 | 2 | 4 | 8) => Err(
                BundatError::Format(format!("integer size must be 1, 2, 4 or 8, got {size}")),
            ),
            FieldKind::Decimal { size } if !matches!(*size, 4 | 8) => Err(BundatError::Format(
                format!("decimal size must be 4 or 8, got {size}"),
            )),
            FieldKind::Array(inner) => match inner.as_ref() {
                FieldKind::Array(_) => Err(BundatError::Format("nested arrays are not supported".into())),
                other => other.check(),
            },
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub offset: usize,
    pub kind: FieldKind,
}

impl Header {
    pub fn new(offset: usize, kind: FieldKind) -> Self {
        Self { name: None, offset, kind }
    }

    pub fn named(name: impl Into<String>, offset: usize, kind: FieldKind) -> Self {
        Self { name: Some(name.into()), offset, kind }
    }

    pub fn length(&self, width: Width) -> usize {
        self.kind.stride(width)
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => format!("@{}", self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_follow_width() {
        let arr = FieldKind::Array(Box::new(FieldKind::Bool));
        assert_eq!(Header::new(0, arr.clone()).length(Width::Four), 8);
        assert_eq!(Header::new(0, arr).length(Width::Eight), 16);
        assert_eq!(Header::new(0, FieldKind::ForeignKey).length(Width::Four), 8);
        assert_eq!(Header::new(0, FieldKind::Str).length(Width::Eight), 8);
        assert_eq!(Header::new(0, FieldKind::Bool).length(Width::Eight), 1);
        let i16 = FieldKind::Integer { unsigned: false, size: 2 };
        assert_eq!(Header::new(0, i16).length(Width::Eight), 2);
    }

    #[test]
    fn check_rejects_bad_sizes_and_nesting() {
        assert!(FieldKind::Integer { unsigned: true, size: 3 }.check().is_err());
        assert!(FieldKind::Decimal { size: 2 }.check().is_err());
        let nested = FieldKind::Array(Box::new(FieldKind::Array(Box::new(FieldKind::Bool))));
        assert!(nested.check().is_err());
        assert!(FieldKind::Array(Box::new(FieldKind::Decimal { size: 8 })).check().is_ok());
    }

    #[test]
    fn json_shape() {
        let json = r#"[
            {"name": "Id", "offset": 0, "kind": "str"},
            {"offset": 8, "kind": {"integer": {"unsigned": true, "size": 4}}},
            {"offset": 12, "kind": {"array": "foreign_key"}}
        ]"#;
        let headers: Vec<Header> = serde_json::from_str(json).unwrap();
        assert_eq!(headers[0], Header::named("Id", 0, FieldKind::Str));
        assert_eq!(headers[1].kind, FieldKind::Integer { unsigned: true, size: 4 });
        assert_eq!(headers[2].kind, FieldKind::Array(Box::new(FieldKind::ForeignKey)));
        assert_eq!(headers[1].label(), "@8");
    }
}
