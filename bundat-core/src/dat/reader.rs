//! Typed column reads over a [`DatFile`].
//!
//! Readers assume the header was validated against column stats first, so an
//! out-of-bounds read is reported as [`BundatError::Corruption`].

use crate::dat::file::DatFile;
use crate::dat::header::{FieldKind, Header};
use crate::dat::text::read_utf16;
use crate::dat::width::{P32, P64, SizeT, Width};
use crate::error::{BundatError, Result};
use crate::util::buf::{float_at, int_at, u8_at, uint_at};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Row index; `None` for the null marker.
    Key(Option<u64>),
    Array(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Key(Some(k)) => write!(f, "#{k}"),
            Value::Key(None) => f.write_str("null"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Reads one value starting at a byte offset of some region.
type ReadAt<'a> = Box<dyn Fn(usize) -> Result<Value> + Send + Sync + 'a>;

/// Reader for one column, built once per header and width.
pub struct FieldReader<'a> {
    dat: DatFile<'a>,
    offset: usize,
    read_at: ReadAt<'a>,
}

impl<'a> FieldReader<'a> {
    pub fn read(&self, row: usize) -> Result<Value> {
        if row >= self.dat.row_count {
            return Err(BundatError::Corruption(format!(
                "row {row} out of range ({} rows)",
                self.dat.row_count
            )));
        }
        (self.read_at)(row * self.dat.row_length + self.offset)
    }
}

pub fn get_field_reader<'a>(header: &Header, dat: &DatFile<'a>) -> Result<FieldReader<'a>> {
    header.kind.check()?;
    let end = header.offset.checked_add(header.length(dat.width));
    if end.is_none_or(|end| end > dat.row_length) {
        return Err(BundatError::Corruption(format!(
            "column {} does not fit in a {}-byte row",
            header.label(),
            dat.row_length
        )));
    }
    let read_at = match dat.width {
        Width::Four => field::<P32>(&header.kind, dat.fixed, dat),
        Width::Eight => field::<P64>(&header.kind, dat.fixed, dat),
    };
    Ok(FieldReader { dat: *dat, offset: header.offset, read_at })
}

pub fn read_column(header: &Header, dat: &DatFile<'_>) -> Result<Vec<Value>> {
    let reader = get_field_reader(header, dat)?;
    (0..dat.row_count).map(|row| reader.read(row)).collect()
}

fn out_of_bounds(what: &str, at: usize) -> BundatError {
    BundatError::Corruption(format!("{what} at {at} is out of bounds"))
}

/// Builds a reader for `kind` over `src`; pointers always resolve into the heap.
fn field<'a, S: SizeT>(kind: &FieldKind, src: &'a [u8], dat: &DatFile<'a>) -> ReadAt<'a> {
    let heap = dat.variable;
    match kind.clone() {
        FieldKind::Bool => Box::new(move |at| {
            let b = u8_at(src, at).ok_or_else(|| out_of_bounds("bool", at))?;
            Ok(Value::Bool(b != 0))
        }),
        FieldKind::Integer { unsigned: true, size } => Box::new(move |at| {
            let v = uint_at(src, at, size as usize).ok_or_else(|| out_of_bounds("integer", at))?;
            Ok(Value::UInt(v))
        }),
        FieldKind::Integer { unsigned: false, size } => Box::new(move |at| {
            let v = int_at(src, at, size as usize).ok_or_else(|| out_of_bounds("integer", at))?;
            Ok(Value::Int(v))
        }),
        FieldKind::Decimal { size } => Box::new(move |at| {
            let v = float_at(src, at, size as usize).ok_or_else(|| out_of_bounds("decimal", at))?;
            Ok(Value::Float(v))
        }),
        FieldKind::Str => Box::new(move |at| {
            let ptr = S::read(src, at).ok_or_else(|| out_of_bounds("string pointer", at))?;
            let ptr = usize::try_from(ptr).map_err(|_| out_of_bounds("string", at))?;
            if ptr >= heap.len() {
                return Err(out_of_bounds("string", ptr));
            }
            Ok(Value::Str(read_utf16(heap, ptr)?))
        }),
        // the second word of a foreign key is not surfaced
        FieldKind::SelfKey | FieldKind::ForeignKey => Box::new(move |at| {
            let k = S::read(src, at).ok_or_else(|| out_of_bounds("key", at))?;
            Ok(Value::Key((k != S::NULL).then_some(k)))
        }),
        FieldKind::Array(inner) => {
            let stride = inner.stride(dat.width) as u64;
            let element = field::<S>(&inner, heap, dat);
            Box::new(move |at| {
                let count = S::read(src, at).ok_or_else(|| out_of_bounds("array length", at))?;
                if count == 0 {
                    return Ok(Value::Array(Vec::new()));
                }
                let start = S::read(src, at + S::SIZE)
                    .ok_or_else(|| out_of_bounds("array offset", at))?;
                let end = count
                    .checked_mul(stride)
                    .and_then(|len| len.checked_add(start))
                    .filter(|&end| end <= heap.len() as u64)
                    .ok_or_else(|| out_of_bounds("array data", start as usize))?;
                (start..end)
                    .step_by(stride as usize)
                    .map(|el| element(el as usize))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            })
        }
    }
}
