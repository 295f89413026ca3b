//! Fully decoded values
//!
//! The row processors never build these; they read straight off the stream.
//! `Value` is for tools and tests that want a whole structure in memory.

use std::io::{Read, Write};

use super::reader::TypedBytesReader;
use super::tag::TypeTag;
use super::writer::TypedBytesWriter;
use crate::error::{Result, TypedBytesError};

/// One TypedBytes value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bytes(Vec<u8>),
    Byte(i8),
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Raw string bytes; producers usually send UTF-8
    String(Vec<u8>),
    Vector(Vec<Value>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Byte payload under an application code in 50..=200
    Custom { code: u8, bytes: Vec<u8> },
}

impl Value {
    /// Wire tag this value is written under (custom values report ByteSequence)
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Bytes(_) | Value::Custom { .. } => TypeTag::ByteSequence,
            Value::Byte(_) => TypeTag::Byte,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Int(_) => TypeTag::Integer,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::Vector(_) => TypeTag::Vector,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
        }
    }

    /// Read the next value. `Ok(None)` at a clean end of stream.
    pub fn read<R: Read>(reader: &mut TypedBytesReader<R>) -> Result<Option<Self>> {
        match reader.try_next_tag()? {
            None => Ok(None),
            Some(TypeTag::ListEnd) => Err(TypedBytesError::UnexpectedListEnd),
            Some(tag) => Self::read_body(reader, tag).map(Some),
        }
    }

    fn read_element<R: Read>(reader: &mut TypedBytesReader<R>) -> Result<Option<Self>> {
        match reader.try_next_tag()? {
            None => Err(TypedBytesError::UnexpectedEof {
                context: "nested value",
            }),
            Some(TypeTag::ListEnd) => Ok(None),
            Some(tag) => Self::read_body(reader, tag).map(Some),
        }
    }

    fn read_required<R: Read>(reader: &mut TypedBytesReader<R>) -> Result<Self> {
        Self::read_element(reader)?.ok_or(TypedBytesError::UnexpectedListEnd)
    }

    fn read_body<R: Read>(reader: &mut TypedBytesReader<R>, tag: TypeTag) -> Result<Self> {
        Ok(match tag {
            TypeTag::ByteSequence => {
                let code = reader.last_code();
                let mut bytes = Vec::new();
                reader.read_byte_sequence(&mut bytes)?;
                if code == TypeTag::ByteSequence.code() {
                    Value::Bytes(bytes)
                } else {
                    Value::Custom { code, bytes }
                }
            }
            TypeTag::Byte => Value::Byte(reader.read_byte()?),
            TypeTag::Boolean => Value::Bool(reader.read_bool()?),
            TypeTag::Integer => Value::Int(reader.read_int()?),
            TypeTag::Long => Value::Long(reader.read_long()?),
            TypeTag::Float => Value::Float(reader.read_float()?),
            TypeTag::Double => Value::Double(reader.read_double()?),
            TypeTag::String => {
                let mut bytes = Vec::new();
                reader.read_string(&mut bytes)?;
                Value::String(bytes)
            }
            TypeTag::Vector => {
                let len = reader.read_sequence_length()?;
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(Self::read_required(reader)?);
                }
                Value::Vector(items)
            }
            TypeTag::Map => {
                let len = reader.read_sequence_length()?;
                let mut pairs = Vec::new();
                for _ in 0..len {
                    let key = Self::read_required(reader)?;
                    let value = Self::read_required(reader)?;
                    pairs.push((key, value));
                }
                Value::Map(pairs)
            }
            TypeTag::List => {
                let mut items = Vec::new();
                while let Some(item) = Self::read_element(reader)? {
                    items.push(item);
                }
                Value::List(items)
            }
            TypeTag::ListEnd => return Err(TypedBytesError::UnexpectedListEnd),
            TypeTag::TypeError => return Err(TypedBytesError::IllegalTag(reader.last_code())),
        })
    }

    pub fn write<W: Write>(&self, writer: &mut TypedBytesWriter<W>) -> Result<()> {
        match self {
            Value::Bytes(b) => writer.write_byte_sequence(b),
            Value::Byte(v) => writer.write_byte(*v),
            Value::Bool(v) => writer.write_bool(*v),
            Value::Int(v) => writer.write_int(*v),
            Value::Long(v) => writer.write_long(*v),
            Value::Float(v) => writer.write_float(*v),
            Value::Double(v) => writer.write_double(*v),
            Value::String(s) => writer.write_string(s),
            Value::Vector(items) => {
                writer.write_vector_start(items.len())?;
                items.iter().try_for_each(|item| item.write(writer))
            }
            Value::List(items) => {
                writer.write_list_start()?;
                for item in items {
                    item.write(writer)?;
                }
                writer.write_list_end()
            }
            Value::Map(pairs) => {
                writer.write_map_start(pairs.len())?;
                for (key, value) in pairs {
                    key.write(writer)?;
                    value.write(writer)?;
                }
                Ok(())
            }
            Value::Custom { code, bytes } => writer.write_custom(*code, bytes),
        }
    }
}

impl<W: Write> TypedBytesWriter<W> {
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        value.write(self)
    }
}
