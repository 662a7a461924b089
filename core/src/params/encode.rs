use serde::ser::{self, Impossible, Serialize, Serializer};

use super::ParameterMap;
use crate::error::ParamError;

type Result<T> = std::result::Result<T, ParamError>;

fn unsupported<T>(what: impl std::fmt::Display) -> Result<T> {
    Err(ParamError::Unsupported(what.to_string()))
}

/// Top-level serializer: accepts records, string-keyed maps and unit.
pub(super) struct ParameterSerializer<'a> {
    map: &'a mut ParameterMap,
}

impl<'a> ParameterSerializer<'a> {
    pub(super) fn new(map: &'a mut ParameterMap) -> Self {
        Self { map }
    }
}

macro_rules! reject_top_level {
    ($($method:ident($($arg:ident: $ty:ty),*),)*) => {
        $(
            fn $method(self, $($arg: $ty),*) -> Result<()> {
                let _ = ($($arg,)*);
                unsupported("top-level parameter shape must be a struct or a map")
            }
        )*
    };
}

impl<'a> ser::Serializer for ParameterSerializer<'a> {
    type Ok = ();
    type Error = ParamError;
    type SerializeSeq = Impossible<(), ParamError>;
    type SerializeTuple = Impossible<(), ParamError>;
    type SerializeTupleStruct = Impossible<(), ParamError>;
    type SerializeTupleVariant = Impossible<(), ParamError>;
    type SerializeMap = MapEncoder<'a>;
    type SerializeStruct = StructEncoder<'a>;
    type SerializeStructVariant = Impossible<(), ParamError>;

    reject_top_level! {
        serialize_bool(v: bool),
        serialize_i8(v: i8),
        serialize_i16(v: i16),
        serialize_i32(v: i32),
        serialize_i64(v: i64),
        serialize_u8(v: u8),
        serialize_u16(v: u16),
        serialize_u32(v: u32),
        serialize_u64(v: u64),
        serialize_f32(v: f32),
        serialize_f64(v: f64),
        serialize_char(v: char),
        serialize_str(v: &str),
        serialize_bytes(v: &[u8]),
        serialize_unit_variant(name: &'static str, index: u32, variant: &'static str),
    }

    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        unsupported(format_args!("enum variant `{variant}` as a parameter shape"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        unsupported("a sequence as a parameter shape")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        unsupported("a tuple as a parameter shape")
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        unsupported(format_args!("tuple struct `{name}` as a parameter shape"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        unsupported(format_args!("enum variant `{variant}` as a parameter shape"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(MapEncoder {
            map: self.map,
            key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(StructEncoder { map: self.map })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        unsupported(format_args!("enum variant `{variant}` as a parameter shape"))
    }
}

pub(super) struct StructEncoder<'a> {
    map: &'a mut ParameterMap,
}

impl ser::SerializeStruct for StructEncoder<'_> {
    type Ok = ();
    type Error = ParamError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(FieldSerializer {
            key,
            map: &mut *self.map,
        })
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

pub(super) struct MapEncoder<'a> {
    map: &'a mut ParameterMap,
    key: Option<String>,
}

impl ser::SerializeMap for MapEncoder<'_> {
    type Ok = ();
    type Error = ParamError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        match key.serialize(ScalarSerializer)? {
            Some(key) => {
                self.key = Some(key);
                Ok(())
            }
            None => unsupported("map keys must not be null"),
        }
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .key
            .take()
            .ok_or_else(|| ParamError::Custom("map value serialized before its key".to_string()))?;
        value.serialize(FieldSerializer {
            key: &key,
            map: &mut *self.map,
        })
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Serializes one field's value into zero or more entries under `key`.
struct FieldSerializer<'a> {
    key: &'a str,
    map: &'a mut ParameterMap,
}

impl FieldSerializer<'_> {
    fn push(self, value: Option<String>) -> Result<()> {
        if let Some(value) = value {
            self.map.append(self.key, value);
        }
        Ok(())
    }

    fn nested<T>(self, what: &str) -> Result<T> {
        unsupported(format_args!(
            "field `{}` holds a nested {what}; \
             only scalars, enums and lists of scalars are supported",
            self.key
        ))
    }
}

macro_rules! forward_scalars {
    ($($method:ident: $ty:ty,)*) => {
        $(
            fn $method(self, v: $ty) -> Result<()> {
                let value = ScalarSerializer.$method(v)?;
                self.push(value)
            }
        )*
    };
}

impl<'a> ser::Serializer for FieldSerializer<'a> {
    type Ok = ();
    type Error = ParamError;
    type SerializeSeq = SeqEncoder<'a>;
    type SerializeTuple = SeqEncoder<'a>;
    type SerializeTupleStruct = SeqEncoder<'a>;
    type SerializeTupleVariant = Impossible<(), ParamError>;
    type SerializeMap = Impossible<(), ParamError>;
    type SerializeStruct = Impossible<(), ParamError>;
    type SerializeStructVariant = Impossible<(), ParamError>;

    forward_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    }

    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.push(Some(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        self.nested("enum variant")
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SeqEncoder {
            key: self.key,
            map: self.map,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.nested("enum variant")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.nested("map")
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.nested("struct")
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.nested("enum variant")
    }
}

/// Appends one entry per sequence member.
struct SeqEncoder<'a> {
    key: &'a str,
    map: &'a mut ParameterMap,
}

impl SeqEncoder<'_> {
    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let encoded = value.serialize(ScalarSerializer).map_err(|err| match err {
            ParamError::Unsupported(_) => ParamError::Unsupported(format!(
                "field `{}` holds a nested collection; only lists of scalars are supported",
                self.key
            )),
            other => other,
        })?;
        if let Some(encoded) = encoded {
            self.map.append(self.key, encoded);
        }
        Ok(())
    }
}

impl ser::SerializeSeq for SeqEncoder<'_> {
    type Ok = ();
    type Error = ParamError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeTuple for SeqEncoder<'_> {
    type Ok = ();
    type Error = ParamError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for SeqEncoder<'_> {
    type Ok = ();
    type Error = ParamError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Renders a single scalar; `None` means "absent".
struct ScalarSerializer;

macro_rules! display_scalars {
    ($($method:ident: $ty:ty,)*) => {
        $(
            fn $method(self, v: $ty) -> Result<Option<String>> {
                Ok(Some(v.to_string()))
            }
        )*
    };
}

impl ser::Serializer for ScalarSerializer {
    type Ok = Option<String>;
    type Error = ParamError;
    type SerializeSeq = Impossible<Option<String>, ParamError>;
    type SerializeTuple = Impossible<Option<String>, ParamError>;
    type SerializeTupleStruct = Impossible<Option<String>, ParamError>;
    type SerializeTupleVariant = Impossible<Option<String>, ParamError>;
    type SerializeMap = Impossible<Option<String>, ParamError>;
    type SerializeStruct = Impossible<Option<String>, ParamError>;
    type SerializeStructVariant = Impossible<Option<String>, ParamError>;

    display_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Option<String>> {
        match std::str::from_utf8(v) {
            Ok(text) => Ok(Some(text.to_string())),
            Err(_) => unsupported("non UTF-8 bytes"),
        }
    }

    fn serialize_none(self) -> Result<Option<String>> {
        Ok(None)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Option<String>> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Option<String>> {
        Ok(None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Option<String>> {
        Ok(None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Option<String>> {
        Ok(Some(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Option<String>> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Option<String>> {
        unsupported(format_args!("enum variant `{variant}` with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        unsupported("nested sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        unsupported("nested tuple")
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        unsupported(format_args!("nested tuple struct `{name}`"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        unsupported(format_args!("enum variant `{variant}` with data"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        unsupported("nested map")
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        unsupported(format_args!("nested struct `{name}`"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        unsupported(format_args!("enum variant `{variant}` with data"))
    }
}
