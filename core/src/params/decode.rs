use std::fmt::Display;
use std::str::FromStr;

use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use super::ParameterMap;
use crate::error::ParamError;

type Result<T> = std::result::Result<T, ParamError>;

/// Top-level deserializer: presents the map as a record.
pub(super) struct ParameterDeserializer<'de> {
    map: &'de ParameterMap,
}

impl<'de> ParameterDeserializer<'de> {
    pub(super) fn new(map: &'de ParameterMap) -> Self {
        Self { map }
    }
}

impl<'de> de::Deserializer<'de> for ParameterDeserializer<'de> {
    type Error = ParamError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_map(Entries::new(self.map))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct map struct enum identifier ignored_any
    }
}

/// Walks the non-empty entries of a map; empty entries count as absent.
struct Entries<'de> {
    iter: Box<dyn Iterator<Item = (&'de str, &'de [String])> + 'de>,
    pending: Option<(&'de str, &'de [String])>,
}

impl<'de> Entries<'de> {
    fn new(map: &'de ParameterMap) -> Self {
        Self {
            iter: Box::new(map.iter().filter(|(_, values)| !values.is_empty())),
            pending: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for Entries<'de> {
    type Error = ParamError;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.iter.next() {
            Some((key, values)) => {
                self.pending = Some((key, values));
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let (key, values) = self
            .pending
            .take()
            .ok_or_else(|| ParamError::Custom("value requested before its key".to_string()))?;
        seed.deserialize(FieldDeserializer::field(key, values))
            .map_err(|err| err.within(key, values))
    }
}

/// Deserializes one field from its value list, or one list member.
struct FieldDeserializer<'de> {
    key: &'de str,
    values: &'de [String],
    member: bool,
}

impl<'de> FieldDeserializer<'de> {
    fn field(key: &'de str, values: &'de [String]) -> Self {
        Self {
            key,
            values,
            member: false,
        }
    }

    fn first(&self) -> &'de str {
        self.values.first().map(String::as_str).unwrap_or_default()
    }

    fn parse<T>(&self) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.first();
        raw.parse()
            .map_err(|err| ParamError::conversion(self.key, raw, err))
    }

    fn nested<T>(&self, what: &str) -> Result<T> {
        Err(ParamError::Unsupported(format!(
            "field `{}` cannot be decoded into a nested {what}",
            self.key
        )))
    }
}

macro_rules! parse_scalars {
    ($($method:ident => $visit:ident,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                visitor.$visit(self.parse()?)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for FieldDeserializer<'de> {
    type Error = ParamError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.values.len() > 1 && !self.member {
            self.deserialize_seq(visitor)
        } else {
            visitor.visit_borrowed_str(self.first())
        }
    }

    parse_scalars! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.first())
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.first())
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_str(self.first())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_bytes(self.first().as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_borrowed_bytes(self.first().as_bytes())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.member {
            return self.nested("sequence");
        }
        visitor.visit_seq(Members {
            key: self.key,
            iter: self.values.iter(),
        })
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        self.nested("map")
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        self.nested(&format!("struct `{name}`"))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(self.first().into_deserializer())
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

/// Yields each value of a list field as its own member.
struct Members<'de> {
    key: &'de str,
    iter: std::slice::Iter<'de, String>,
}

impl<'de> de::SeqAccess<'de> for Members<'de> {
    type Error = ParamError;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(FieldDeserializer {
                    key: self.key,
                    values: std::slice::from_ref(value),
                    member: true,
                })
                .map(Some)
                .map_err(|err| err.within(self.key, std::slice::from_ref(value))),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}
