// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! `multipart/form-data` encoding.

use bytes::{BufMut, Bytes, BytesMut};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

use crate::{Error, Result};

const MAX_BOUNDARY_LEN: usize = 70;

/// Payload of a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes, written as is.
    Binary(Bytes),
}

impl Payload {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(v) => v.as_bytes(),
            Payload::Binary(v) => v,
        }
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<Bytes> for Payload {
    fn from(v: Bytes) -> Self {
        Payload::Binary(v)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Binary(v.into())
    }
}

/// FormEncoder builds a `multipart/form-data` body.
///
/// Fields are written in the order they were added. The boundary is fixed
/// when the encoder is created.
///
/// ```
/// use bcesign_upload::FormEncoder;
///
/// let mut form = FormEncoder::new("hahaha").unwrap();
/// form.add_field("key", "world.txt").unwrap();
/// assert_eq!(
///     &b"--hahaha\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\nworld.txt\r\n--hahaha--"[..],
///     &form.encode()[..]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FormEncoder {
    boundary: String,
    fields: Vec<(String, Payload)>,
}

impl FormEncoder {
    /// Create an encoder with the given boundary.
    ///
    /// The boundary must be 1 to 70 characters long without CR or LF.
    pub fn new(boundary: impl Into<String>) -> Result<Self> {
        let boundary = boundary.into();
        if boundary.is_empty()
            || boundary.len() > MAX_BOUNDARY_LEN
            || boundary.contains(['\r', '\n'])
        {
            return Err(Error::payload_invalid("multipart boundary is invalid")
                .with_context("boundary", boundary));
        }

        Ok(Self {
            boundary,
            fields: Vec::new(),
        })
    }

    /// Create an encoder with a random boundary.
    pub fn with_random_boundary() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Self {
            boundary: format!("bcesign-{suffix}"),
            fields: Vec::new(),
        }
    }

    /// The boundary of this encoder.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the `Content-Type` header for the encoded body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Number of fields added.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no field has been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a field.
    pub fn add_field(&mut self, name: &str, payload: impl Into<Payload>) -> Result<()> {
        check_field_name(name)?;
        self.fields.push((name.to_string(), payload.into()));
        Ok(())
    }

    /// Append a field from a dynamic value.
    ///
    /// Only strings are accepted; numbers, objects and other values are
    /// rejected without touching the encoder, they are never stringified.
    pub fn add_value(&mut self, name: &str, value: &Value) -> Result<()> {
        let Value::String(v) = value else {
            return Err(Error::payload_invalid("form field payload must be text or bytes")
                .with_context("field", name)
                .with_context("type", value_type(value)));
        };
        self.add_field(name, v.as_str())
    }

    /// Encode all fields into the body.
    ///
    /// Encoding doesn't consume the fields, calling it again yields the same
    /// bytes.
    pub fn encode(&self) -> Bytes {
        let size: usize = self
            .fields
            .iter()
            .map(|(name, payload)| {
                self.boundary.len() + name.len() + payload.as_bytes().len() + 50
            })
            .sum::<usize>()
            + self.boundary.len()
            + 4;

        let mut buf = BytesMut::with_capacity(size);
        for (name, payload) in &self.fields {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buf.put_slice(name.as_bytes());
            buf.put_slice(b"\"\r\n\r\n");
            buf.put_slice(payload.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--");

        buf.freeze()
    }
}

fn check_field_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['"', '\r', '\n']) {
        return Err(Error::payload_invalid("form field name is invalid").with_context("field", name));
    }
    Ok(())
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
