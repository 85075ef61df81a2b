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

use std::fmt::Debug;
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::{Error, Result};

/// PayloadSource is a byte range addressable payload.
///
/// Ranges may be read concurrently and in any order.
#[async_trait]
pub trait PayloadSource: Debug + Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Check if the payload is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly the bytes in `range`.
    async fn read_range(&self, range: Range<u64>) -> Result<Bytes>;
}

fn check_range(range: &Range<u64>, len: u64) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(Error::payload_invalid("range is out of payload bounds")
            .with_context("range", format!("{}..{}", range.start, range.end))
            .with_context("len", len.to_string()));
    }
    Ok(())
}

/// In memory payload.
#[derive(Debug, Clone)]
pub struct BytesSource(Bytes);

impl BytesSource {
    /// Create a new source from bytes.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self(content.into())
    }
}

#[async_trait]
impl PayloadSource for BytesSource {
    fn len(&self) -> u64 {
        self.0.len() as u64
    }

    async fn read_range(&self, range: Range<u64>) -> Result<Bytes> {
        check_range(&range, self.len())?;
        Ok(self.0.slice(range.start as usize..range.end as usize))
    }
}

/// Payload backed by a local file.
///
/// Every read opens its own handle, so concurrent parts never share a cursor.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    /// Open a file source, the length is taken when opening.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            Error::payload_invalid("failed to read file metadata")
                .with_context("path", path.display().to_string())
                .with_source(e)
        })?;
        if !meta.is_file() {
            return Err(Error::payload_invalid("payload path is not a regular file")
                .with_context("path", path.display().to_string()));
        }

        Ok(Self {
            path,
            len: meta.len(),
        })
    }

    /// Path of this file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PayloadSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_range(&self, range: Range<u64>) -> Result<Bytes> {
        check_range(&range, self.len)?;

        let with_path = |e: std::io::Error| {
            Error::payload_invalid("failed to read file range")
                .with_context("path", self.path.display().to_string())
                .with_source(e)
        };
        let mut file = tokio::fs::File::open(&self.path).await.map_err(with_path)?;
        file.seek(SeekFrom::Start(range.start))
            .await
            .map_err(with_path)?;

        let mut buf = vec![0; (range.end - range.start) as usize];
        file.read_exact(&mut buf).await.map_err(with_path)?;
        Ok(buf.into())
    }
}
