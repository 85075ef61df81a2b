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

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::config::MAX_PART_COUNT;
use crate::{Error, Result};

/// State of one part in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartState {
    /// Not dispatched yet.
    Pending,
    /// Being read, hashed or uploaded.
    InFlight,
    /// Acknowledged by the server.
    Uploaded,
    /// Gave up after retries.
    Failed,
}

/// PartTask is one byte range of the payload to upload as a part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTask {
    /// 1-based part number.
    pub part_number: u32,
    /// Byte range within the payload.
    pub range: Range<u64>,
    /// Base64 MD5 of the part, filled once the part has been read.
    pub content_md5: Option<String>,
    /// Requests sent for this part so far.
    pub attempts: u32,
    /// Current state.
    pub state: PartState,
}

impl PartTask {
    /// Create a pending task.
    pub fn new(part_number: u32, range: Range<u64>) -> Self {
        Self {
            part_number,
            range,
            content_md5: None,
            attempts: 0,
            state: PartState::Pending,
        }
    }

    /// Size of the part in bytes.
    pub fn size(&self) -> u64 {
        self.range.end - self.range.start
    }
}

/// A part acknowledged by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// eTag returned by the server.
    pub etag: String,
    /// Size of the part in bytes.
    pub size: u64,
}

/// A part as listed in the complete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// eTag returned when the part was uploaded.
    #[serde(rename = "eTag")]
    pub etag: String,
}

/// Split `total` bytes into parts of `part_size`.
///
/// Every part but the last one is exactly `part_size` bytes. An empty payload
/// still produces one empty part. Fails before any request is sent when a
/// non-final part would be smaller than `min_part_size`.
pub fn plan_parts(total: u64, part_size: u64, min_part_size: u64) -> Result<Vec<PartTask>> {
    if part_size == 0 {
        return Err(Error::config_invalid("part size must be positive"));
    }
    if total == 0 {
        return Ok(vec![PartTask::new(1, 0..0)]);
    }

    let count = total.div_ceil(part_size);
    if count > MAX_PART_COUNT as u64 {
        return Err(Error::config_invalid("payload needs too many parts")
            .with_context("parts", count.to_string())
            .with_context("max_parts", MAX_PART_COUNT.to_string()));
    }
    if count > 1 && part_size < min_part_size {
        return Err(Error::request_invalid("only the last part may be smaller than min part size")
            .with_part(1, count as usize)
            .with_context("part_size", part_size.to_string())
            .with_context("min_part_size", min_part_size.to_string()));
    }

    Ok((0..count)
        .map(|idx| {
            let start = idx * part_size;
            let end = (start + part_size).min(total);
            PartTask::new(idx as u32 + 1, start..end)
        })
        .collect())
}

/// Check a caller provided plan.
///
/// Part numbers must be contiguous from 1 with adjacent ranges, and only the
/// last part may be smaller than `min_part_size`.
pub fn validate_plan(plan: &[PartTask], min_part_size: u64) -> Result<()> {
    if plan.is_empty() {
        return Err(Error::request_invalid("upload plan has no parts"));
    }
    if plan.len() > MAX_PART_COUNT {
        return Err(Error::request_invalid("upload plan has too many parts")
            .with_context("parts", plan.len().to_string()));
    }

    let total = plan.len();
    let mut offset = plan[0].range.start;
    for (idx, task) in plan.iter().enumerate() {
        let expected = idx as u32 + 1;
        if task.part_number != expected {
            return Err(Error::request_invalid("part numbers must be contiguous from 1")
                .with_context("expected", expected.to_string())
                .with_context("found", task.part_number.to_string()));
        }
        if task.range.start != offset || task.range.end < task.range.start {
            return Err(Error::request_invalid("part ranges must be adjacent")
                .with_part(task.part_number, total));
        }
        if idx + 1 < total && task.size() < min_part_size {
            return Err(Error::request_invalid("only the last part may be smaller than min part size")
                .with_part(task.part_number, total)
                .with_context("size", task.size().to_string())
                .with_context("min_part_size", min_part_size.to_string()));
        }
        offset = task.range.end;
    }
    Ok(())
}

/// Check the part list of a complete request.
///
/// The list must be non-empty, sorted, and contiguous from 1.
pub fn validate_part_list(parts: &[CompletedPart]) -> Result<()> {
    if parts.is_empty() {
        return Err(Error::request_invalid("part list is empty"));
    }

    for (idx, part) in parts.iter().enumerate() {
        let expected = idx as u32 + 1;
        if part.part_number != expected {
            return Err(Error::request_invalid("part list must be contiguous from 1")
                .with_context("expected", expected.to_string())
                .with_context("found", part.part_number.to_string()));
        }
        if part.etag.is_empty() {
            return Err(Error::request_invalid("part has empty eTag")
                .with_part(part.part_number, parts.len()));
        }
    }
    Ok(())
}
