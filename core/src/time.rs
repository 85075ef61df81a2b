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

//! Time related utils.

use chrono::{SecondsFormat, Timelike, Utc};

use crate::{Error, Result};

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Current time truncated to whole seconds.
pub fn now() -> DateTime {
    truncate_to_seconds(Utc::now())
}

/// Drop the sub-second part of a time.
pub fn truncate_to_seconds(t: DateTime) -> DateTime {
    t.with_nanosecond(0).unwrap_or(t)
}

/// Format time into ISO 8601 with separators: "2015-04-27T08:23:49Z"
pub fn format_iso8601(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse time from ISO 8601 with separators: "2015-04-27T08:23:49Z"
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    Ok(chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| {
            Error::request_invalid("time is not a valid ISO 8601 timestamp")
                .with_context("time", s)
                .with_source(e)
        })?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_iso8601() {
        let t = Utc.with_ymd_and_hms(2015, 4, 27, 8, 23, 49).unwrap();
        assert_eq!("2015-04-27T08:23:49Z", format_iso8601(t));
    }

    #[test]
    fn test_parse_iso8601() -> Result<()> {
        let t = parse_iso8601("2015-04-27T08:23:49Z")?;
        assert_eq!(Utc.with_ymd_and_hms(2015, 4, 27, 8, 23, 49).unwrap(), t);

        assert!(parse_iso8601("2015-04-27 08:23:49").is_err());
        Ok(())
    }

    #[test]
    fn test_now_has_no_subseconds() {
        assert_eq!(0, now().nanosecond());
    }

    #[test]
    fn test_truncate_to_seconds() {
        let t = Utc.timestamp_opt(1_430_123_029, 999_999_999).unwrap();
        assert_eq!("2015-04-27T08:23:49Z", format_iso8601(truncate_to_seconds(t)));
    }
}
