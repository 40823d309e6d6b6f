/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::SystemTime;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const DATE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year][month][day]");

/// Formats a `SystemTime` as `YYYYMMDDTHHMMSSZ`
pub(crate) fn format_date_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&DATE_TIME_FORMAT)
        .expect("date-time format is infallible")
}

/// Formats a `SystemTime` as `YYYYMMDD`
pub(crate) fn format_date(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&DATE_FORMAT)
        .expect("date format is infallible")
}
