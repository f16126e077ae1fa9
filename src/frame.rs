// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! ROG frame formatting
//!
//! A record arrives as `|` delimited text. The receiving device expects every
//! field re-emitted in order behind a `ROG|` prefix, with the current date
//! spliced in after the second field and `%%%` marking the end of the frame.

use std::fmt;
use chrono::{Datelike, Local, NaiveDate};

// ============================================================================
// Frame Constants
// ============================================================================

/// Prefix that opens every frame
pub const FRAME_PREFIX: &str = "ROG|";

/// Field delimiter, used both for splitting records and terminating fields
pub const DELIMITER: char = '|';

/// End of frame sentinel
pub const SENTINEL: &str = "%%%";

/// The date token is written right after the field at this index
pub const DATE_FIELD_INDEX: usize = 1;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN",
    "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

// ============================================================================
// Date Token
// ============================================================================

/// Day, month abbreviation and two digit year, e.g. `5JUL24`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateToken(String);

impl DateToken {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = MONTHS[date.month0() as usize];
        let year = date.year().rem_euclid(100);
        DateToken(format!("{}{}{:02}", date.day(), month, year))
    }

    /// Token for the local calendar date
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A fully formatted frame, ready to be written to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Formatter
// ============================================================================

/// Format a record using today's date.
pub fn format(raw: &str) -> Frame {
    format_with_date(raw, &DateToken::today())
}

/// Format a record with an explicit date token.
///
/// Fields are split on `|` without dropping empties and each one is trimmed.
/// The date goes in purely by position: a record with fewer than two fields
/// never gets one. Formatting cannot fail.
pub fn format_with_date(raw: &str, date: &DateToken) -> Frame {
    let mut out = String::with_capacity(raw.len() + FRAME_PREFIX.len() + date.0.len() + 8);
    out.push_str(FRAME_PREFIX);

    for (i, field) in raw.split(DELIMITER).enumerate() {
        out.push_str(field.trim());
        out.push(DELIMITER);
        if i == DATE_FIELD_INDEX {
            out.push_str(date.as_str());
            out.push(DELIMITER);
        }
    }

    out.push_str(SENTINEL);
    Frame(out)
}
