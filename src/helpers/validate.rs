// This file is part of the terraform-provider-azurerm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::OnceLock;

use regex::Regex;
use tf_provider::value::{Value, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics};

/// Check that a string is one of `allowed`
pub fn string_in_slice(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueString,
    allowed: &[&str],
    ignore_case: bool,
) {
    if let Value::Value(value) = value {
        let found = allowed.iter().any(|candidate| {
            if ignore_case {
                candidate.eq_ignore_ascii_case(value)
            } else {
                candidate == value
            }
        });
        if !found {
            diags.error(
                "Invalid value",
                format!("expected one of {allowed:?}, got {value:?}"),
                attr_path,
            );
        }
    }
}

/// Check that a string matches `pattern`
pub fn string_matches(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueString,
    pattern: &Regex,
    message: &str,
) {
    if let Value::Value(value) = value {
        if !pattern.is_match(value) {
            diags.error(
                "Invalid value",
                format!("{message}, got {value:?}"),
                attr_path,
            );
        }
    }
}

/// Check the length in characters of a string
pub fn string_length(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueString,
    min: usize,
    max: usize,
) {
    if let Value::Value(value) = value {
        let len = value.chars().count();
        if len < min || len > max {
            diags.error(
                "Invalid length",
                format!("expected length between {min} and {max}, got {len}"),
                attr_path,
            );
        }
    }
}

pub fn not_empty(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueString) {
    if let Value::Value(value) = value {
        if value.trim().is_empty() {
            diags.error_short("Value must not be empty", attr_path);
        }
    }
}

/// Check that an integer lies in `[min, max]`
pub fn int_between(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueNumber,
    min: i64,
    max: i64,
) {
    if let Value::Value(value) = value {
        if *value < min || *value > max {
            diags.error(
                "Value out of range",
                format!("expected a value between {min} and {max}, got {value}"),
                attr_path,
            );
        }
    }
}

pub fn int_at_least(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueNumber, min: i64) {
    int_between(diags, attr_path, value, min, i64::MAX)
}

fn duration_regex() -> &'static Regex {
    static DURATION: OnceLock<Regex> = OnceLock::new();
    DURATION.get_or_init(|| {
        regex(
            r"^P(?:\d+(?:\.\d+)?Y)?(?:\d+(?:\.\d+)?M)?(?:\d+(?:\.\d+)?W)?(?:\d+(?:\.\d+)?D)?(?:T(?:\d+(?:\.\d+)?H)?(?:\d+(?:\.\d+)?M)?(?:\d+(?:\.\d+)?S)?)?$",
        )
    })
}

/// Whether `value` is an ISO-8601 duration such as `PT5M` or `P1DT12H`
pub fn is_iso8601_duration(value: &str) -> bool {
    if value == "P" || value.ends_with('T') {
        return false;
    }
    duration_regex().is_match(value)
}

pub fn iso8601_duration(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueString) {
    if let Value::Value(value) = value {
        if !is_iso8601_duration(value) {
            diags.error(
                "Invalid duration",
                format!("expected an ISO 8601 duration such as PT5M, got {value:?}"),
                attr_path,
            );
        }
    }
}

/// Check that a string is an absolute file path, `/dir/file`
pub fn file_path(diags: &mut Diagnostics, attr_path: AttributePath, value: &ValueString) {
    if let Value::Value(value) = value {
        if !value.starts_with('/') || value.ends_with('/') || value.contains("//") {
            diags.error(
                "Invalid file path",
                format!("expected an absolute path to a file, such as /dir/file.txt, got {value:?}"),
                attr_path,
            );
        }
    }
}

/// Build a regex from a literal pattern
pub fn regex(pattern: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid pattern {pattern}: {err}"))
}
