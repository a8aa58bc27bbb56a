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

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock,
};
use tf_provider::value::{Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

/// Optional `timeouts` block shared by every resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeoutsState<'a> {
    #[serde(borrow = "'a")]
    pub create: ValueString<'a>,
    pub read: ValueString<'a>,
    pub update: ValueString<'a>,
    pub delete: ValueString<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

/// Default deadline of every operation of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn minutes(create_update_delete: u64, read: u64) -> Self {
        Self {
            create: Duration::from_secs(create_update_delete * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(create_update_delete * 60),
            delete: Duration::from_secs(create_update_delete * 60),
        }
    }

    pub fn get(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Deadline of `operation`, taking the `timeouts` block into account
    pub fn resolve(&self, block: &Value<TimeoutsState>, operation: Operation) -> Duration {
        let configured = block.as_ref_option().and_then(|block| {
            let value = match operation {
                Operation::Create => &block.create,
                Operation::Read => &block.read,
                Operation::Update => &block.update,
                Operation::Delete => &block.delete,
            };
            value.as_deref_option().and_then(|v| parse_duration(v).ok())
        });
        configured.unwrap_or_else(|| self.get(operation))
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::minutes(30, 5)
    }
}

/// Longest deadline accepted for a single operation
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 3600);

/// Parse durations such as `30m`, `1h30m` or `45s`
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(input.trim())
        .map_err(|err| format!("invalid duration {input:?}: {err}"))?;
    if duration > MAX_TIMEOUT {
        return Err(format!(
            "invalid duration {input:?}: must not exceed {}",
            humantime::format_duration(MAX_TIMEOUT)
        ));
    }
    Ok(duration)
}

pub fn schema(timeouts: &Timeouts) -> NestedBlock {
    let attribute = |operation: &str, default: Duration| Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(format!(
            "Deadline of the {operation} operation (default: {}m)",
            default.as_secs() / 60
        )),
        constraint: AttributeConstraint::Optional,
        ..Default::default()
    };
    NestedBlock::Optional(Block {
        attributes: map! {
            "create" => attribute("create", timeouts.create),
            "read" => attribute("read", timeouts.read),
            "update" => attribute("update", timeouts.update),
            "delete" => attribute("delete", timeouts.delete),
        },
        description: Description::plain("Operation deadlines"),
        ..Default::default()
    })
}

pub fn validate(diags: &mut Diagnostics, attr_path: AttributePath, block: &Value<TimeoutsState>) {
    let Value::Value(block) = block else {
        return;
    };
    for (name, value) in [
        ("create", &block.create),
        ("read", &block.read),
        ("update", &block.update),
        ("delete", &block.delete),
    ] {
        if let Value::Value(value) = value {
            if let Err(err) = parse_duration(value) {
                diags.error("Invalid timeout", err, attr_path.clone().attribute(name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("30m"), Ok(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration(" 2h "), Ok(Duration::from_secs(7200)));
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3x").is_err());
        assert!(parse_duration("m").is_err());
    }

    #[test]
    fn oversized_durations_are_errors() {
        assert_eq!(parse_duration("7d"), Ok(MAX_TIMEOUT));
        assert!(parse_duration("8d").is_err());
        assert!(parse_duration("99999999999999999999h").is_err());
        assert!(parse_duration("18446744073709551615s").is_err());

        let mut diags = Diagnostics::default();
        let block = Value::Value(TimeoutsState {
            delete: Value::Value(Cow::Borrowed("99999999999999999999h")),
            ..Default::default()
        });
        validate(&mut diags, AttributePath::new("timeouts"), &block);
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(
            Timeouts::minutes(30, 5).resolve(&block, Operation::Delete),
            Duration::from_secs(1800)
        );
    }

    #[test]
    fn block_overrides_defaults() {
        let defaults = Timeouts::minutes(30, 5);
        let block = Value::Value(TimeoutsState {
            create: Value::Value(Cow::Borrowed("1h")),
            ..Default::default()
        });
        assert_eq!(
            defaults.resolve(&block, Operation::Create),
            Duration::from_secs(3600)
        );
        assert_eq!(
            defaults.resolve(&block, Operation::Read),
            Duration::from_secs(300)
        );
        assert_eq!(
            defaults.resolve(&Value::Null, Operation::Delete),
            Duration::from_secs(1800)
        );
    }
}
