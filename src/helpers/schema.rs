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
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description};
use tf_provider::value::{Value, ValueString};
use tf_provider::{AttributePath, Diagnostics};

use super::validate::regex;

pub use tf_provider::schema::AttributeConstraint::{Computed, Optional, OptionalComputed, Required};

pub fn string(constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn number(constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::Number,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn boolean(constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::Bool,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn string_list(constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::List(AttributeType::String.into()),
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn string_set(constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::Set(AttributeType::String.into()),
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn string_map(constraint: AttributeConstraint, description: &str) -> Attribute {
    Attribute {
        attr_type: AttributeType::Map(AttributeType::String.into()),
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub fn deprecated(attribute: Attribute) -> Attribute {
    Attribute {
        deprecated: true,
        ..attribute
    }
}

pub fn resource_group_name() -> Attribute {
    string(Required, "Name of the resource group")
}

pub fn location() -> Attribute {
    string(Required, "Azure region of the resource")
}

fn resource_group_regex() -> &'static Regex {
    static RESOURCE_GROUP: OnceLock<Regex> = OnceLock::new();
    RESOURCE_GROUP.get_or_init(|| regex(r"^[-\w._()]+$"))
}

/// Resource group names: up to 90 word characters, dashes, dots, underscores or parentheses,
/// not ending with a dot
pub fn validate_resource_group_name(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueString,
) {
    let Value::Value(value) = value else {
        return;
    };
    if value.len() > 90 {
        diags.error(
            "Invalid resource group name",
            "may not exceed 90 characters in length",
            attr_path.clone(),
        );
    }
    if value.ends_with('.') {
        diags.error(
            "Invalid resource group name",
            "may not end with a period",
            attr_path.clone(),
        );
    }
    if !resource_group_regex().is_match(value) {
        diags.error(
            "Invalid resource group name",
            "may only contain alphanumeric characters, dash, underscores, parentheses and periods",
            attr_path,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn resource_group_names() {
        let mut diags = Diagnostics::default();
        for ok in ["acctestRG-01", "my_rg.(x)"] {
            validate_resource_group_name(
                &mut diags,
                AttributePath::new("resource_group_name"),
                &Value::Value(Cow::Borrowed(ok)),
            );
        }
        assert!(diags.errors.is_empty());

        for ko in ["rg.", "rg/1", "rg with space"] {
            validate_resource_group_name(
                &mut diags,
                AttributePath::new("resource_group_name"),
                &Value::Value(Cow::Borrowed(ko)),
            );
        }
        assert_eq!(diags.errors.len(), 3);
    }
}
