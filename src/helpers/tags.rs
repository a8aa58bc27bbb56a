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

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description};
use tf_provider::value::{Value, ValueMap, ValueString};
use tf_provider::{AttributePath, Diagnostics};

pub type Tags<'a> = ValueMap<'a, ValueString<'a>>;

const MAX_TAGS: usize = 15;
const MAX_KEY_LEN: usize = 512;
const MAX_VALUE_LEN: usize = 256;

pub fn schema() -> Attribute {
    Attribute {
        attr_type: AttributeType::Map(AttributeType::String.into()),
        description: Description::plain("A mapping of tags to assign to the resource"),
        constraint: AttributeConstraint::Optional,
        ..Default::default()
    }
}

/// Check the tag limits enforced by Resource Manager
pub fn validate(diags: &mut Diagnostics, attr_path: AttributePath, tags: &Tags) {
    let Value::Value(tags) = tags else {
        return;
    };
    if tags.len() > MAX_TAGS {
        diags.error(
            "Too many tags",
            format!("a maximum of {MAX_TAGS} tags can be applied to each ARM resource"),
            attr_path.clone(),
        );
    }
    for (key, value) in tags {
        if key.len() > MAX_KEY_LEN {
            diags.error(
                "Tag name too long",
                format!("the maximum length for a tag key is {MAX_KEY_LEN} characters: {key:?}"),
                attr_path.clone().key(key.to_string()),
            );
        }
        if let Value::Value(value) = value {
            if value.len() > MAX_VALUE_LEN {
                diags.error(
                    "Tag value too long",
                    format!(
                        "the maximum length for a tag value is {MAX_VALUE_LEN} characters: {value:?}"
                    ),
                    attr_path.clone().key(key.to_string()),
                );
            }
        }
    }
}

/// Reject keys used internally by a service, compared case-insensitively
pub fn validate_reserved(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    tags: &Tags,
    reserved: &[&str],
) {
    for key in tags.iter().flat_map(|tags| tags.keys()) {
        if reserved.iter().any(|r| r.eq_ignore_ascii_case(key)) {
            diags.error(
                "Reserved tag name",
                format!("the tag name {key:?} is reserved and cannot be used"),
                attr_path.clone().key(key.to_string()),
            );
        }
    }
}

/// Tags as sent to Azure
pub fn expand(tags: &Tags) -> HashMap<String, String> {
    tags.iter()
        .flatten()
        .map(|(k, v)| (k.to_string(), v.as_deref_option().unwrap_or_default().to_owned()))
        .collect()
}

/// Tags as stored in the state, keeping a null map when nothing is set on either side
pub fn flatten<'a>(remote: Option<HashMap<String, String>>, prior: &Tags<'a>) -> Tags<'a> {
    flatten_filtered(remote, prior, &[])
}

/// Same as [`flatten`], skipping reserved keys
pub fn flatten_filtered<'a>(
    remote: Option<HashMap<String, String>>,
    prior: &Tags<'a>,
    reserved: &[&str],
) -> Tags<'a> {
    let tags: BTreeMap<Cow<'a, str>, ValueString<'a>> = remote
        .unwrap_or_default()
        .into_iter()
        .filter(|(k, _)| !reserved.iter().any(|r| r.eq_ignore_ascii_case(k)))
        .map(|(k, v)| (Cow::Owned(k), Value::Value(Cow::Owned(v))))
        .collect();
    if tags.is_empty() && !prior.is_value() {
        Value::Null
    } else {
        Value::Value(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&'static str, &'static str)]) -> Tags<'static> {
        Value::Value(
            pairs
                .iter()
                .map(|(k, v)| (Cow::Borrowed(*k), Value::Value(Cow::Borrowed(*v))))
                .collect(),
        )
    }

    #[test]
    fn limits() {
        let mut diags = Diagnostics::default();
        validate(&mut diags, AttributePath::new("tags"), &tags(&[("env", "prod")]));
        assert!(diags.errors.is_empty());

        let long_key: &'static str = Box::leak("k".repeat(513).into_boxed_str());
        validate(&mut diags, AttributePath::new("tags"), &tags(&[(long_key, "v")]));
        assert_eq!(diags.errors.len(), 1);

        let many: Tags = Value::Value(
            (0..16)
                .map(|i| (Cow::Owned(format!("k{i}")), Value::Value(Cow::Borrowed("v"))))
                .collect(),
        );
        let mut diags = Diagnostics::default();
        validate(&mut diags, AttributePath::new("tags"), &many);
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn reserved_type_key() {
        let mut diags = Diagnostics::default();
        validate_reserved(
            &mut diags,
            AttributePath::new("tags"),
            &tags(&[("$Type", "x"), ("env", "prod")]),
            &["$type"],
        );
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn flatten_keeps_null() {
        assert_eq!(flatten(None, &Value::Null), Value::Null);
        assert_eq!(flatten(Some(HashMap::new()), &tags(&[])), tags(&[]));

        let remote = HashMap::from([
            ("$type".to_owned(), "Microsoft.WindowsAzure.Management.Common.Storage.CasePreservedDictionary".to_owned()),
            ("env".to_owned(), "prod".to_owned()),
        ]);
        assert_eq!(
            flatten_filtered(Some(remote), &Value::Null, &["$type"]),
            tags(&[("env", "prod")])
        );
    }
}
