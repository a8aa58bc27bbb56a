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

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use regex::Regex;
use serde_json::json;
use tf_provider::value::Value;
use tf_provider::{Diagnostics, Resource};

use terraform_provider_azurerm::resources::role_assignment::RoleAssignmentState;
use terraform_provider_azurerm::resources::RoleAssignment;

mod common;
use common::{resource, string, SUBSCRIPTION};

const PRINCIPAL: &str = "22222222-2222-2222-2222-222222222222";
const ASSIGNMENT: &str = "33333333-3333-3333-3333-333333333333";

fn scope() -> String {
    format!("/subscriptions/{SUBSCRIPTION}")
}

fn reader_id() -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleDefinitions/acdd72a7-3385-48ef-bd42-f606fba81ae7"
    )
}

fn assignment_path() -> Regex {
    Regex::new(&format!(
        "^/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleAssignments/[0-9a-f-]{{36}}$"
    ))
    .unwrap()
}

fn assignment() -> serde_json::Value {
    json!({
        "id": format!("{}/providers/Microsoft.Authorization/roleAssignments/{ASSIGNMENT}", scope()),
        "name": ASSIGNMENT,
        "type": "Microsoft.Authorization/roleAssignments",
        "properties": {
            "roleDefinitionId": reader_id(),
            "principalId": PRINCIPAL,
            "scope": scope()
        }
    })
}

fn planned() -> RoleAssignmentState<'static> {
    RoleAssignmentState {
        id: Value::Unknown,
        name: Value::Unknown,
        scope: string(&scope()),
        role_definition_id: Value::Unknown,
        role_definition_name: string("Reader"),
        principal_id: string(PRINCIPAL),
        ..Default::default()
    }
}

#[tokio::test]
async fn assignment_is_retried_until_the_principal_replicates() {
    let server = MockServer::start_async().await;
    let definitions = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!(
                    "/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleDefinitions"
                ))
                .query_param("$filter", "roleName eq 'Reader'");
            then.status(200).json_body(json!({
                "value": [{
                    "id": reader_id(),
                    "name": "acdd72a7-3385-48ef-bd42-f606fba81ae7",
                    "properties": {"roleName": "Reader"}
                }]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_matches(assignment_path());
            then.status(200).json_body(assignment());
        })
        .await;
    let mut rejected = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path_matches(assignment_path())
                .json_body_partial(format!(
                    r#"{{"properties": {{"principalId": "{PRINCIPAL}"}}}}"#
                ));
            then.status(400).json_body(json!({
                "error": {
                    "code": "PrincipalNotFound",
                    "message": "Principal does not exist in the directory"
                }
            }));
        })
        .await;

    let role = resource(RoleAssignment, &server);
    let mut diags = Diagnostics::default();
    let create = role.create(
        &mut diags,
        planned(),
        planned(),
        Default::default(),
        Default::default(),
    );
    let replicate = async {
        while rejected.hits_async().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        rejected.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path_matches(assignment_path());
                then.status(201).json_body(assignment());
            })
            .await
    };
    let (created, accepted) = tokio::join!(create, replicate);

    let (created, _) = created.expect("role is assigned");
    assert!(diags.errors.is_empty(), "{diags:?}");
    definitions.assert_async().await;
    accepted.assert_async().await;
    assert_eq!(created.name, string(ASSIGNMENT));
    assert_eq!(created.role_definition_id, string(&reader_id()));
    assert_eq!(created.role_definition_name, string("Reader"));
    assert_eq!(created.principal_id, string(PRINCIPAL));
}

#[tokio::test]
async fn unknown_role_name_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!(
                "/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleDefinitions"
            ));
            then.status(200).json_body(json!({"value": []}));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT);
            then.status(201);
        })
        .await;

    let role = resource(RoleAssignment, &server);
    let mut diags = Diagnostics::default();
    let created = role
        .create(
            &mut diags,
            planned(),
            planned(),
            Default::default(),
            Default::default(),
        )
        .await;

    assert!(created.is_none());
    assert_eq!(diags.errors.len(), 1);
    assert!(diags.errors[0].detail.contains("could not find role \"Reader\""), "{diags:?}");
    put.assert_hits_async(0).await;
}

#[tokio::test]
async fn conflicting_role_attributes_are_rejected() {
    let server = MockServer::start_async().await;
    let role = resource(RoleAssignment, &server);
    let mut diags = Diagnostics::default();
    let config = RoleAssignmentState {
        role_definition_id: string(&reader_id()),
        ..planned()
    };

    assert!(role.validate(&mut diags, config).await.is_none());
    assert_eq!(diags.errors.len(), 1);
    assert_eq!(diags.errors[0].summary, "Conflicting attributes");
}
