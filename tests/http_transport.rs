//! HTTP transport against a mock service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::TryStreamExt;
use serde_json::{json, Value};

use resource_manager::client::{
    OrgPolicyListOption, ProjectField, ProjectGetOption, ProjectListOption,
};
use resource_manager::model::{
    BooleanPolicy, ConstraintType, Identity, LienInfo, OrgPolicyInfo, Policy, ProjectInfo,
    ProjectState, Role,
};
use resource_manager::ResourceManagerError;

mod common;

const ORG: &str = "organizations/123";

#[derive(Clone, Default)]
struct MockState {
    flaky_calls: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    seen_queries: Arc<std::sync::Mutex<Vec<HashMap<String, String>>>>,
    seen_bodies: Arc<std::sync::Mutex<Vec<(String, Value)>>>,
}

fn error(status: StatusCode, message: &str) -> Response {
    let body = json!({"error": {"code": status.as_u16(), "message": message, "status": "ERR"}});
    (status, Json(body)).into_response()
}

fn project(id: &str) -> Value {
    json!({
        "projectId": id,
        "projectNumber": "42",
        "lifecycleState": "ACTIVE",
        "createTime": "2014-10-02T15:01:23.045Z",
        "parent": {"type": "organization", "id": "1"}
    })
}

async fn get_project(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Ok(mut seen) = state.seen_queries.lock() {
        seen.push(query);
    }
    match id.as_str() {
        "gone" => error(StatusCode::NOT_FOUND, "Project gone not found."),
        "denied" => error(StatusCode::FORBIDDEN, "The caller does not have permission"),
        "flaky" => {
            if state.flaky_calls.fetch_add(1, Ordering::SeqCst) < 2 {
                error(StatusCode::SERVICE_UNAVAILABLE, "Backend unavailable")
            } else {
                Json(project("flaky")).into_response()
            }
        }
        "broken" => (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").into_response(),
        _ => Json(project(&id)).into_response(),
    }
}

async fn project_action(Path(tail): Path<String>, Json(body): Json<Value>) -> Response {
    match tail.split_once(':') {
        Some((_, "setIamPolicy")) => {
            if body["policy"]["etag"] == "stale" {
                return error(StatusCode::CONFLICT, "Policy etag mismatch");
            }
            let mut policy = body["policy"].clone();
            policy["etag"] = json!("etag-2");
            Json(policy).into_response()
        }
        Some((_, "testIamPermissions")) => {
            Json(json!({"permissions": ["resourcemanager.projects.get"]})).into_response()
        }
        Some((_, "undelete")) => Json(json!({})).into_response(),
        _ => error(StatusCode::BAD_REQUEST, "Unknown action"),
    }
}

async fn delete_project(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "missing" => error(StatusCode::FORBIDDEN, "Project missing not found."),
        _ => Json(json!({})).into_response(),
    }
}

async fn list_projects(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    let body = match query.get("pageToken").map(String::as_str) {
        None => json!({"projects": [project("a"), project("b")], "nextPageToken": "t2"}),
        Some("t2") => json!({"projects": [], "nextPageToken": "t3"}),
        Some("t3") => json!({"projects": [project("c")], "nextPageToken": ""}),
        Some(_) => return error(StatusCode::BAD_REQUEST, "Invalid page token"),
    };
    Json(body).into_response()
}

async fn create_project(Json(body): Json<Value>) -> Response {
    if body.get("projectNumber").is_some() || body.get("createTime").is_some() {
        return error(StatusCode::BAD_REQUEST, "Server fields must not be sent");
    }
    let mut created = project(body["projectId"].as_str().unwrap_or_default());
    created["name"] = body["name"].clone();
    Json(created).into_response()
}

async fn create_lien(Json(body): Json<Value>) -> Response {
    let mut lien = body.clone();
    lien["name"] = json!("liens/abc");
    lien["createTime"] = json!("2024-01-01T00:00:00Z");
    Json(lien).into_response()
}

async fn list_liens(Query(query): Query<HashMap<String, String>>) -> Response {
    let parent = query.get("parent").cloned().unwrap_or_default();
    Json(json!({"liens": [{"name": "liens/abc", "parent": parent}]})).into_response()
}

fn org_policy(constraint: &str) -> Value {
    json!({"constraint": constraint, "booleanPolicy": {"enforced": true}, "etag": "etag-1"})
}

async fn resource_action(
    State(state): State<MockState>,
    Path((kind, tail)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let Some((_, action)) = tail.rsplit_once(':') else {
        return error(StatusCode::NOT_FOUND, "Unknown resource");
    };
    if let Ok(mut seen) = state.seen_bodies.lock() {
        seen.push((action.to_string(), body.clone()));
    }
    if kind != "organizations" {
        return error(StatusCode::BAD_REQUEST, "Invalid resource");
    }

    match action {
        "setOrgPolicy" => {
            if body["policy"]["etag"] == "stale" {
                return error(StatusCode::CONFLICT, "Org policy etag mismatch");
            }
            let mut policy = body["policy"].clone();
            policy["etag"] = json!("etag-2");
            Json(policy).into_response()
        }
        "clearOrgPolicy" => {
            if body["etag"] == "stale" {
                return error(StatusCode::CONFLICT, "Org policy etag mismatch");
            }
            Json(json!({})).into_response()
        }
        // A boolean policy with no explicit value.
        "getOrgPolicy" => Json(json!({
            "constraint": body["constraint"],
            "booleanPolicy": {},
            "etag": "etag-1"
        }))
        .into_response(),
        "getEffectiveOrgPolicy" => Json(json!({
            "constraint": body["constraint"],
            "listPolicy": {"allowedValues": ["a"], "inheritFromParent": false}
        }))
        .into_response(),
        "listOrgPolicies" => {
            let page = match body.get("pageToken").and_then(Value::as_str) {
                None => json!({
                    "policies": [org_policy("constraints/a"), org_policy("constraints/b")],
                    "nextPageToken": "p2"
                }),
                Some("p2") => json!({"policies": [org_policy("constraints/c")]}),
                Some(_) => return error(StatusCode::BAD_REQUEST, "Invalid page token"),
            };
            Json(page).into_response()
        }
        "listAvailableOrgPolicyConstraints" => Json(json!({
            "constraints": [{
                "name": "constraints/compute.trustedImageProjects",
                "listConstraint": {"suggestedValue": "projects/debian-cloud"}
            }]
        }))
        .into_response(),
        "testIamPermissions" => {
            Json(json!({"permissions": ["orgpolicy.policy.get"]})).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "Unknown action"),
    }
}

async fn start() -> (MockState, resource_manager::ResourceManager) {
    let state = MockState::default();
    let router = Router::new()
        .route("/v1beta1/projects", get(list_projects).post(create_project))
        .route(
            "/v1beta1/projects/{id}",
            get(get_project).post(project_action).delete(delete_project),
        )
        .route("/v1/liens", get(list_liens).post(create_lien))
        .route("/v1/{kind}/{tail}", post(resource_action))
        .with_state(state.clone());

    let addr = common::start_mock_service(router).await;
    (state, common::http_client(addr, 3))
}

#[tokio::test]
async fn test_get_project_decodes_wire() {
    let (_state, client) = start().await;
    let project = client.get("p1", &[]).await.unwrap().unwrap();

    assert_eq!(project.project_id(), "p1");
    assert_eq!(project.project_number(), Some(42));
    assert_eq!(project.state(), Some(ProjectState::Active));
    assert_eq!(project.create_time_millis(), Some(1_412_262_083_045));
    assert_eq!(project.parent().map(|p| p.kind()), Some("organization"));
}

#[tokio::test]
async fn test_get_sends_fields_query() {
    let (state, client) = start().await;
    client
        .get("p1", &[ProjectGetOption::fields(&[ProjectField::Name])])
        .await
        .unwrap();

    let seen = state.seen_queries.lock().unwrap();
    assert_eq!(seen[0].get("fields").map(String::as_str), Some("projectId,name"));
}

#[tokio::test]
async fn test_get_absent_on_not_found_and_denied() {
    let (_state, client) = start().await;
    assert!(client.get("gone", &[]).await.unwrap().is_none());
    assert!(client.get("denied", &[]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let (state, client) = start().await;
    let project = client.get("flaky", &[]).await.unwrap().unwrap();
    assert_eq!(project.project_id(), "flaky");
    assert_eq!(state.flaky_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_non_json_error_body_is_classified() {
    let (_state, client) = start().await;
    let err = client.get("broken", &[]).await.unwrap_err();
    assert!(matches!(err, ResourceManagerError::Transient { code: 502, .. }));
}

#[tokio::test]
async fn test_delete_error_envelope() {
    let (_state, client) = start().await;
    client.delete("p1").await.unwrap();

    let err = client.delete("missing").await.unwrap_err();
    assert!(err.is_permission_or_not_found());
    assert_eq!(err.message(), "Project missing not found.");
}

#[tokio::test]
async fn test_create_omits_server_fields() {
    let (_state, client) = start().await;
    let info = ProjectInfo::builder("p1")
        .name("first")
        .project_number(7)
        .create_time_millis(1)
        .build();
    let created = client.create(&info).await.unwrap();
    assert_eq!(created.name(), Some("first"));
    assert_eq!(created.project_number(), Some(42));
}

#[tokio::test]
async fn test_list_follows_empty_page() {
    let (state, client) = start().await;
    let first = client.list(&[ProjectListOption::page_size(2)]).await.unwrap();

    let ids: Vec<String> = first
        .iterate_all()
        .map_ok(|p| p.project_id().to_string())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(state.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_policy_etag_round_trip() {
    let (_state, client) = start().await;
    let policy = Policy::builder()
        .add_identity(Role::owner(), Identity::user("me@gmail.com"))
        .etag("etag-1")
        .build();

    let updated = client.replace_policy("p1", &policy).await.unwrap();
    assert_eq!(updated.etag(), Some("etag-2"));
    assert_eq!(updated.bindings(), policy.bindings());

    let stale = policy.to_builder().etag("stale").build();
    let err = client.replace_policy("p1", &stale).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_permissions_keep_request_order() {
    let (_state, client) = start().await;
    let permissions = vec![
        "resourcemanager.projects.delete".to_string(),
        "resourcemanager.projects.get".to_string(),
    ];
    let flags = client.test_permissions("p1", &permissions).await.unwrap();
    assert_eq!(flags, vec![false, true]);

    client.undelete("p1").await.unwrap();
}

#[tokio::test]
async fn test_liens_over_http() {
    let (_state, client) = start().await;
    let lien = client
        .create_lien(&LienInfo::builder("projects/1234").reason("keep").build())
        .await
        .unwrap();
    assert_eq!(lien.name(), Some("liens/abc"));
    assert_eq!(lien.reason(), Some("keep"));

    let page = client.list_liens("projects/1234", &[]).await.unwrap();
    assert_eq!(page.values()[0].parent(), "projects/1234");
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn test_connection_failure_is_unclassified() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = common::http_client(addr, 3);
    let err = client.delete("p1").await.unwrap_err();
    assert!(matches!(err, ResourceManagerError::Unclassified { .. }));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_org_policy_etag_over_http() {
    let (state, client) = start().await;
    let policy = OrgPolicyInfo::builder("constraints/a")
        .boolean_policy(true)
        .etag("etag-1")
        .build();

    let written = client.set_org_policy(ORG, &policy).await.unwrap();
    assert_eq!(written.etag(), Some("etag-2"));
    assert_eq!(written.boolean_policy(), policy.boolean_policy());

    let stale = policy.to_builder().etag("stale").build();
    let err = client.set_org_policy(ORG, &stale).await.unwrap_err();
    assert!(err.is_conflict());
    let err = client.clear_org_policy(ORG, &stale).await.unwrap_err();
    assert!(err.is_conflict());
    client.clear_org_policy(ORG, &written).await.unwrap();

    let seen = state.seen_bodies.lock().unwrap();
    let (action, body) = seen.last().unwrap();
    assert_eq!(action, "clearOrgPolicy");
    assert_eq!(body, &json!({"constraint": "constraints/a", "etag": "etag-2"}));
}

#[tokio::test]
async fn test_org_policy_reads_keep_unset_fields() {
    let (_state, client) = start().await;

    let policy = client.get_org_policy(ORG, "constraints/a").await.unwrap();
    assert_eq!(policy.constraint(), "constraints/a");
    assert_eq!(policy.boolean_policy(), Some(&BooleanPolicy { enforced: None }));

    let effective = client
        .get_effective_org_policy(ORG, "constraints/a")
        .await
        .unwrap();
    let list = effective.list_policy().unwrap();
    assert_eq!(list.allowed_values, vec!["a"]);
    assert_eq!(list.inherit_from_parent, Some(false));
    assert!(effective.etag().is_none());
}

#[tokio::test]
async fn test_list_org_policies_sends_paging_in_body() {
    let (state, client) = start().await;
    let first = client
        .list_org_policies(ORG, &[OrgPolicyListOption::page_size(2)])
        .await
        .unwrap();
    assert_eq!(first.values().len(), 2);
    assert_eq!(first.next_page_token(), Some("p2"));

    let constraints: Vec<String> = first
        .iterate_all()
        .map_ok(|policy| policy.constraint().to_string())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(constraints, vec!["constraints/a", "constraints/b", "constraints/c"]);

    let seen = state.seen_bodies.lock().unwrap();
    let bodies: Vec<&Value> = seen
        .iter()
        .filter(|(action, _)| action == "listOrgPolicies")
        .map(|(_, body)| body)
        .collect();
    assert_eq!(bodies[0], &json!({"pageSize": 2}));
    assert_eq!(bodies[1], &json!({"pageSize": 2, "pageToken": "p2"}));
    assert_eq!(bodies.len(), 2);
}

#[tokio::test]
async fn test_constraints_and_org_permissions_over_http() {
    let (_state, client) = start().await;
    let page = client
        .list_available_org_policy_constraints(ORG, &[])
        .await
        .unwrap();
    assert!(!page.has_next_page());
    assert_eq!(
        page.values()[0].constraint_type(),
        Some(&ConstraintType::List {
            suggested_value: Some("projects/debian-cloud".into())
        })
    );

    let permissions = vec![
        "orgpolicy.policy.get".to_string(),
        "orgpolicy.policy.set".to_string(),
    ];
    let granted = client.test_org_permissions(ORG, &permissions).await.unwrap();
    assert!(granted["orgpolicy.policy.get"]);
    assert!(!granted["orgpolicy.policy.set"]);

    let err = client
        .test_org_permissions("folders/1", &permissions)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(400));
}
