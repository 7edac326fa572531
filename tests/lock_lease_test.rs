//! Advisory lease behavior across users: contention, expiry reclamation,
//! and release-on-failure inside the locked transition path.

mod common;

use common::{document_workflow, manager, requestor};
use serde_json::json;
use stategate::WorkflowError;

#[tokio::test]
async fn second_user_is_rejected_while_lease_is_live() {
    let mut workflow = document_workflow().await;
    let (alice, _) = requestor();
    let (bob, bob_org) = manager();

    workflow.acquire_lock(&alice, Some(30_000)).unwrap();

    let result = workflow
        .transition_with_permission_check("draft", &bob, &bob_org, json!({}))
        .await;

    match result {
        Err(WorkflowError::LockContention {
            owner,
            remaining_ms,
        }) => {
            assert_eq!(owner, "Sana Iqbal");
            assert!(remaining_ms > 0);
            assert!(remaining_ms <= 30_000);
        }
        other => panic!("expected lock contention, got {other:?}"),
    }

    // The loser changed nothing
    assert_eq!(workflow.current_state(), None);
    assert_eq!(workflow.lock().unwrap().owner_id, "u-req");
}

#[tokio::test]
async fn expired_lease_is_reclaimed_by_the_next_caller() {
    let mut workflow = document_workflow().await;
    let (alice, _) = requestor();
    let (bob, bob_org) = manager();

    // Zero-length lease: expired the instant it is taken
    workflow.acquire_lock(&alice, Some(0)).unwrap();

    workflow
        .transition_with_permission_check("draft", &bob, &bob_org, json!({}))
        .await
        .unwrap();
    assert_eq!(workflow.current_state(), Some("draft"));
}

#[tokio::test]
async fn same_user_renews_instead_of_contending() {
    let mut workflow = document_workflow().await;
    let (alice, _) = requestor();

    workflow.acquire_lock(&alice, Some(30_000)).unwrap();
    workflow.acquire_lock(&alice, Some(30_000)).unwrap();
    assert_eq!(workflow.lock().unwrap().owner_id, "u-req");
}

#[tokio::test]
async fn lock_is_released_even_when_the_transition_fails() {
    let mut workflow = document_workflow().await;
    let (alice, alice_org) = requestor();
    let (bob, bob_org) = manager();

    let result = workflow
        .transition_with_permission_check("nonexistent", &alice, &alice_org, json!({}))
        .await;
    assert!(matches!(result, Err(WorkflowError::UnknownState(_))));
    assert!(workflow.lock().is_none());

    // Nothing stops the next caller
    workflow
        .transition_with_permission_check("draft", &bob, &bob_org, json!({}))
        .await
        .unwrap();
}

#[tokio::test]
async fn release_makes_the_workflow_acquirable_again() {
    let mut workflow = document_workflow().await;
    let (alice, _) = requestor();
    let (bob, _) = manager();

    workflow.acquire_lock(&alice, None).unwrap();
    assert!(matches!(
        workflow.acquire_lock(&bob, None),
        Err(WorkflowError::LockContention { .. })
    ));

    workflow.release_lock();
    workflow.acquire_lock(&bob, None).unwrap();
    assert_eq!(workflow.lock().unwrap().owner_id, "u-mgr");
}
