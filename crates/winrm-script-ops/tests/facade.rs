mod common;

use common::Reply;
use serde::Deserialize;
use std::time::Duration;
use winrm_script_ops::{
    ArgumentBinder, BoundArgs, CancellationToken, ScriptClient, ScriptOpsError, SessionExecutor,
};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    name: String,
    enabled: bool,
}

fn target(name: &str) -> BoundArgs {
    BoundArgs::new().text("target", name).expect("bind target")
}

#[tokio::test]
async fn get_list_renders_fixed_script() {
    let (mut client, session) = common::client([Reply::Ok("[]")]);

    let _: Vec<Entry> = client
        .run_with_result("GetList", &target("vmA"))
        .await
        .expect("run");

    assert_eq!(
        session.sent(),
        vec!["Get-Item -Name 'vmA' | ConvertTo-Json -Compress".to_string()]
    );
    assert_eq!(
        client.render("GetList", &target("vmA")).unwrap(),
        session.sent()[0]
    );
}

#[tokio::test]
async fn empty_array_output_is_empty_sequence() {
    let (mut client, _session) = common::client([Reply::Ok("[]")]);
    let entries: Vec<Entry> = client
        .run_with_result("GetList", &target("vmA"))
        .await
        .expect("run");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn no_output_is_empty_sequence() {
    let (mut client, _session) = common::client([Reply::Ok("  \r\n")]);
    let entries: Vec<Entry> = client
        .run_with_result("GetList", &target("vmA"))
        .await
        .expect("run");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn single_object_output_is_one_element_sequence() {
    let (mut client, _session) = common::client([Reply::Ok(r#"{"Name":"X","Enabled":true}"#)]);
    let entries: Vec<Entry> = client
        .run_with_result("GetList", &target("vmA"))
        .await
        .expect("run");
    assert_eq!(
        entries,
        vec![Entry {
            name: "X".to_string(),
            enabled: true
        }]
    );
}

#[tokio::test]
async fn malformed_output_is_decode_error_with_raw_text() {
    let (mut client, _session) = common::client([Reply::Ok("Name : X\r\nEnabled : True")]);
    let err = client
        .run_with_result::<Entry, _>("GetList", &target("vmA"))
        .await
        .unwrap_err();
    match err {
        ScriptOpsError::Decode { raw, .. } => assert_eq!(raw, "Name : X\r\nEnabled : True"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn fire_and_forget_rejection_surfaces_stderr_unmodified() {
    let stderr = "Set-Item : Cannot find path 'vmA' because it does not exist.\r\n";
    let (mut client, _session) = common::client([Reply::Fail(1, stderr)]);

    let args = target("vmA").text("value", "1").unwrap();
    let err = client
        .run_fire_and_forget("SetItem", &args)
        .await
        .unwrap_err();

    match err {
        ScriptOpsError::RemoteExecution {
            exit_code,
            stderr: got,
        } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(got, stderr);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn transport_failure_is_not_remote_execution() {
    let (mut client, _session) = common::client([Reply::Disconnect("WinRM connection closed")]);
    let err = client
        .run_with_result::<Entry, _>("GetList", &target("vmA"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptOpsError::Transport { .. }));
    assert_eq!(err.code(), "transport");
}

#[tokio::test]
async fn unknown_template_is_reported_before_dispatch() {
    let (mut client, session) = common::client([]);
    let err = client
        .run_fire_and_forget("DoesNotExist", &target("vmA"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptOpsError::UnknownTemplate { .. }));
    assert!(err.is_pre_dispatch());
    assert!(session.sent().is_empty());
}

#[tokio::test]
async fn apply_batch_stops_at_first_failure() {
    let (mut client, session) = common::client([
        Reply::Fail(1, "item1 failed"),
        Reply::Ok(""),
        Reply::Ok(""),
    ]);

    let items = ["item1", "item2", "item3"]
        .into_iter()
        .map(|name| ("SetItem", target(name).text("value", "on").unwrap()));

    let err = client.apply_batch(items).await.unwrap_err();

    assert!(
        matches!(err, ScriptOpsError::RemoteExecution { ref stderr, .. } if stderr == "item1 failed")
    );
    let sent = session.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("'item1'"));
}

#[tokio::test]
async fn apply_batch_runs_every_item_in_order() {
    let (mut client, session) = common::client([]);

    let items = ["a", "b", "c"]
        .into_iter()
        .map(|name| ("SetItem", target(name).text("value", "on").unwrap()));
    client.apply_batch(items).await.expect("batch");

    let sent = session.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].contains("'a'"));
    assert!(sent[1].contains("'b'"));
    assert!(sent[2].contains("'c'"));
}

#[tokio::test]
async fn apply_batch_stops_on_binding_failure_mid_batch() {
    let (mut client, session) = common::client([]);

    let items = vec![
        ("SetItem", target("a").text("value", "on").unwrap()),
        ("SetItem", target("b")),
        ("SetItem", target("c").text("value", "on").unwrap()),
    ];
    let err = client.apply_batch(items).await.unwrap_err();

    assert!(matches!(err, ScriptOpsError::MissingSubstitution { ref key, .. } if key == "value"));
    assert_eq!(session.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_marks_session_indeterminate() {
    let session = HangingSession;
    let mut client = ScriptClient::new(
        common::registry(),
        std::sync::Arc::new(ArgumentBinder::new()),
        SessionExecutor::new(session).with_timeout(Duration::from_secs(2)),
    );

    let err = client
        .run_with_result::<Entry, _>("GetList", &target("vmA"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptOpsError::Timeout { timeout_ms: 2000 }));
    assert!(client.executor().is_indeterminate());
}

#[tokio::test]
async fn cancellation_during_execute_is_cancelled_error() {
    let token = CancellationToken::new();
    let mut client = ScriptClient::new(
        common::registry(),
        std::sync::Arc::new(ArgumentBinder::new()),
        SessionExecutor::new(HangingSession).with_cancellation(token.clone()),
    );

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = client
        .run_fire_and_forget("SetItem", &target("vmA").text("value", "1").unwrap())
        .await
        .unwrap_err();
    canceller.await.expect("canceller");

    assert!(matches!(err, ScriptOpsError::Cancelled));
}

struct HangingSession;

#[async_trait::async_trait]
impl winrm_script_ops::Session for HangingSession {
    async fn send(
        &mut self,
        _script: &str,
    ) -> Result<winrm_script_ops::RawExecutionResult, winrm_script_ops::TransportError> {
        std::future::pending().await
    }
}
