//! Tests for the analysis flow against recording doubles.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use analyst::prelude::*;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

fn message(id: &str, role: &str, content: serde_json::Value) -> ThreadMessage {
    serde_json::from_value(json!({
        "id": id,
        "thread_id": "thread_1",
        "role": role,
        "content": content,
    }))
    .unwrap()
}

fn image(file_id: &str) -> serde_json::Value {
    json!({ "type": "image_file", "image_file": { "file_id": file_id } })
}

fn text(value: &str) -> serde_json::Value {
    json!({ "type": "text", "text": { "value": value, "annotations": [] } })
}

/// Agent platform double that records every call in order.
#[derive(Debug)]
struct RecordingAgents {
    calls: Mutex<Vec<String>>,
    messages: Vec<ThreadMessage>,
    run_status: &'static str,
    fail_processing: bool,
    fail_run: bool,
    fail_file_delete: bool,
}

impl RecordingAgents {
    fn new(messages: Vec<ThreadMessage>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            messages,
            run_status: "completed",
            fail_processing: false,
            fail_run: false,
            fail_file_delete: false,
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn position(&self, call: &str) -> usize {
        self.calls().iter().position(|c| c == call).unwrap()
    }
}

#[async_trait]
impl AgentService for RecordingAgents {
    async fn upload_file(&self, path: &Path, purpose: FilePurpose) -> Result<FileInfo> {
        self.record(format!("upload {}", path.display()));
        Ok(serde_json::from_value(json!({
            "id": "assistant-file-1",
            "purpose": purpose,
            "filename": "sample_dataset.csv",
            "status": "pending",
        }))
        .unwrap())
    }

    async fn wait_for_file(&self, mut file: FileInfo) -> Result<FileInfo> {
        self.record(format!("wait_for_file {}", file.id));
        if self.fail_processing {
            return Err(ServiceError::service("agents", "processing of file failed: bad").into());
        }
        file.status = Some(FileStatus::Processed);
        Ok(file)
    }

    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent> {
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["tools"], json!([{ "type": "code_interpreter" }]));
        assert_eq!(
            body["tool_resources"]["code_interpreter"]["file_ids"],
            json!(["assistant-file-1"])
        );
        self.record("create_agent");
        Ok(serde_json::from_value(json!({ "id": "asst_1", "model": body["model"] })).unwrap())
    }

    async fn create_thread(&self) -> Result<AgentThread> {
        self.record("create_thread");
        Ok(serde_json::from_value(json!({ "id": "thread_1" })).unwrap())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        request: &CreateMessageRequest,
    ) -> Result<ThreadMessage> {
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["role"], "user");
        self.record(format!("create_message {thread_id}"));
        Ok(message("msg_user", "user", json!([text("prompt")])))
    }

    async fn create_and_process_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun> {
        self.record(format!("run {thread_id} {agent_id}"));
        if self.fail_run {
            return Err(ServiceError::service("agents", "run could not start").into());
        }
        Ok(serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": thread_id,
            "assistant_id": agent_id,
            "status": self.run_status,
        }))
        .unwrap())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        self.record(format!("list_messages {thread_id}"));
        Ok(self.messages.clone())
    }

    async fn save_file(&self, file_id: &str, target: &Path) -> Result<PathBuf> {
        self.record(format!("save_file {file_id}"));
        tokio::fs::write(target, PNG_BYTES).await?;
        Ok(target.to_path_buf())
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.record(format!("delete_file {file_id}"));
        if self.fail_file_delete {
            return Err(ServiceError::not_found("agents", "no such file").into());
        }
        Ok(())
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.record(format!("delete_agent {agent_id}"));
        Ok(())
    }
}

/// Container double that refuses to replace blobs unless asked to.
#[derive(Debug, Default)]
struct MemoryContainer {
    blobs: Mutex<HashMap<String, Bytes>>,
    uploads: Mutex<Vec<(String, bool)>>,
}

impl MemoryContainer {
    fn with_blob(name: &str) -> Self {
        let container = Self::default();
        container
            .blobs
            .lock()
            .unwrap()
            .insert(name.to_owned(), Bytes::from_static(b"old"));
        container
    }
}

#[async_trait]
impl BlobStore for MemoryContainer {
    async fn upload_blob(
        &self,
        name: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> Result<BlobUploadResult> {
        self.uploads
            .lock()
            .unwrap()
            .push((name.to_owned(), options.overwrite));

        let mut blobs = self.blobs.lock().unwrap();
        if blobs.contains_key(name) && !options.overwrite {
            return Err(ServiceError::conflict("storage", "BlobAlreadyExists").into());
        }
        blobs.insert(name.to_owned(), data);

        Ok(BlobUploadResult {
            name: name.to_owned(),
            url: format!("http://blobs.test/charts/{name}"),
            etag: Some("\"0x1\"".to_owned()),
            last_modified: None,
        })
    }
}

fn options(dir: &Path) -> AnalysisOptions {
    AnalysisOptions::default().with_output_dir(dir)
}

mod success {
    use super::*;

    #[tokio::test]
    async fn saves_and_uploads_every_image() {
        let dir = tempfile::tempdir().unwrap();
        let agents = RecordingAgents::new(vec![
            message("msg_2", "assistant", json!([text("Here is the chart"), image("file_a"), image("file_b")])),
            message("msg_1", "user", json!([text("prompt")])),
        ]);
        let blobs = MemoryContainer::default();

        let report = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.file_id, "assistant-file-1");
        assert_eq!(report.agent_id, "asst_1");
        assert_eq!(report.thread_id, "thread_1");
        assert_eq!(report.run.status, RunStatus::Completed);
        assert_eq!(report.replies, vec!["Here is the chart".to_owned()]);
        assert_eq!(report.images.len(), 2);

        for (saved, id) in report.images.iter().zip(["file_a", "file_b"]) {
            assert_eq!(saved.file_id, id);
            assert_eq!(saved.local_path, dir.path().join(format!("{id}.png")));
            assert_eq!(std::fs::read(&saved.local_path).unwrap(), PNG_BYTES);
            assert_eq!(saved.blob.name, format!("{id}.png"));
        }

        let uploads = blobs.uploads.lock().unwrap().clone();
        assert_eq!(
            uploads,
            vec![("file_a.png".to_owned(), true), ("file_b.png".to_owned(), true)]
        );
        assert_eq!(
            blobs.blobs.lock().unwrap().get("file_a.png").unwrap().as_ref(),
            PNG_BYTES
        );
    }

    #[tokio::test]
    async fn steps_run_in_order_and_cleanup_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let agents = RecordingAgents::new(vec![message(
            "msg_2",
            "assistant",
            json!([image("file_a")]),
        )]);
        let blobs = MemoryContainer::default();

        Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()).with_data_file("data/staff.csv"))
            .run()
            .await
            .unwrap();

        assert_eq!(
            agents.calls(),
            vec![
                "upload data/staff.csv",
                "wait_for_file assistant-file-1",
                "create_agent",
                "create_thread",
                "create_message thread_1",
                "run thread_1 asst_1",
                "list_messages thread_1",
                "save_file file_a",
                "delete_file assistant-file-1",
                "delete_agent asst_1",
            ]
        );
        assert_eq!(agents.count("delete_file"), 1);
        assert_eq!(agents.count("delete_agent"), 1);
    }

    #[tokio::test]
    async fn images_from_every_message_are_processed() {
        let dir = tempfile::tempdir().unwrap();
        let agents = RecordingAgents::new(vec![
            message("msg_3", "assistant", json!([image("file_c")])),
            message("msg_2", "assistant", json!([text("first draft"), image("file_b")])),
            message("msg_1", "user", json!([text("prompt")])),
        ]);
        let blobs = MemoryContainer::default();

        let report = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap();

        let ids: Vec<_> = report.images.iter().map(|i| i.file_id.as_str()).collect();
        assert_eq!(ids, ["file_c", "file_b"]);
        assert!(agents.position("save_file file_b") < agents.position("delete_file assistant-file-1"));
    }

    #[tokio::test]
    async fn no_images_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let agents = RecordingAgents::new(vec![message("msg_2", "assistant", json!([text("no chart")]))]);
        let blobs = MemoryContainer::default();

        let report = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap();

        assert!(report.images.is_empty());
        assert!(blobs.uploads.lock().unwrap().is_empty());
        assert_eq!(agents.count("delete_file"), 1);
        assert_eq!(agents.count("delete_agent"), 1);
    }

    #[tokio::test]
    async fn repeated_run_replaces_existing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let agents = RecordingAgents::new(vec![message("msg_2", "assistant", json!([image("file_a")]))]);
        let blobs = MemoryContainer::with_blob("file_a.png");

        let report = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.images.len(), 1);
        assert_eq!(
            blobs.blobs.lock().unwrap().get("file_a.png").unwrap().as_ref(),
            PNG_BYTES
        );
    }

    #[tokio::test]
    async fn image_hook_runs_before_later_images() {
        let dir = tempfile::tempdir().unwrap();
        let agents = RecordingAgents::new(vec![message(
            "msg_2",
            "assistant",
            json!([image("file_a"), image("file_b")]),
        )]);
        let blobs = MemoryContainer::default();

        Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .on_image(|saved| agents.record(format!("persisted {}", saved.blob.name)))
            .run()
            .await
            .unwrap();

        assert!(agents.position("persisted file_a.png") < agents.position("save_file file_b"));
        assert!(agents.position("persisted file_b.png") < agents.position("delete_file assistant-file-1"));
    }

    #[tokio::test]
    async fn unfinished_run_still_processes_messages() {
        let dir = tempfile::tempdir().unwrap();
        let mut agents =
            RecordingAgents::new(vec![message("msg_2", "assistant", json!([image("file_a")]))]);
        agents.run_status = "failed";
        let blobs = MemoryContainer::default();

        let report = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.run.status, RunStatus::Failed);
        assert_eq!(report.images.len(), 1);
        assert_eq!(agents.count("delete_agent"), 1);
    }
}

mod failure {
    use super::*;

    fn failing_agents() -> RecordingAgents {
        let mut agents = RecordingAgents::new(Vec::new());
        agents.fail_run = true;
        agents
    }

    #[tokio::test]
    async fn failed_processing_deletes_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut agents = RecordingAgents::new(Vec::new());
        agents.fail_processing = true;
        let blobs = MemoryContainer::default();

        let err = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("processing of file failed"));
        assert_eq!(agents.count("create_agent"), 0);
        assert_eq!(agents.count("delete_file assistant-file-1"), 1);
        assert_eq!(agents.count("delete_agent"), 0);
    }

    #[tokio::test]
    async fn failed_processing_under_on_success_keeps_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut agents = RecordingAgents::new(Vec::new());
        agents.fail_processing = true;
        let blobs = MemoryContainer::default();

        let result = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()).with_cleanup(CleanupPolicy::OnSuccess))
            .run()
            .await;

        assert!(result.is_err());
        assert_eq!(agents.count("delete_file"), 0);
    }

    #[tokio::test]
    async fn default_policy_releases_resources() {
        let dir = tempfile::tempdir().unwrap();
        let agents = failing_agents();
        let blobs = MemoryContainer::default();

        let err = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.service_kind(), Some(ServiceErrorKind::Service));
        assert_eq!(agents.count("list_messages"), 0);
        assert_eq!(agents.count("delete_file"), 1);
        assert_eq!(agents.count("delete_agent"), 1);
    }

    #[tokio::test]
    async fn on_success_policy_leaves_resources() {
        let dir = tempfile::tempdir().unwrap();
        let agents = failing_agents();
        let blobs = MemoryContainer::default();

        let result = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()).with_cleanup(CleanupPolicy::OnSuccess))
            .run()
            .await;

        assert!(result.is_err());
        assert_eq!(agents.count("delete_file"), 0);
        assert_eq!(agents.count("delete_agent"), 0);
    }

    #[tokio::test]
    async fn cleanup_error_does_not_hide_the_original_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut agents = failing_agents();
        agents.fail_file_delete = true;
        let blobs = MemoryContainer::default();

        let err = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("run could not start"));
        assert_eq!(agents.count("delete_agent"), 1);
    }

    #[tokio::test]
    async fn cleanup_error_after_success_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut agents = RecordingAgents::new(Vec::new());
        agents.fail_file_delete = true;
        let blobs = MemoryContainer::default();

        let err = Analysis::new(&agents, &blobs, "gpt-4o")
            .with_options(options(dir.path()))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.service_kind(), Some(ServiceErrorKind::NotFound));
        assert_eq!(agents.count("delete_agent"), 1);
    }
}
