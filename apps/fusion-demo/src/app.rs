use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use fusion_client::{
    CancellationToken, ClientConfig, FusionClient, ProgressUpdate, RunOptions, SubmitTaskRequest,
    UploadOptions,
};

use crate::cli::Command;

pub async fn run(config: ClientConfig, command: Command) -> anyhow::Result<()> {
    let client = FusionClient::new(config)?;

    match command {
        Command::Run {
            service,
            inputs,
            timeout,
        } => {
            let inputs: serde_json::Value =
                serde_json::from_str(&inputs).context("inputs must be valid JSON")?;
            let mut options = RunOptions::new()
                .on_progress(|p| tracing::info!(progress = p, "task progress"));
            if let Some(secs) = timeout {
                options = options.timeout(Duration::try_from_secs_f64(secs)?);
            }
            run_task(&client, SubmitTaskRequest::new(service, inputs), &options).await
        }
        Command::Status {
            service,
            session_id,
        } => {
            let status = client.get_task_status(&service, &session_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::Upload {
            path,
            name,
            concurrency,
        } => {
            let name = match name {
                Some(name) => name,
                None => file_name_of(&path)?,
            };
            upload(&client, &path, &name, concurrency).await
        }
    }
}

/// Waits for the task; Ctrl-C cancels it.
async fn run_task(
    client: &FusionClient,
    request: SubmitTaskRequest,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let submitted = client.submit(&request).await?;
    let session_id = submitted.session_id;
    tracing::info!(session_id = %session_id, "waiting for task");

    let wait = client.wait_for(&request.service, &session_id, options);
    tokio::pin!(wait);
    let result = tokio::select! {
        result = &mut wait => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, cancelling task");
            if let Err(e) = client.cancel(&request.service, &session_id).await {
                tracing::warn!(error = %e, "remote cancel failed");
            }
            // The wait observes the cancellation and returns.
            wait.await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result.data)?);
    Ok(())
}

async fn upload(
    client: &FusionClient,
    path: &Path,
    name: &str,
    concurrency: usize,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let options = UploadOptions::new()
        .max_concurrent_uploads(concurrency)
        .cancel_token(cancel.clone())
        .on_progress(|update| match update {
            ProgressUpdate::Percent(p) => tracing::info!(percent = p, "upload progress"),
            ProgressUpdate::Detailed(d) => tracing::info!(
                percent = d.percentage,
                chunks = d.uploaded_chunks,
                total_chunks = d.total_chunks,
                "upload progress"
            ),
        });

    let upload = client.upload_file(path, name, &options);
    tokio::pin!(upload);
    let url = tokio::select! {
        url = &mut upload => url?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, cancelling upload");
            cancel.cancel();
            upload.await?
        }
    };

    println!("{url}");
    Ok(())
}

fn file_name_of(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a file name from {}", path.display()))
}
