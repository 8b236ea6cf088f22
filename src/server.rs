use std::{fs, io::ErrorKind, os::unix::fs::FileTypeExt, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    pipeline::{GateSequencer, PipelineResult, ServiceError},
    protocol::{ClientMessage, ServerMessage, parse_client_message},
    registry::ServiceRegistry,
};

enum ExitReason {
    SocketMessage,
    Signal(&'static str),
}

pub async fn run(config: Config) -> Result<()> {
    let services =
        ServiceRegistry::from_config(&config).context("failed to assemble pipeline services")?;
    let sequencer = Arc::new(GateSequencer::new(Arc::new(services)));
    serve(&config.server.socket_path, sequencer).await
}

/// Serves NDJSON over a unix socket until SIGINT, SIGTERM or an exit message.
/// In-flight turns are cancelled on shutdown and still leave an audit record.
pub async fn serve(socket_path: &Path, sequencer: Arc<GateSequencer>) -> Result<()> {
    prepare_socket_path(socket_path)?;
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("unable to bind socket {}", socket_path.display()))?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<()>();
    let shutdown = CancellationToken::new();

    eprintln!(
        "gatehouse listening on unix socket (NDJSON): {}",
        socket_path.display()
    );
    tracing::info!(target: "server", socket = %socket_path.display(), "server_listening");

    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            Some(()) = exit_rx.recv() => break ExitReason::SocketMessage,
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let sequencer = Arc::clone(&sequencer);
                        let cancel = shutdown.child_token();
                        let sender = exit_tx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_client(stream, sequencer, cancel, sender).await {
                                tracing::warn!(target: "server", error = %format!("{err:#}"), "client_handling_failed");
                            }
                        });
                    }
                    Err(err) => tracing::warn!(target: "server", error = %err, "accept_failed"),
                }
            }
        }
    };

    shutdown.cancel();
    cleanup_socket_path(socket_path)?;
    let reason = match exit_reason {
        ExitReason::SocketMessage => "exit message",
        ExitReason::Signal(signal_name) => signal_name,
    };
    tracing::info!(target: "server", reason, "server_stopped");
    eprintln!("gatehouse stopped: received {reason}");

    Ok(())
}

/// Requests on one connection run one at a time, in arrival order.
async fn handle_client(
    stream: UnixStream,
    sequencer: Arc<GateSequencer>,
    cancel: CancellationToken,
    exit_tx: mpsc::UnboundedSender<()>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next_line() => next?,
        };
        let Some(line) = next else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_client_message(line) {
            Ok(ClientMessage::Exit) => {
                let _ = exit_tx.send(());
                break;
            }
            Ok(ClientMessage::Execute(input)) => reply_for(sequencer.execute(input, &cancel).await),
            Ok(ClientMessage::Ack { ack_token, text }) => {
                reply_for(sequencer.submit_ack(&ack_token, &text, &cancel).await)
            }
            Err(err) => {
                tracing::warn!(target: "server", error = %err, "invalid_protocol_message");
                ServerMessage::protocol_error(&err)
            }
        };

        let line = reply.to_line().context("failed to encode reply")?;
        writer
            .write_all(line.as_bytes())
            .await
            .context("failed to write reply")?;
    }

    Ok(())
}

fn reply_for(outcome: Result<PipelineResult, ServiceError>) -> ServerMessage {
    match outcome {
        Ok(result) => ServerMessage::result(result),
        Err(err) => {
            tracing::warn!(
                target: "server",
                code = err.code(),
                audit_id = err.audit_id(),
                "request_failed"
            );
            ServerMessage::service_error(&err)
        }
    }
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}
