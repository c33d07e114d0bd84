//! Child process execution with a hard timeout.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Run `program` with `args`, optionally feeding `stdin`, and capture its output.
///
/// The child is killed when `timeout` elapses.
#[tracing::instrument(skip(args, stdin))]
pub(crate) async fn run(
    program: &str,
    args: &[String],
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output> {
    debug!("Spawning {} with {} argument(s)", program, args.len());

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;

    let stdin_handle = child.stdin.take();
    let input = stdin.map(<[u8]>::to_vec);
    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    tokio::select! {
        result = async {
            let (write_result, status, stdout, stderr) = tokio::join!(
                async {
                    if let (Some(mut handle), Some(bytes)) = (stdin_handle, input) {
                        handle.write_all(&bytes).await?;
                        handle.shutdown().await?;
                    }
                    Ok::<(), std::io::Error>(())
                },
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            );
            write_result.with_context(|| format!("Failed to write stdin of {}", program))?;
            Ok(Output {
                status: status.with_context(|| format!("Failed waiting for {}", program))?,
                stdout,
                stderr,
            })
        } => result,
        () = tokio::time::sleep(timeout) => {
            let _ = child.kill().await;
            bail!("{} timed out after {}s", program, timeout.as_secs())
        }
    }
}

/// Turn a finished process into its stdout, or an error naming the command.
pub(crate) fn into_stdout(output: Output, command: &str) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "`{}` exited with {}: {}",
            command,
            output.status,
            stderr.trim()
        );
    }
    String::from_utf8(output.stdout).with_context(|| format!("`{}` printed invalid UTF-8", command))
}
