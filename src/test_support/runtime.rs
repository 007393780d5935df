use anyhow::{Result, bail};
use std::{env, os::unix::net::UnixStream, path::PathBuf, sync::OnceLock};

/// Ensure a container runtime socket is reachable for testcontainers.
///
/// Honors `DOCKER_HOST`, then the Docker socket, then the rootless and rootful
/// Podman sockets (exporting `DOCKER_HOST` for the latter).
///
/// # Errors
/// Returns an error if no Docker/Podman socket accepts connections.
pub(crate) fn ensure_container_runtime() -> Result<()> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();
    match INIT.get_or_init(init_container_runtime) {
        Ok(()) => Ok(()),
        Err(message) => bail!("{message}"),
    }
}

fn init_container_runtime() -> Result<(), String> {
    if let Ok(docker_host) = env::var("DOCKER_HOST") {
        return match docker_host.strip_prefix("unix://") {
            Some(path) if UnixStream::connect(path).is_err() => Err(format!(
                "`DOCKER_HOST` points to `{docker_host}`, but the socket is not accepting connections."
            )),
            _ => Ok(()),
        };
    }

    if UnixStream::connect("/var/run/docker.sock").is_ok() {
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Ok(runtime_dir) = env::var("XDG_RUNTIME_DIR") {
        candidates.push(PathBuf::from(runtime_dir).join("podman/podman.sock"));
    }
    candidates.push(PathBuf::from("/run/podman/podman.sock"));

    if let Some(path) = candidates
        .into_iter()
        .find(|path| UnixStream::connect(path).is_ok())
    {
        // Set once during test setup, before any container starts.
        env::set_var("DOCKER_HOST", format!("unix://{}", path.display()));
        return Ok(());
    }

    Err("No container runtime socket found. Start Docker or `podman.socket`, or set `DOCKER_HOST`.".to_string())
}
