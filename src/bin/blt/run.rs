use std::process::ExitCode;

use log::{debug, error};

use blt::dispatch::{CommandCenter, DispatchError};

use crate::abort;

/// Run one command on a blocking thread, racing it against Ctrl+C.
///
/// The runtime is shut down without waiting, so a subprocess that ignores the
/// interrupt does not keep blt alive.
pub fn dispatch(
    center: CommandCenter,
    environment: String,
    command: String,
    args: Vec<String>,
) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return abort(&format!("unable to start the runtime: {e}")),
    };

    let outcome = runtime.block_on(async move {
        let task =
            tokio::task::spawn_blocking(move || center.run(&environment, &command, &args));
        tokio::select! {
            joined = task => Some(joined),
            _ = tokio::signal::ctrl_c() => {
                debug!("Ctrl+C received, abandoning the running command");
                None
            }
        }
    });
    runtime.shutdown_background();

    match outcome {
        Some(Ok(Ok(()))) => ExitCode::SUCCESS,
        None | Some(Ok(Err(DispatchError::Cancelled))) => {
            eprintln!("\nCancelled.");
            ExitCode::FAILURE
        }
        Some(Ok(Err(e))) => abort(&e.to_string()),
        Some(Err(e)) => {
            error!("Command task failed: {e}");
            abort(&e.to_string())
        }
    }
}
