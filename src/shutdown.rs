use std::io;
use std::thread;

use log::{error, info};

use crate::cancel::CancellationToken;

/// Cancel `token` on Ctrl-C. The signal is awaited on a small dedicated runtime so the
/// render thread stays free of async code.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    thread::Builder::new()
        .name("shutdown".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Interrupted, shutting down");
                        token.cancel();
                    }
                    Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
                }
            })
        })?;

    Ok(())
}
