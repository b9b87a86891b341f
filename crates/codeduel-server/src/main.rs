mod cli;
mod logging;

use clap::Parser;
use codeduel::prelude::*;

use crate::cli::Cli;
use crate::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), CodeduelError> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose);

    let server = CodeduelServer::builder()
        .bind(&cli.bind)
        .room_config(cli.room_config())
        .build()
        .await?;

    tracing::info!(
        bind = %cli.bind,
        max_guests = ?cli.max_guests,
        "starting codeduel server"
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}
