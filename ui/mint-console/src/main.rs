use anyhow::Context;
use clap::Parser;
use mint_console::console;
use mint_console::{Config, MintApp};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let mut app = MintApp::from_config(&config).context("invalid configuration")?;
    info!(contract = %app.contract_address(), chain = %app.chain().chain_id, "mint-console starting");

    let mut stdout = tokio::io::stdout();
    app.startup().await;
    let mut printed = 0;
    write_out(&mut stdout, &console::render_status(&app)).await?;
    flush_log(&mut stdout, &app, &mut printed).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = time::interval(config.sync_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // startup already synced
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => app.tick().await,
            event = app.next_wallet_event() => app.handle_wallet_event(event).await,
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                let outcome = console::execute(&mut app, console::parse(&line)).await;
                flush_log(&mut stdout, &app, &mut printed).await?;
                write_out(&mut stdout, &outcome.output).await?;
                if outcome.quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, exiting");
                break;
            }
        }
        flush_log(&mut stdout, &app, &mut printed).await?;
    }

    app.shutdown().await;
    Ok(())
}

async fn write_out(stdout: &mut Stdout, text: &str) -> anyhow::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

/// Prints activity lines appended since the last call.
async fn flush_log(stdout: &mut Stdout, app: &MintApp, printed: &mut usize) -> anyhow::Result<()> {
    let fresh = app.state.log.since(*printed).join("\n");
    *printed = app.state.log.len();
    write_out(stdout, &fresh).await
}
