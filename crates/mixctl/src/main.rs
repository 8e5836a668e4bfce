mod console;

use std::sync::Arc;

use mixctl::prefs::{self, TomlPreferences};
use mixctl::{ClientCore, CoreOptions, HttpTransport};
use mixctl_proto::config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use console::{ConsoleRenderer, Input};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = mixctl_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("mixctl.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();
    eprintln!("mixctl log: {}", log_path.display());

    let mut config = Config::load()?;
    // Command line wins over the environment, which wins over config.toml.
    if let Ok(url) = std::env::var("MIXCTL_SERVER") {
        config.server.base_url = url;
    }
    if let Some(url) = std::env::args().nth(1) {
        config.server.base_url = url;
    }
    tracing::info!(
        "mixctl starting… server={} generation={:?}",
        config.server.base_url,
        config.server.generation
    );

    let transport = HttpTransport::new(&config.server.base_url, config.server.request_timeout())?;
    let preferences = TomlPreferences::open(&config.preferences.file);
    let renderer = ConsoleRenderer::new(prefs::small_ui(&preferences));
    let options = CoreOptions {
        base_url: transport.base_url().to_string(),
        generation: config.server.generation,
        expected_version: config.protocol.expected_version,
    };
    let core = ClientCore::new(options, renderer, preferences);

    let (intent_tx, intent_rx) = mpsc::channel(32);
    let core_task = tokio::spawn(core.run(
        Arc::new(transport),
        intent_rx,
        config.polling.interval(),
    ));

    println!("connecting to {}, 'help' lists commands", config.server.base_url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match console::parse(&line) {
            Ok(Input::Intent(intent)) => {
                if intent_tx.send(intent).await.is_err() {
                    break;
                }
            }
            Ok(Input::Help) => println!("{}", console::HELP),
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => {}
            Err(msg) => println!("{}", msg),
        }
    }

    drop(intent_tx);
    core_task.await?;
    tracing::info!("mixctl stopped");
    Ok(())
}
