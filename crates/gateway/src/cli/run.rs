//! `switchboard run`: one prompt against a running gateway.
//!
//! Streams the run through [`StreamClient`], echoing events as they arrive
//! (text to stdout, thinking and tool activity dimmed on stderr). With
//! `--json` nothing is echoed and the final transcript is printed instead.
//! Ctrl-C cancels the run.

use std::io::Write;

use tokio::sync::broadcast::error::RecvError;

use sb_client::{RunOutcome, RunRequest, StreamClient};
use sb_domain::event::CanonicalEvent;

pub struct RunArgs {
    pub prompt: String,
    pub url: String,
    pub session: Option<String>,
    pub user: Option<String>,
    pub model: Option<String>,
    pub json: bool,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let client = StreamClient::new(&args.url)?;
    let mut feed = client.subscribe();

    let request = RunRequest {
        prompt: args.prompt,
        session_id: args.session,
        user_id: args.user,
        model_id: args.model,
    };
    let mut runner = {
        let client = client.clone();
        tokio::spawn(async move { client.run(request).await })
    };

    let outcome = loop {
        tokio::select! {
            event = feed.recv() => match event {
                Ok(logged) => {
                    if !args.json {
                        echo(&logged.event);
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event echo fell behind"),
                Err(RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                client.cancel();
            }
            finished = &mut runner => break finished?,
        }
    };

    // Events appended after the last select turn.
    while let Ok(logged) = feed.try_recv() {
        if !args.json {
            echo(&logged.event);
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&client.transcript())
            .map_err(|e| anyhow::anyhow!("serializing transcript: {e}"))?;
        println!("{json}");
    } else {
        println!();
        if let Some(session_id) = client.session_id() {
            eprintln!("\x1b[2msession: {session_id}\x1b[0m");
        }
    }

    match outcome? {
        RunOutcome::Cancelled => {
            eprintln!("run cancelled");
            Ok(())
        }
        RunOutcome::Completed => match client.error() {
            Some(message) => anyhow::bail!("run failed: {message}"),
            None => Ok(()),
        },
    }
}

fn echo(event: &CanonicalEvent) {
    match event {
        CanonicalEvent::MessageDelta { text } => {
            print!("{text}");
            std::io::stdout().flush().ok();
        }
        CanonicalEvent::ThinkingDelta { text } => {
            eprint!("\x1b[2m{text}\x1b[0m");
            std::io::stderr().flush().ok();
        }
        CanonicalEvent::ToolStart { tool_name, .. } => {
            eprintln!("\x1b[2m[tool: {tool_name}]\x1b[0m");
        }
        CanonicalEvent::ToolEnd { tool_name, .. } => {
            eprintln!("\x1b[2m[tool done: {tool_name}]\x1b[0m");
        }
        CanonicalEvent::Error { message } => {
            eprintln!("error: {message}");
        }
        CanonicalEvent::Meta { .. } | CanonicalEvent::MessageDone | CanonicalEvent::RunStart => {}
    }
}
