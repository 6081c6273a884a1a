use std::process::ExitCode;

use tokio_util::sync::CancellationToken;

use k8s_nettest::{NetworkTest, NettestConfig};
use k8s_nettest_kubeapi::KubeApi;

mod render;

const EXIT_OK: u8 = 0;
const EXIT_CRITICAL: u8 = 2;
const EXIT_NO_CONNECT: u8 = 3;
const EXIT_INTERNAL_ERR: u8 = 4;

#[derive(Debug, Default)]
struct Args {
    json: bool,
    namespace: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--output" => match iter.next().as_deref() {
                Some("json") => args.json = true,
                Some("text") => args.json = false,
                other => return Err(format!("--output expects json or text, got {other:?}")),
            },
            "--namespace" => {
                args.namespace = Some(
                    iter.next()
                        .ok_or_else(|| "--namespace expects a value".to_string())?,
                );
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(EXIT_INTERNAL_ERR);
        }
    };

    let api = match KubeApi::new().await {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Error: failed to connect to cluster: {err}");
            return ExitCode::from(EXIT_NO_CONNECT);
        }
    };

    let config = match &args.namespace {
        Some(namespace) => NettestConfig::with_namespace(namespace),
        None => NettestConfig::default(),
    };
    tracing::info!(namespace = config.namespace, "starting network test");
    let nettest = NetworkTest::with_config(api, config);

    // Ctrl-C cancels in-flight work; teardown still completes under its own
    // deadline inside run().
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            signal_token.cancel();
        }
    });

    let report = match nettest.run(&token).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Network test failed: {err}");
            return ExitCode::from(EXIT_INTERNAL_ERR);
        }
    };

    let rendered = if args.json {
        render::json(&report)
    } else {
        Ok(render::text(&report))
    };
    match rendered {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("Error writing report: {err}");
            return ExitCode::from(EXIT_INTERNAL_ERR);
        }
    }

    if report.summary.failed > 0 {
        ExitCode::from(EXIT_CRITICAL)
    } else {
        ExitCode::from(EXIT_OK)
    }
}
