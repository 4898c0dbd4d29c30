use clap::Args;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CommandError;
use crate::kubectl::{Kubectl, KubectlError, StreamEnd};
use crate::settings::{NAMESPACE, Settings};

pub const DEFAULT_CONTAINER: &str = "sidecar";

/// Arguments for the `riff logs` command.
#[derive(Debug, Args)]
pub struct LogsArgs {
    /// The name of the function
    #[arg(short = 'n', long = "name")]
    pub function: String,

    /// The name of the function container (sidecar or main)
    #[arg(short = 'c', long, default_value = DEFAULT_CONTAINER)]
    pub container: String,

    /// Tail the logs
    #[arg(short = 't', long)]
    pub tail: bool,

    /// The namespace used for the deployed resources
    #[arg(long)]
    pub namespace: Option<String>,
}

/// How a logs invocation finished without a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogsOutcome {
    /// No pod was found for the function; nothing was fetched.
    NotActive,
    /// A one-shot fetch succeeded and its output was printed.
    Printed,
    /// The one-shot fetch failed and the failure was reported.
    FetchFailed,
    /// The followed log stream ended by itself.
    Streamed,
    /// The followed log stream was interrupted.
    Interrupted,
}

pub fn pod_lookup_args(function: &str, namespace: &str) -> Vec<String> {
    let mut args = namespace_args(namespace);
    args.extend([
        "get".to_string(),
        "pod".to_string(),
        "-l".to_string(),
        format!("function={function}"),
        "-o".to_string(),
        "jsonpath={.items[0].metadata.name}".to_string(),
    ]);
    args
}

pub fn log_fetch_args(pod: &str, container: &str, namespace: &str, follow: bool) -> Vec<String> {
    let mut args = namespace_args(namespace);
    args.extend([
        "logs".to_string(),
        pod.to_string(),
        "-c".to_string(),
        container.to_string(),
    ]);
    if follow {
        args.push("-f".to_string());
    }
    args
}

/// An empty namespace leaves the choice to the current kubectl context.
fn namespace_args(namespace: &str) -> Vec<String> {
    if namespace.is_empty() {
        Vec::new()
    } else {
        vec!["--namespace".to_string(), namespace.to_string()]
    }
}

pub async fn logs_command<K: Kubectl, W: Write>(
    args: LogsArgs,
    settings: &Settings,
    kubectl: &K,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<LogsOutcome, CommandError> {
    let namespace = settings
        .with_flag(NAMESPACE, args.namespace.as_deref())
        .get(NAMESPACE);

    let scope = if namespace.is_empty() {
        "the current namespace".to_string()
    } else {
        format!("namespace {namespace}")
    };
    writeln!(
        out,
        "Displaying logs for container {} of function {} in {scope}\n",
        args.container, args.function
    )
    .map_err(KubectlError::Output)?;

    let pod = match kubectl
        .exec_for_string(&pod_lookup_args(&args.function, &namespace))
        .await
    {
        Ok(output) if !output.trim().is_empty() => output.trim().to_string(),
        Ok(_) => {
            eprintln!("Function {} may not be currently active", args.function);
            return Ok(LogsOutcome::NotActive);
        }
        Err(err) => {
            debug!("Pod lookup failed: {err}");
            eprintln!(
                "Error {err} - Function {} may not be currently active",
                args.function
            );
            return Ok(LogsOutcome::NotActive);
        }
    };
    info!("Found pod {pod} for function {}", args.function);

    let fetch = log_fetch_args(&pod, &args.container, &namespace, args.tail);
    if args.tail {
        return match kubectl.stream_lines(&fetch, out, cancel).await? {
            StreamEnd::Exited => Ok(LogsOutcome::Streamed),
            StreamEnd::Cancelled => Ok(LogsOutcome::Interrupted),
        };
    }

    match kubectl.exec_for_string(&fetch).await {
        Ok(logs) => {
            out.write_all(logs.as_bytes())
                .and_then(|()| {
                    if logs.is_empty() || logs.ends_with('\n') {
                        Ok(())
                    } else {
                        writeln!(out)
                    }
                })
                .map_err(KubectlError::Output)?;
            Ok(LogsOutcome::Printed)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            Ok(LogsOutcome::FetchFailed)
        }
    }
}

/// A token that is cancelled when the process receives Ctrl-C.
pub fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            trigger.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Answers pod lookups and log fetches from canned results.
    struct FakeKubectl {
        pod: Result<String, String>,
        logs: Result<String, String>,
        stream: Vec<String>,
        cancel_stream: bool,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeKubectl {
        fn new(pod: Result<&str, &str>, logs: Result<&str, &str>) -> Self {
            Self {
                pod: pod.map(str::to_string).map_err(str::to_string),
                logs: logs.map(str::to_string).map_err(str::to_string),
                stream: Vec::new(),
                cancel_stream: false,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    fn failure(args: &[String], stderr: &str) -> KubectlError {
        KubectlError::NonZeroExit {
            args: args.join(" "),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        }
    }

    impl Kubectl for FakeKubectl {
        async fn exec_for_string(&self, args: &[String]) -> Result<String, KubectlError> {
            self.calls.borrow_mut().push(args.to_vec());
            let canned = if args.iter().any(|arg| arg == "get") {
                &self.pod
            } else {
                &self.logs
            };
            canned.clone().map_err(|stderr| failure(args, &stderr))
        }

        async fn stream_lines<W: Write>(
            &self,
            args: &[String],
            out: &mut W,
            cancel: &CancellationToken,
        ) -> Result<StreamEnd, KubectlError> {
            self.calls.borrow_mut().push(args.to_vec());
            for line in &self.stream {
                writeln!(out, "{line}").map_err(KubectlError::Output)?;
            }
            if self.cancel_stream {
                cancel.cancel();
                return Ok(StreamEnd::Cancelled);
            }
            Ok(StreamEnd::Exited)
        }
    }

    fn settings(env: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_env(env, None).unwrap()
    }

    fn args(function: &str, tail: bool, namespace: Option<&str>) -> LogsArgs {
        LogsArgs {
            function: function.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            tail,
            namespace: namespace.map(str::to_string),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_pod_lookup_args() {
        assert_eq!(
            pod_lookup_args("square", ""),
            strings(&["get", "pod", "-l", "function=square", "-o", "jsonpath={.items[0].metadata.name}"])
        );
        assert_eq!(
            pod_lookup_args("square", "demo")[..3],
            strings(&["--namespace", "demo", "get"])[..]
        );
    }

    #[test]
    fn test_log_fetch_args() {
        assert_eq!(
            log_fetch_args("square-abc", "main", "", false),
            strings(&["logs", "square-abc", "-c", "main"])
        );
        assert_eq!(
            log_fetch_args("square-abc", "sidecar", "demo", true),
            strings(&["--namespace", "demo", "logs", "square-abc", "-c", "sidecar", "-f"])
        );
    }

    #[tokio::test]
    async fn test_prints_fetched_logs() {
        let kubectl = FakeKubectl::new(Ok("square-abc\n"), Ok("hello\nworld"));
        let mut out = Vec::new();
        let outcome = logs_command(
            args("square", false, None),
            &settings(&[]),
            &kubectl,
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, LogsOutcome::Printed);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Displaying logs for container sidecar of function square in the current namespace\n\nhello\nworld\n"
        );
        assert_eq!(
            kubectl.calls(),
            vec![
                pod_lookup_args("square", ""),
                log_fetch_args("square-abc", "sidecar", "", false)
            ]
        );
    }

    #[tokio::test]
    async fn test_inactive_function_skips_fetch() {
        let kubectl = FakeKubectl::new(Ok("   "), Ok("never"));
        let mut out = Vec::new();
        let outcome = logs_command(
            args("square", false, None),
            &settings(&[]),
            &kubectl,
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, LogsOutcome::NotActive);
        assert_eq!(kubectl.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_active() {
        let kubectl = FakeKubectl::new(Err("array index out of bounds"), Ok("never"));
        let mut out = Vec::new();
        let outcome = logs_command(
            args("square", true, None),
            &settings(&[]),
            &kubectl,
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, LogsOutcome::NotActive);
        assert_eq!(kubectl.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_reported_not_raised() {
        let kubectl = FakeKubectl::new(Ok("square-abc"), Err("container not found"));
        let mut out = Vec::new();
        let outcome = logs_command(
            args("square", false, None),
            &settings(&[]),
            &kubectl,
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, LogsOutcome::FetchFailed);
    }

    #[tokio::test]
    async fn test_tail_streams_lines() {
        let mut kubectl = FakeKubectl::new(Ok("square-abc"), Ok("unused"));
        kubectl.stream = strings(&["one", "two"]);
        let mut out = Vec::new();
        let outcome = logs_command(
            args("square", true, Some("demo")),
            &settings(&[]),
            &kubectl,
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, LogsOutcome::Streamed);
        assert!(String::from_utf8(out).unwrap().ends_with("\n\none\ntwo\n"));
        assert_eq!(
            kubectl.calls()[1],
            log_fetch_args("square-abc", "sidecar", "demo", true)
        );
    }

    #[tokio::test]
    async fn test_tail_interrupted() {
        let mut kubectl = FakeKubectl::new(Ok("square-abc"), Ok("unused"));
        kubectl.cancel_stream = true;
        let cancel = CancellationToken::new();
        let mut out = Vec::new();
        let outcome = logs_command(
            args("square", true, None),
            &settings(&[]),
            &kubectl,
            &mut out,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome, LogsOutcome::Interrupted);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_namespace_precedence() {
        let kubectl = FakeKubectl::new(Ok("square-abc"), Ok(""));
        let env = settings(&[("RIFF_NAMESPACE", "from-env")]);

        let mut out = Vec::new();
        logs_command(args("square", false, None), &env, &kubectl, &mut out, &CancellationToken::new())
            .await
            .unwrap();
        logs_command(
            args("square", false, Some("from-flag")),
            &env,
            &kubectl,
            &mut out,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let calls = kubectl.calls();
        assert_eq!(calls[0], pod_lookup_args("square", "from-env"));
        assert_eq!(calls[2], pod_lookup_args("square", "from-flag"));
        assert!(String::from_utf8(out).unwrap().contains("in namespace from-flag"));
    }
}
