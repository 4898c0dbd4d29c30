mod init;
mod logs;

pub use init::{
    GoArgs, InitArgs, InitFlags, InitPlan, JavaArgs, LanguageCommand, PathArgs, PythonArgs,
    default_handler, init_command, init_command_with, plan_init, resolve_file_path,
};
pub use logs::{
    DEFAULT_CONTAINER, LogsArgs, LogsOutcome, interrupt_token, log_fetch_args, logs_command,
    pod_lookup_args,
};
