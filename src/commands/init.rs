use clap::{Args, Subcommand};
use std::io::{self, Write};
use tracing::debug;

use crate::error::CommandError;
use crate::initializers::{Language, detect_language};
use crate::options::{
    DEFAULT_RIFF_VERSION, DEFAULT_VERSION, FunctionConfig, InitOptions, capitalize_first,
};
use crate::settings::{Settings, USER_ACCOUNT};
use crate::validation::{self, ValidationError};

/// Arguments for the `riff init` command.
#[derive(Debug, Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub flags: InitFlags,

    #[command(subcommand)]
    pub language: Option<LanguageCommand>,

    /// Function directory or source file (same as --filepath)
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,
}

/// Flags shared by `riff init` and every language subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct InitFlags {
    /// Print generated function artifacts content to stdout only
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Path or directory used for the function resources (defaults to the current directory)
    #[arg(short = 'f', long = "filepath", global = true)]
    pub file_path: Option<String>,

    /// The name of the function (defaults to the name of the current directory)
    #[arg(short = 'n', long = "name", global = true)]
    pub name: Option<String>,

    /// The version of riff to use when building containers [default: 0.0.6]
    #[arg(long = "riff-version", global = true)]
    pub riff_version: Option<String>,

    /// The version of the function image [default: 0.0.1]
    #[arg(short = 'v', long = "version", global = true)]
    pub version: Option<String>,

    /// The Docker user account to be used for the image repository
    #[arg(short = 'u', long = "useraccount", global = true)]
    pub user_account: Option<String>,

    /// Path to the function artifact, source code or jar file
    #[arg(short = 'a', long, global = true)]
    pub artifact: Option<String>,

    /// The name of the input topic (defaults to function name)
    #[arg(short = 'i', long, global = true)]
    pub input: Option<String>,

    /// The name of the output topic (optional)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// The protocol spoken with the function invoker: stdio, http or grpc (defaults per language)
    #[arg(long, global = true)]
    pub protocol: Option<String>,

    /// Overwrite existing functions artifacts
    #[arg(long, global = true)]
    pub force: bool,
}

#[derive(Debug, Subcommand)]
pub enum LanguageCommand {
    /// Initialize a Java function
    Java(JavaArgs),
    /// Initialize an executable command function
    Command(PathArgs),
    /// Initialize a node.js function
    #[command(alias = "js")]
    Node(PathArgs),
    /// Initialize a Python function
    Python(PythonArgs),
    /// Initialize a go plugin function
    Go(GoArgs),
}

#[derive(Debug, Args)]
pub struct PathArgs {
    /// Function directory or source file (same as --filepath)
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,
}

#[derive(Debug, Args)]
pub struct JavaArgs {
    /// The fully qualified class name of the function handler
    #[arg(long)]
    pub handler: String,

    /// Function directory or jar file (same as --filepath)
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PythonArgs {
    /// The name of the function handler (defaults to the function name)
    #[arg(long)]
    pub handler: Option<String>,

    /// Function directory or source file (same as --filepath)
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,
}

#[derive(Debug, Args)]
pub struct GoArgs {
    /// The name of the function handler (name of Exported go function)
    #[arg(long)]
    pub handler: Option<String>,

    /// Function directory or source file (same as --filepath)
    #[arg(value_name = "PATH")]
    pub paths: Vec<String>,
}

/// A validated init invocation, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitPlan {
    pub language: Language,
    pub config: FunctionConfig,
}

pub fn init_command(args: InitArgs, settings: &Settings) -> Result<(), CommandError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    init_command_with(args, settings, &mut out)
}

pub fn init_command_with<W: Write>(
    args: InitArgs,
    settings: &Settings,
    out: &mut W,
) -> Result<(), CommandError> {
    let plan = plan_init(args, settings)?;
    plan.language.initialize(plan.config, out)?;
    Ok(())
}

/// Parse, default and validate an init invocation without side effects.
pub fn plan_init(args: InitArgs, settings: &Settings) -> Result<InitPlan, CommandError> {
    let InitArgs {
        flags,
        language,
        mut paths,
    } = args;

    let (language, handler) = match language {
        Some(LanguageCommand::Java(java)) => {
            paths.extend(java.paths);
            (Some(Language::Java), Some(java.handler))
        }
        Some(LanguageCommand::Command(command)) => {
            paths.extend(command.paths);
            (Some(Language::Command), None)
        }
        Some(LanguageCommand::Node(node)) => {
            paths.extend(node.paths);
            (Some(Language::Node), None)
        }
        Some(LanguageCommand::Python(python)) => {
            paths.extend(python.paths);
            (Some(Language::Python), python.handler)
        }
        Some(LanguageCommand::Go(go)) => {
            paths.extend(go.paths);
            (Some(Language::Go), go.handler)
        }
        None => (None, None),
    };

    let options = flags.into_options(&paths, handler, settings)?;
    let config = validation::validate(options)?;

    let language = match language {
        Some(language) => language,
        None => {
            let detected = detect_language(&config)?;
            debug!("Detected {detected} function in {}", config.directory.display());
            detected
        }
    };

    let handler = default_handler(language, config.handler.clone(), &config.name)?;
    Ok(InitPlan {
        language,
        config: config.with_handler(handler),
    })
}

impl InitFlags {
    fn into_options(
        self,
        paths: &[String],
        handler: Option<String>,
        settings: &Settings,
    ) -> Result<InitOptions, CommandError> {
        let file_path = resolve_file_path(self.file_path, paths)?;
        let user_account = settings
            .with_flag(USER_ACCOUNT, self.user_account.as_deref())
            .get(USER_ACCOUNT);

        Ok(InitOptions {
            file_path,
            function_name: self.name.unwrap_or_default(),
            artifact: self.artifact.unwrap_or_default(),
            handler: handler.unwrap_or_default(),
            version: self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            riff_version: self
                .riff_version
                .unwrap_or_else(|| DEFAULT_RIFF_VERSION.to_string()),
            user_account,
            input: self.input.unwrap_or_default(),
            output: self.output.unwrap_or_default(),
            protocol: self.protocol.unwrap_or_default(),
            dry_run: self.dry_run,
            force: self.force,
        })
    }
}

/// A positional path is only accepted when `--filepath` was not given.
pub fn resolve_file_path(file_path: Option<String>, paths: &[String]) -> Result<String, CommandError> {
    let file_path = file_path.unwrap_or_default();
    match paths {
        [] => Ok(file_path),
        [path] if file_path.is_empty() => Ok(path.clone()),
        _ => Err(CommandError::Usage(format!("Invalid argument(s) {paths:?}"))),
    }
}

/// The handler each language ends up with when `--handler` is omitted.
pub fn default_handler(
    language: Language,
    handler: Option<String>,
    function_name: &str,
) -> Result<Option<String>, ValidationError> {
    match language {
        Language::Java => handler.map(Some).ok_or(ValidationError::MissingJavaHandler),
        Language::Python => Ok(Some(handler.unwrap_or_else(|| function_name.to_string()))),
        Language::Go => Ok(Some(
            handler.unwrap_or_else(|| capitalize_first(function_name)),
        )),
        Language::Node | Language::Command => Ok(None),
    }
}
