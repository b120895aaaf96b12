use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod logging;

/// Inspects and produces serialized exception streams.
#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decodes a hex exception stream and prints the exception chain.
    Decode {
        /// The hex text of the stream.
        hex: String,

        /// Decrypt encrypted debug values. Requires `decrypt.allowed`.
        #[arg(long)]
        decrypt: bool,
    },

    /// Decodes every line of an exception log file.
    ///
    /// Lines that cannot be parsed are reported and skipped.
    DecodeLog {
        /// The log file to read.
        file: PathBuf,

        /// Decrypt encrypted debug values. Requires `decrypt.allowed`.
        #[arg(long)]
        decrypt: bool,
    },

    /// Encrypts a debug value.
    Encrypt {
        /// The plain text value.
        text: String,
    },

    /// Decrypts a debug value. Requires `decrypt.allowed`.
    Decrypt {
        /// The encrypted value, including its marker.
        value: String,
    },

    /// Creates a sample exception and prints its log line.
    Sample {
        /// The ELI code of the exception.
        #[arg(long, default_value = "ELI00001")]
        eli: String,

        /// The exception message.
        #[arg(long, default_value = "Sample exception")]
        message: String,
    },
}

fn main() -> Result<()> {
    use std::panic;

    use crate::config::Config;

    let cli = Cli::parse();

    // run the program and clean up
    let res = run(cli);
    if let Err(why) = &res {
        log::error!("Exiting due to error: {why:?}");
    }

    log::logger().flush();
    return res;

    fn run(cli: Cli) -> Result<()> {
        let config = build_config()?;
        init_logging(config.log.log4rs)?;

        if config.log.panic {
            // register the custom panic handler after logging is set up
            panic::set_hook(Box::new(on_panic));
        }

        exception_stream::set_application(config.app.name, config.app.version);
        log::debug!("running {:?}", cli.command);

        let allowed = config.decrypt.allowed;
        match cli.command {
            Command::Decode { hex, decrypt } => commands::decode(&hex, decrypt, allowed),
            Command::DecodeLog { file, decrypt } => commands::decode_log(&file, decrypt, allowed),
            Command::Encrypt { text } => commands::encrypt(&text),
            Command::Decrypt { value } => commands::decrypt(&value, allowed),
            Command::Sample { eli, message } => commands::sample(eli, message),
        }
    }

    /// Writes the panic and a backtrace to the logger and flushes it.
    fn on_panic(info: &panic::PanicHookInfo<'_>) {
        use std::backtrace::Backtrace;
        use std::io::{Write as _, stderr};

        let backtrace = Backtrace::force_capture();
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");

        // in case the logger itself is broken
        _ = writeln!(stderr(), "thread '{name}' {info}");
        log::error!("thread '{name}' {info}\n{backtrace}");
        log::logger().flush();
    }

    fn profile() -> Result<Cow<'static, str>> {
        use std::env::VarError::NotPresent;
        use std::env::var;

        match var("EXCEPTION_TOOL_PROFILE") {
            Ok(value) => Ok(value.into()),
            Err(NotPresent) => Ok("release".into()),
            Err(err) => Err(err).context("cannot load EXCEPTION_TOOL_PROFILE env variable"),
        }
    }

    fn build_config() -> Result<Config> {
        use crate::config::DEFAULT_CONFIG;
        use crate::config::setup::{Builder, Env, File, TomlText};

        let profile = profile()?;
        let profile_config = format!("exception_tool.{profile}.toml");

        Builder::new()
            .add_layer(TomlText::new(DEFAULT_CONFIG))
            .add_layer(File::new("exception_tool.toml").required(false))
            .add_layer(File::new(&profile_config).required(false))
            .add_layer(Env::prefixed("EXCEPTION_TOOL"))
            .build()
    }

    fn init_logging(config: log4rs::config::RawConfig) -> Result<()> {
        let deserializers = crate::logging::deserializers();
        let (appenders, errors) = config.appenders_lossy(&deserializers);
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let config = log4rs::Config::builder()
            .appenders(appenders)
            .loggers(config.loggers())
            .build(config.root())?;

        log4rs::init_config(config)?;
        Ok(())
    }
}
